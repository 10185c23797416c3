//! SQLite-backed stores.
//!
//! [`SqlStore`] reads through the pool and is shared for the life of the process.
//! [`SqlTxStore`] owns one transaction so a rights check and the write it guards see
//! the same data; the transaction is the only serialization point.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tokio::sync::{Mutex, MutexGuard};

use super::entity::{EntityKind, EntityNode, EntityRef};
use super::grants::{validate_grant, DbGrant, Grant, GrantStore, GrantSubject};
use super::hierarchy::HierarchyResolver;
use super::level::PermissionLevel;
use super::principal::{IdentityStore, LinkShareIdentity, UserStatus};
use super::teams::TeamIndex;
use crate::errors::AuthzResult;
use crate::events::EventBus;

#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> AuthzResult<SqlTxStore> {
        SqlTxStore::begin(&self.pool).await
    }

    fn publish_event(&self, bus: &EventBus, event: Value) {
        // No receiver is not an error
        let _ = bus.send(event);
    }
}

pub struct SqlTxStore {
    tx: Mutex<Transaction<'static, Sqlite>>,
    /// Audit events waiting for the commit.
    outbox: std::sync::Mutex<Vec<(EventBus, Value)>>,
}

impl SqlTxStore {
    pub async fn begin(pool: &SqlitePool) -> AuthzResult<Self> {
        let tx = pool.begin().await?;
        Ok(Self {
            tx: Mutex::new(tx),
            outbox: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn publish_event(&self, bus: &EventBus, event: Value) {
        let mut outbox = self.outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        outbox.push((bus.clone(), event));
    }

    /// The transaction, for the guarded write. Release it before the next rights call.
    pub async fn lock(&self) -> MutexGuard<'_, Transaction<'static, Sqlite>> {
        self.tx.lock().await
    }

    /// Commits, then publishes the audit events buffered by grant changes.
    pub async fn commit(self) -> AuthzResult<()> {
        let Self { tx, outbox } = self;
        tx.into_inner().commit().await?;

        let outbox = outbox.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (bus, event) in outbox {
            let _ = bus.send(event);
        }
        Ok(())
    }

    /// Rolls back and drops any buffered audit events.
    pub async fn rollback(self) -> AuthzResult<()> {
        self.tx.into_inner().rollback().await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct NodeRow {
    parent_id: Option<i64>,
    creator_id: Option<i64>,
    deleted: bool,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct LinkShareRow {
    id: i64,
    project_id: i64,
    level: i64,
}

/// One primary-key read per kind.
fn node_query(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Namespace => "SELECT NULL AS parent_id, owner_id AS creator_id, deleted_at IS NOT NULL AS deleted FROM namespaces WHERE id = ?",
        EntityKind::Project => "SELECT namespace_id AS parent_id, owner_id AS creator_id, deleted_at IS NOT NULL AS deleted FROM projects WHERE id = ?",
        EntityKind::Task => "SELECT project_id AS parent_id, created_by_id AS creator_id, deleted_at IS NOT NULL AS deleted FROM tasks WHERE id = ?",
        EntityKind::Label => "SELECT NULL AS parent_id, created_by_id AS creator_id, 0 AS deleted FROM labels WHERE id = ?",
        EntityKind::LabelTask => "SELECT task_id AS parent_id, NULL AS creator_id, 0 AS deleted FROM label_tasks WHERE id = ?",
        EntityKind::Comment => "SELECT task_id AS parent_id, author_id AS creator_id, 0 AS deleted FROM task_comments WHERE id = ?",
        EntityKind::Attachment => "SELECT task_id AS parent_id, created_by_id AS creator_id, 0 AS deleted FROM task_attachments WHERE id = ?",
        EntityKind::Reminder => "SELECT task_id AS parent_id, NULL AS creator_id, 0 AS deleted FROM task_reminders WHERE id = ?",
        EntityKind::Relation => "SELECT task_id AS parent_id, created_by_id AS creator_id, 0 AS deleted FROM task_relations WHERE id = ?",
        EntityKind::LinkShare => "SELECT project_id AS parent_id, shared_by_id AS creator_id, 0 AS deleted FROM link_shares WHERE id = ?",
    }
}

mod queries {
    use sqlx::{Executor, Sqlite};

    use super::*;

    pub async fn node<'e, E>(ex: E, entity: EntityRef) -> AuthzResult<Option<EntityNode>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, NodeRow>(node_query(entity.kind))
            .bind(entity.id)
            .fetch_optional(ex)
            .await?;

        Ok(row.map(|row| EntityNode {
            entity,
            parent: match (entity.kind.parent_kind(), row.parent_id) {
                (Some(kind), Some(id)) => Some(EntityRef::new(kind, id)),
                _ => None,
            },
            creator_id: row.creator_id,
            deleted: row.deleted,
        }))
    }

    pub async fn tasks_with_label<'e, E>(ex: E, label_id: i64) -> AuthzResult<Vec<i64>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let ids = sqlx::query_scalar::<_, i64>("SELECT task_id FROM label_tasks WHERE label_id = ? ORDER BY task_id")
            .bind(label_id)
            .fetch_all(ex)
            .await?;
        Ok(ids)
    }

    pub async fn teams_of<'e, E>(ex: E, user_id: i64) -> AuthzResult<BTreeSet<i64>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let ids = sqlx::query_scalar::<_, i64>("SELECT team_id FROM team_members WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(ex)
            .await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn direct_grant<'e, E>(ex: E, entity: EntityRef, subject: GrantSubject) -> AuthzResult<PermissionLevel>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let level = sqlx::query_scalar::<_, i64>(
            "SELECT level FROM grants WHERE entity_kind = ? AND entity_id = ? AND subject_kind = ? AND subject_id = ?",
        )
        .bind(entity.kind.as_str())
        .bind(entity.id)
        .bind(subject.kind_str())
        .bind(subject.id())
        .fetch_optional(ex)
        .await?;

        // An undecodable level grants nothing
        Ok(level.and_then(PermissionLevel::from_i64).unwrap_or_default())
    }

    pub async fn upsert<'e, E>(ex: E, entity: EntityRef, subject: GrantSubject, level: PermissionLevel) -> AuthzResult<Grant>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        validate_grant(entity, level)?;

        let now = Utc::now();
        let row = sqlx::query_as::<_, DbGrant>(
            r#"
            INSERT INTO grants (entity_kind, entity_id, subject_kind, subject_id, level, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (entity_kind, entity_id, subject_kind, subject_id)
            DO UPDATE SET level = excluded.level, updated_at = excluded.updated_at
            RETURNING id, entity_kind, entity_id, subject_kind, subject_id, level, created_at, updated_at
            "#,
        )
        .bind(entity.kind.as_str())
        .bind(entity.id)
        .bind(subject.kind_str())
        .bind(subject.id())
        .bind(level.as_i64())
        .bind(now)
        .bind(now)
        .fetch_one(ex)
        .await?;

        row.try_into()
    }

    pub async fn revoke<'e, E>(ex: E, entity: EntityRef, subject: GrantSubject) -> AuthzResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "DELETE FROM grants WHERE entity_kind = ? AND entity_id = ? AND subject_kind = ? AND subject_id = ?",
        )
        .bind(entity.kind.as_str())
        .bind(entity.id)
        .bind(subject.kind_str())
        .bind(subject.id())
        .execute(ex)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn grants_on<'e, E>(ex: E, entity: EntityRef) -> AuthzResult<Vec<Grant>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query_as::<_, DbGrant>(
            "SELECT id, entity_kind, entity_id, subject_kind, subject_id, level, created_at, updated_at FROM grants WHERE entity_kind = ? AND entity_id = ? ORDER BY id",
        )
        .bind(entity.kind.as_str())
        .bind(entity.id)
        .fetch_all(ex)
        .await?;

        rows.into_iter().map(Grant::try_from).collect()
    }

    pub async fn subject_exists<'e, E>(ex: E, subject: GrantSubject) -> AuthzResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = match subject {
            GrantSubject::User(_) => "SELECT 1 FROM users WHERE id = ?",
            GrantSubject::Team(_) => "SELECT 1 FROM teams WHERE id = ?",
        };
        let found = sqlx::query_scalar::<_, i64>(sql)
            .bind(subject.id())
            .fetch_optional(ex)
            .await?;
        Ok(found.is_some())
    }

    pub async fn user_status<'e, E>(ex: E, user_id: i64) -> AuthzResult<Option<UserStatus>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, is_active FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(ex)
            .await?;
        Ok(row.map(|row| UserStatus {
            id: row.id,
            is_active: row.is_active,
        }))
    }

    pub async fn link_share_by_hash<'e, E>(ex: E, hash: &str) -> AuthzResult<Option<LinkShareIdentity>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, LinkShareRow>("SELECT id, project_id, level FROM link_shares WHERE hash = ?")
            .bind(hash)
            .fetch_optional(ex)
            .await?;
        Ok(row.map(|row| LinkShareIdentity {
            id: row.id,
            project_id: row.project_id,
            level: row.level,
        }))
    }
}

/// Implements every store trait for `$ty`, running each query on `$exec`.
macro_rules! sql_store_impls {
    ($ty:ty, |$this:ident| $exec:expr) => {
        #[async_trait]
        impl HierarchyResolver for $ty {
            async fn node(&self, entity: EntityRef) -> AuthzResult<Option<EntityNode>> {
                let $this = self;
                let result = queries::node($exec, entity).await;
                result
            }

            async fn tasks_with_label(&self, label_id: i64) -> AuthzResult<Vec<i64>> {
                let $this = self;
                let result = queries::tasks_with_label($exec, label_id).await;
                result
            }
        }

        #[async_trait]
        impl TeamIndex for $ty {
            async fn teams_of(&self, user_id: i64) -> AuthzResult<BTreeSet<i64>> {
                let $this = self;
                let result = queries::teams_of($exec, user_id).await;
                result
            }

            async fn team_grant(&self, entity: EntityRef, team_id: i64) -> AuthzResult<PermissionLevel> {
                let $this = self;
                let result = queries::direct_grant($exec, entity, GrantSubject::Team(team_id)).await;
                result
            }
        }

        #[async_trait]
        impl GrantStore for $ty {
            async fn direct_grant(&self, entity: EntityRef, subject: GrantSubject) -> AuthzResult<PermissionLevel> {
                let $this = self;
                let result = queries::direct_grant($exec, entity, subject).await;
                result
            }

            async fn upsert(&self, entity: EntityRef, subject: GrantSubject, level: PermissionLevel) -> AuthzResult<Grant> {
                let $this = self;
                let result = queries::upsert($exec, entity, subject, level).await;
                result
            }

            async fn revoke(&self, entity: EntityRef, subject: GrantSubject) -> AuthzResult<bool> {
                let $this = self;
                let result = queries::revoke($exec, entity, subject).await;
                result
            }

            async fn grants_on(&self, entity: EntityRef) -> AuthzResult<Vec<Grant>> {
                let $this = self;
                let result = queries::grants_on($exec, entity).await;
                result
            }

            async fn subject_exists(&self, subject: GrantSubject) -> AuthzResult<bool> {
                let $this = self;
                let result = queries::subject_exists($exec, subject).await;
                result
            }

            fn publish(&self, bus: &EventBus, event: Value) {
                self.publish_event(bus, event);
            }
        }

        #[async_trait]
        impl IdentityStore for $ty {
            async fn user_status(&self, user_id: i64) -> AuthzResult<Option<UserStatus>> {
                let $this = self;
                let result = queries::user_status($exec, user_id).await;
                result
            }

            async fn link_share_by_hash(&self, hash: &str) -> AuthzResult<Option<LinkShareIdentity>> {
                let $this = self;
                let result = queries::link_share_by_hash($exec, hash).await;
                result
            }
        }
    };
}

sql_store_impls!(SqlStore, |store| &store.pool);
sql_store_impls!(SqlTxStore, |store| &mut **store.tx.lock().await);
