use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use uuid::Uuid;

use crate::authz::{can_manage_sharing, AuthzStore, Container, EntityKind, EntityRef, PermissionLevel, Principal, Rights, RightsEngine};
use crate::errors::{AuthzError, AuthzResult};

/// Anonymous access to one project, capped at `level`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LinkShare {
    pub id: i64,
    pub hash: String,
    pub project_id: i64,
    /// Raw stored level; see [`LinkShare::permission`]
    pub level: i64,
    pub name: Option<String>,
    pub shared_by_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkShareCreateRequest {
    pub project_id: i64,
    pub level: PermissionLevel,
    pub name: Option<String>,
}

impl LinkShareCreateRequest {
    pub fn validate(&self) -> AuthzResult<()> {
        if self.level == PermissionLevel::None {
            return Err(AuthzError::invalid_level("a link share needs at least read access"));
        }
        Ok(())
    }

    /// The record to authorize before inserting it.
    pub fn draft(&self, shared_by_id: i64) -> LinkShare {
        LinkShare {
            id: 0,
            hash: LinkShare::generate_hash(),
            project_id: self.project_id,
            level: self.level.as_i64(),
            name: self.name.clone(),
            shared_by_id,
            created_at: Utc::now(),
        }
    }
}

impl LinkShare {
    pub fn generate_hash() -> String {
        Uuid::new_v4().simple().to_string()
    }

    pub fn permission(&self) -> Option<PermissionLevel> {
        PermissionLevel::from_i64(self.level)
    }

    pub async fn find<'e, E>(ex: E, id: i64) -> AuthzResult<Option<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let share = sqlx::query_as::<_, LinkShare>(
            "SELECT id, hash, project_id, level, name, shared_by_id, created_at FROM link_shares WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(ex)
        .await?;
        Ok(share)
    }

    pub async fn insert<'e, E>(&self, ex: E) -> AuthzResult<Self>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let share = sqlx::query_as::<_, LinkShare>(
            r#"
            INSERT INTO link_shares (hash, project_id, level, name, shared_by_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, hash, project_id, level, name, shared_by_id, created_at
            "#,
        )
        .bind(&self.hash)
        .bind(self.project_id)
        .bind(self.level)
        .bind(&self.name)
        .bind(self.shared_by_id)
        .bind(self.created_at)
        .fetch_one(ex)
        .await?;
        Ok(share)
    }
}

/// Listing needs Read on the project; everything else needs Admin there. Link-share
/// principals never pass the Admin checks.
#[async_trait]
impl Rights for LinkShare {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityKind::LinkShare, self.id)
    }

    fn container(&self) -> Container {
        Container::Within(EntityRef::project(self.project_id))
    }

    async fn can_read<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_read(principal, EntityRef::project(self.project_id)).await
    }

    async fn can_create<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        can_manage_sharing(engine, principal, EntityRef::project(self.project_id)).await
    }

    async fn can_update<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        can_manage_sharing(engine, principal, EntityRef::project(self.project_id)).await
    }

    async fn can_delete<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        can_manage_sharing(engine, principal, EntityRef::project(self.project_id)).await
    }
}
