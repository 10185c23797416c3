use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};

use crate::authz::{Container, EntityRef, Rights};
use crate::errors::AuthzResult;

/// Root of the containment tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Namespace {
    pub id: i64,
    pub title: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Namespace {
    pub async fn find<'e, E>(ex: E, id: i64) -> AuthzResult<Option<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let namespace = sqlx::query_as::<_, Namespace>(
            "SELECT id, title, owner_id, created_at, deleted_at FROM namespaces WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(ex)
        .await?;
        Ok(namespace)
    }
}

impl Rights for Namespace {
    fn target(&self) -> EntityRef {
        EntityRef::namespace(self.id)
    }

    fn container(&self) -> Container {
        Container::Root
    }
}
