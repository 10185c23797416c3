use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};

use crate::authz::{Container, EntityRef, Rights};
use crate::errors::AuthzResult;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub namespace_id: i64,
    pub owner_id: i64,
    pub title: String,
    /// The owner's personal default project. Display only; rights are unaffected.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    pub async fn find<'e, E>(ex: E, id: i64) -> AuthzResult<Option<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let project = sqlx::query_as::<_, Project>(
            "SELECT id, namespace_id, owner_id, title, is_default, created_at, deleted_at FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(ex)
        .await?;
        Ok(project)
    }
}

impl Rights for Project {
    fn target(&self) -> EntityRef {
        EntityRef::project(self.id)
    }

    fn container(&self) -> Container {
        Container::Within(EntityRef::namespace(self.namespace_id))
    }
}
