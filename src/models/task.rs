use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};

use crate::authz::{Container, EntityRef, Rights};
use crate::errors::AuthzResult;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub created_by_id: i64,
    pub title: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    pub async fn find<'e, E>(ex: E, id: i64) -> AuthzResult<Option<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let task = sqlx::query_as::<_, Task>(
            "SELECT id, project_id, created_by_id, title, done, created_at, deleted_at FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(ex)
        .await?;
        Ok(task)
    }
}

impl Rights for Task {
    fn target(&self) -> EntityRef {
        EntityRef::task(self.id)
    }

    fn container(&self) -> Container {
        Container::Within(EntityRef::project(self.project_id))
    }
}
