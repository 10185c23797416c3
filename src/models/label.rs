use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};

use crate::authz::{Container, EntityRef, Rights};
use crate::errors::AuthzResult;

/// A user's label. Visible to anyone who can read a task carrying it; editable only by
/// its creator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Label {
    pub id: i64,
    pub title: String,
    pub hex_color: Option<String>,
    pub created_by_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Label {
    pub async fn find<'e, E>(ex: E, id: i64) -> AuthzResult<Option<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let label = sqlx::query_as::<_, Label>(
            "SELECT id, title, hex_color, created_by_id, created_at FROM labels WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(ex)
        .await?;
        Ok(label)
    }
}

impl Rights for Label {
    fn target(&self) -> EntityRef {
        EntityRef::label(self.id)
    }

    fn container(&self) -> Container {
        Container::Unrestricted
    }
}
