use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::authz::{Container, EntityKind, EntityRef, Rights};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: i64,
    pub task_id: i64,
    pub created_by_id: i64,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

impl Rights for Attachment {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityKind::Attachment, self.id)
    }

    fn container(&self) -> Container {
        Container::Within(EntityRef::task(self.task_id))
    }
}
