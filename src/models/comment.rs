use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::authz::{Container, EntityKind, EntityRef, Rights};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub author_id: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Rights for Comment {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityKind::Comment, self.id)
    }

    fn container(&self) -> Container {
        Container::Within(EntityRef::task(self.task_id))
    }
}
