use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::authz::{Container, EntityKind, EntityRef, Rights};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    pub id: i64,
    pub task_id: i64,
    pub reminder_at: DateTime<Utc>,
}

impl Rights for Reminder {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityKind::Reminder, self.id)
    }

    fn container(&self) -> Container {
        Container::Within(EntityRef::task(self.task_id))
    }
}
