use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::authz::{AuthzStore, Container, EntityKind, EntityRef, Principal, Rights, RightsEngine};
use crate::errors::AuthzResult;

/// A directed link from one task to another, e.g. "blocks" or "subtask".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRelation {
    pub id: i64,
    pub task_id: i64,
    pub other_task_id: i64,
    pub relation_kind: String,
    pub created_by_id: i64,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
impl Rights for TaskRelation {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityKind::Relation, self.id)
    }

    fn container(&self) -> Container {
        Container::Within(EntityRef::task(self.task_id))
    }

    /// Editing the source task, and seeing the task on the other end.
    async fn can_create<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        if !engine.can_update(principal, EntityRef::task(self.task_id)).await? {
            return Ok(false);
        }
        engine.can_read(principal, EntityRef::task(self.other_task_id)).await
    }

    async fn can_delete<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_update(principal, EntityRef::task(self.task_id)).await
    }
}
