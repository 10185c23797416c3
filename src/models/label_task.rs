use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::authz::{AuthzStore, Container, EntityKind, EntityRef, Principal, Rights, RightsEngine};
use crate::errors::AuthzResult;

/// A label attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LabelTask {
    pub id: i64,
    pub label_id: i64,
    pub task_id: i64,
}

#[async_trait]
impl Rights for LabelTask {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityKind::LabelTask, self.id)
    }

    fn container(&self) -> Container {
        Container::Within(EntityRef::task(self.task_id))
    }

    async fn can_read<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_read(principal, EntityRef::task(self.task_id)).await
    }

    /// Needs the label to be visible and the task to be editable.
    async fn can_create<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        if !engine.can_read(principal, EntityRef::label(self.label_id)).await? {
            return Ok(false);
        }
        engine.can_update(principal, EntityRef::task(self.task_id)).await
    }

    async fn can_update<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_update(principal, EntityRef::task(self.task_id)).await
    }

    async fn can_delete<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_update(principal, EntityRef::task(self.task_id)).await
    }
}
