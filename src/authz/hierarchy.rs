use async_trait::async_trait;

use super::entity::{EntityNode, EntityRef};
use crate::errors::AuthzResult;

/// Upward lookups over the containment tree.
///
/// Every call must be a single keyed read; the engine walks at most four hops
/// (leaf, task, project, namespace) per decision.
#[async_trait]
pub trait HierarchyResolver: Send + Sync {
    /// The node for `entity`, or `None` if it does not exist.
    async fn node(&self, entity: EntityRef) -> AuthzResult<Option<EntityNode>>;

    /// Ids of the tasks a label is attached to.
    async fn tasks_with_label(&self, label_id: i64) -> AuthzResult<Vec<i64>>;

    /// Parent container of `entity`. `None` for roots and for missing entities.
    async fn parent_of(&self, entity: EntityRef) -> AuthzResult<Option<EntityRef>> {
        Ok(self.node(entity).await?.and_then(|node| node.parent))
    }
}
