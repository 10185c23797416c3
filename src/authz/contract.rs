use async_trait::async_trait;

use super::engine::RightsEngine;
use super::entity::{Container, EntityRef};
use super::level::Capability;
use super::principal::Principal;
use super::AuthzStore;
use crate::errors::AuthzResult;

/// Capability checks every resource exposes to its handlers.
///
/// A resource names itself (`target`) and where it would be created (`container`);
/// the defaults delegate to the engine. Resources whose rules involve a second
/// entity override the affected checks.
#[async_trait]
pub trait Rights: Send + Sync {
    fn target(&self) -> EntityRef;

    fn container(&self) -> Container;

    async fn can_read<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_read(principal, self.target()).await
    }

    async fn can_create<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_create(principal, self.container()).await
    }

    async fn can_update<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_update(principal, self.target()).await
    }

    async fn can_delete<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_delete(principal, self.target()).await
    }
}

/// Checks for records that manage sharing on `scope` (grants, link shares):
/// reading needs Read on the scope, every mutation needs Share.
pub(crate) async fn can_manage_sharing<S: AuthzStore>(
    engine: &RightsEngine<S>,
    principal: &Principal,
    scope: EntityRef,
) -> AuthzResult<bool> {
    engine.can(principal, scope, Capability::Share).await
}
