//! Sharing records as resources, for handlers that manage grants row by row.

use async_trait::async_trait;

use crate::authz::{can_manage_sharing, AuthzStore, Container, EntityRef, Grant, Principal, Rights, RightsEngine};
use crate::errors::AuthzResult;

#[async_trait]
impl Rights for Grant {
    /// Grants are addressed through the namespace or project they sit on.
    fn target(&self) -> EntityRef {
        self.entity
    }

    fn container(&self) -> Container {
        Container::Within(self.entity)
    }

    async fn can_read<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        engine.can_read(principal, self.entity).await
    }

    async fn can_create<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        can_manage_sharing(engine, principal, self.entity).await
    }

    async fn can_update<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        can_manage_sharing(engine, principal, self.entity).await
    }

    async fn can_delete<S: AuthzStore>(&self, engine: &RightsEngine<S>, principal: &Principal) -> AuthzResult<bool> {
        can_manage_sharing(engine, principal, self.entity).await
    }
}
