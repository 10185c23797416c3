use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::entity::EntityRef;
use super::hierarchy::HierarchyResolver;
use super::level::PermissionLevel;
use crate::config::RightsConfig;
use crate::errors::{AuthzError, AuthzResult};

/// Already-verified identity handed over by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthContext {
    User { user_id: i64 },
    LinkShare { hash: String },
}

impl AuthContext {
    pub fn user(user_id: i64) -> Self {
        Self::User { user_id }
    }

    pub fn link_share(hash: impl Into<String>) -> Self {
        Self::LinkShare { hash: hash.into() }
    }
}

/// Who is asking. Only produced by [`PrincipalResolver::resolve`] or by tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User { id: i64 },
    /// Anonymous access through a share link, bound to one project and capped at `level`.
    LinkShare {
        id: i64,
        project_id: i64,
        level: PermissionLevel,
    },
}

impl Principal {
    pub fn user(id: i64) -> Self {
        Self::User { id }
    }

    pub fn link_share(id: i64, project_id: i64, level: PermissionLevel) -> Self {
        Self::LinkShare {
            id,
            project_id,
            level,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Principal::User { id } => Some(*id),
            Principal::LinkShare { .. } => None,
        }
    }

    pub fn is_link_share(&self) -> bool {
        matches!(self, Principal::LinkShare { .. })
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User { id } => write!(f, "user:{id}"),
            Principal::LinkShare { id, .. } => write!(f, "link_share:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStatus {
    pub id: i64,
    pub is_active: bool,
}

/// Raw link share row; `level` is undecoded so a corrupt value can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkShareIdentity {
    pub id: i64,
    pub project_id: i64,
    pub level: i64,
}

/// Identity lookups the resolver needs from persistence.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn user_status(&self, user_id: i64) -> AuthzResult<Option<UserStatus>>;

    async fn link_share_by_hash(&self, hash: &str) -> AuthzResult<Option<LinkShareIdentity>>;
}

/// Maps an [`AuthContext`] to a [`Principal`].
pub struct PrincipalResolver<'a, S> {
    store: &'a S,
    config: &'a RightsConfig,
}

impl<'a, S> PrincipalResolver<'a, S>
where
    S: IdentityStore + HierarchyResolver,
{
    pub fn new(store: &'a S, config: &'a RightsConfig) -> Self {
        Self { store, config }
    }

    pub async fn resolve(&self, ctx: &AuthContext) -> AuthzResult<Principal> {
        match ctx {
            AuthContext::User { user_id } => self.resolve_user(*user_id).await,
            AuthContext::LinkShare { hash } => self.resolve_link_share(hash).await,
        }
    }

    async fn resolve_user(&self, user_id: i64) -> AuthzResult<Principal> {
        let status = self
            .store
            .user_status(user_id)
            .await?
            .ok_or_else(|| AuthzError::unauthenticated("unknown user"))?;

        if !status.is_active {
            tracing::debug!(user_id, "user has not confirmed their account yet");
            return Err(AuthzError::inactive("account is not activated"));
        }

        Ok(Principal::user(status.id))
    }

    async fn resolve_link_share(&self, hash: &str) -> AuthzResult<Principal> {
        if !self.config.link_sharing_enabled {
            return Err(AuthzError::unauthenticated("link sharing is disabled"));
        }

        let share = self
            .store
            .link_share_by_hash(hash)
            .await?
            .ok_or_else(|| AuthzError::unauthenticated("unknown link share"))?;

        let level = match PermissionLevel::from_i64(share.level) {
            Some(level) if level > PermissionLevel::None => level,
            _ => {
                tracing::warn!(link_share_id = share.id, level = share.level, "link share has an invalid level");
                return Err(AuthzError::unauthenticated("malformed link share"));
            }
        };

        // A share whose project (or that project's namespace) is gone is not a usable identity
        if !self.project_is_live(share.project_id).await? {
            tracing::debug!(link_share_id = share.id, project_id = share.project_id, "link share points at a deleted project");
            return Err(AuthzError::unauthenticated("link share target no longer exists"));
        }

        Ok(Principal::link_share(share.id, share.project_id, level))
    }

    /// Whether the project and its namespace both exist and are not deleted.
    pub(crate) async fn project_is_live(&self, project_id: i64) -> AuthzResult<bool> {
        let project = match self.store.node(EntityRef::project(project_id)).await? {
            Some(node) if !node.deleted => node,
            _ => return Ok(false),
        };

        let Some(namespace) = project.parent else {
            return Ok(false);
        };

        Ok(matches!(self.store.node(namespace).await?, Some(node) if !node.deleted))
    }
}
