//! Rights resolution.
//!
//! Given a principal, an entity and a capability, the [`RightsEngine`] walks the
//! containment tree (namespace > project > task > leaf), folds in direct and team
//! grants, and decides allow or deny. Persistence is reached only through the store
//! traits re-exported here; [`sql`] and [`memory`] provide implementations.

mod contract;
mod engine;
mod entity;
mod grants;
mod hierarchy;
mod level;
mod principal;
mod teams;

pub mod memory;
pub mod sql;

pub use contract::Rights;
pub(crate) use contract::can_manage_sharing;
pub use engine::{Decision, DenyReason, RightsEngine};
pub use entity::{Container, EntityKind, EntityNode, EntityRef};
pub use grants::{validate_grant, DbGrant, Grant, GrantStore, GrantSubject};
pub use hierarchy::HierarchyResolver;
pub use level::{Capability, PermissionLevel};
pub use principal::{AuthContext, IdentityStore, LinkShareIdentity, Principal, PrincipalResolver, UserStatus};
pub use teams::TeamIndex;

pub use memory::InMemoryStore;
pub use sql::{SqlStore, SqlTxStore};

/// Everything the engine reads from persistence.
pub trait AuthzStore: HierarchyResolver + GrantStore + TeamIndex + IdentityStore {}

impl<T> AuthzStore for T where T: HierarchyResolver + GrantStore + TeamIndex + IdentityStore {}
