pub mod authz;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod models;

// Re-export commonly used items for tests and embedders
pub use authz::{
    AuthContext, Capability, Container, EntityKind, EntityRef, GrantSubject, PermissionLevel, Principal, Rights,
    RightsEngine,
};
pub use config::{DbConfig, RightsConfig};
pub use errors::{AuthzError, AuthzResult};
