use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::entity::{EntityKind, EntityRef};
use super::level::PermissionLevel;
use crate::errors::{AuthzError, AuthzResult};
use crate::events::{EventBus, Loggable, Severity};

/// Who a grant is given to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum GrantSubject {
    User(i64),
    Team(i64),
}

impl GrantSubject {
    pub fn kind_str(self) -> &'static str {
        match self {
            GrantSubject::User(_) => "user",
            GrantSubject::Team(_) => "team",
        }
    }

    pub fn id(self) -> i64 {
        match self {
            GrantSubject::User(id) | GrantSubject::Team(id) => id,
        }
    }

    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "user" => Some(GrantSubject::User(id)),
            "team" => Some(GrantSubject::Team(id)),
            _ => None,
        }
    }
}

impl fmt::Display for GrantSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind_str(), self.id())
    }
}

/// An explicit sharing record on a namespace or project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: i64,
    pub entity: EntityRef,
    pub subject: GrantSubject,
    pub level: PermissionLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Grant {
    fn entity_type() -> &'static str { "grant" }
    fn subject_id(&self) -> i64 { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbGrant {
    pub id: i64,
    pub entity_kind: String,
    pub entity_id: i64,
    pub subject_kind: String,
    pub subject_id: i64,
    pub level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbGrant> for Grant {
    type Error = AuthzError;

    fn try_from(value: DbGrant) -> Result<Self, Self::Error> {
        // A bad stored kind is corrupt data, not a caller error
        let kind: EntityKind = value
            .entity_kind
            .parse()
            .map_err(|_| AuthzError::internal(format!("invalid grant entity kind: {}", value.entity_kind)))?;
        let subject = GrantSubject::from_parts(&value.subject_kind, value.subject_id)
            .ok_or_else(|| AuthzError::internal(format!("invalid grant subject kind: {}", value.subject_kind)))?;
        let level = PermissionLevel::from_i64(value.level)
            .ok_or_else(|| AuthzError::internal(format!("invalid grant level: {}", value.level)))?;

        Ok(Grant {
            id: value.id,
            entity: EntityRef::new(kind, value.entity_id),
            subject,
            level,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// Rejects grants that can never be stored. Stores call this before writing.
pub fn validate_grant(entity: EntityRef, level: PermissionLevel) -> AuthzResult<()> {
    if !entity.kind.is_shareable() {
        return Err(AuthzError::not_shareable(format!("{} cannot carry grants", entity.kind)));
    }
    if level == PermissionLevel::None {
        return Err(AuthzError::invalid_level("use revoke to remove a grant"));
    }
    Ok(())
}

/// Explicit grants on namespaces and projects.
///
/// Writes are not authorized here; [`crate::authz::RightsEngine::share`] checks the
/// caller holds Admin before calling in.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Level granted directly to `subject` on `entity`, `None` when absent.
    async fn direct_grant(&self, entity: EntityRef, subject: GrantSubject) -> AuthzResult<PermissionLevel>;

    /// Creates or re-levels the single grant for (`entity`, `subject`).
    async fn upsert(&self, entity: EntityRef, subject: GrantSubject, level: PermissionLevel) -> AuthzResult<Grant>;

    /// Removes the grant if present. Returns whether one existed.
    async fn revoke(&self, entity: EntityRef, subject: GrantSubject) -> AuthzResult<bool>;

    async fn grants_on(&self, entity: EntityRef) -> AuthzResult<Vec<Grant>>;

    async fn subject_exists(&self, subject: GrantSubject) -> AuthzResult<bool>;

    /// Hands an audit event for a grant change to `bus`. Transactional stores hold it
    /// back until their changes are committed.
    fn publish(&self, bus: &EventBus, event: Value) {
        // No receiver is not an error
        let _ = bus.send(event);
    }
}
