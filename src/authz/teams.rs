use std::collections::BTreeSet;

use async_trait::async_trait;

use super::entity::EntityRef;
use super::level::PermissionLevel;
use crate::errors::AuthzResult;

/// Read-only view of team membership and team grants.
#[async_trait]
pub trait TeamIndex: Send + Sync {
    async fn teams_of(&self, user_id: i64) -> AuthzResult<BTreeSet<i64>>;

    /// Level granted to `team_id` directly on `entity`, `None` when there is no grant.
    async fn team_grant(&self, entity: EntityRef, team_id: i64) -> AuthzResult<PermissionLevel>;

    /// Highest level any of `teams` holds on `entity`.
    async fn best_team_grant(&self, entity: EntityRef, teams: &BTreeSet<i64>) -> AuthzResult<PermissionLevel> {
        let mut best = PermissionLevel::None;
        for team_id in teams {
            best = best.max(self.team_grant(entity, *team_id).await?);
            if best == PermissionLevel::Admin {
                break;
            }
        }
        Ok(best)
    }
}
