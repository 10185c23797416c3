//! In-memory implementation of every store trait.
//!
//! Cloning shares the underlying state, so a test can keep one handle for setup while
//! an engine owns another. Locks are never held across an await.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::entity::{EntityKind, EntityNode, EntityRef};
use super::grants::{validate_grant, Grant, GrantStore, GrantSubject};
use super::hierarchy::HierarchyResolver;
use super::level::PermissionLevel;
use super::principal::{IdentityStore, LinkShareIdentity, UserStatus};
use super::teams::TeamIndex;
use crate::errors::AuthzResult;

#[derive(Debug, Default)]
struct State {
    users: HashMap<i64, bool>,
    /// team id -> member user ids
    teams: BTreeMap<i64, BTreeSet<i64>>,
    nodes: HashMap<EntityRef, EntityNode>,
    /// label id -> task ids
    label_tasks: BTreeMap<i64, BTreeSet<i64>>,
    grants: BTreeMap<(EntityRef, GrantSubject), Grant>,
    link_shares: HashMap<String, LinkShareIdentity>,
    next_grant_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another test thread panicked mid-write; the maps stay usable.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_user(&self, id: i64, is_active: bool) {
        self.write().users.insert(id, is_active);
    }

    pub fn add_team(&self, team_id: i64) {
        self.write().teams.entry(team_id).or_default();
    }

    pub fn add_team_member(&self, team_id: i64, user_id: i64) {
        self.write().teams.entry(team_id).or_default().insert(user_id);
    }

    pub fn remove_team_member(&self, team_id: i64, user_id: i64) {
        if let Some(members) = self.write().teams.get_mut(&team_id) {
            members.remove(&user_id);
        }
    }

    pub fn insert_node(&self, node: EntityNode) {
        self.write().nodes.insert(node.entity, node);
    }

    pub fn add_namespace(&self, id: i64, owner_id: i64) {
        self.insert_node(EntityNode::new(EntityRef::namespace(id), None, Some(owner_id)));
    }

    pub fn add_project(&self, id: i64, namespace_id: i64, owner_id: i64) {
        self.insert_node(EntityNode::new(
            EntityRef::project(id),
            Some(EntityRef::namespace(namespace_id)),
            Some(owner_id),
        ));
    }

    pub fn add_task(&self, id: i64, project_id: i64, created_by_id: i64) {
        self.insert_node(EntityNode::new(
            EntityRef::task(id),
            Some(EntityRef::project(project_id)),
            Some(created_by_id),
        ));
    }

    /// Comment, attachment, reminder, relation or label association under a task.
    pub fn add_leaf(&self, kind: EntityKind, id: i64, task_id: i64, creator_id: Option<i64>) {
        self.insert_node(EntityNode::new(EntityRef::new(kind, id), Some(EntityRef::task(task_id)), creator_id));
    }

    pub fn add_label(&self, id: i64, created_by_id: i64) {
        self.insert_node(EntityNode::new(EntityRef::label(id), None, Some(created_by_id)));
    }

    pub fn attach_label(&self, label_id: i64, task_id: i64) {
        self.write().label_tasks.entry(label_id).or_default().insert(task_id);
    }

    pub fn detach_label(&self, label_id: i64, task_id: i64) {
        if let Some(tasks) = self.write().label_tasks.get_mut(&label_id) {
            tasks.remove(&task_id);
        }
    }

    /// Registers a link share and its node under the project.
    pub fn add_link_share(&self, hash: &str, id: i64, project_id: i64, level: PermissionLevel, shared_by_id: i64) {
        self.insert_node(EntityNode::new(
            EntityRef::new(EntityKind::LinkShare, id),
            Some(EntityRef::project(project_id)),
            Some(shared_by_id),
        ));
        self.write().link_shares.insert(
            hash.to_string(),
            LinkShareIdentity {
                id,
                project_id,
                level: level.as_i64(),
            },
        );
    }

    pub fn mark_deleted(&self, entity: EntityRef) {
        if let Some(node) = self.write().nodes.get_mut(&entity) {
            node.deleted = true;
        }
    }
}

#[async_trait]
impl HierarchyResolver for InMemoryStore {
    async fn node(&self, entity: EntityRef) -> AuthzResult<Option<EntityNode>> {
        Ok(self.read().nodes.get(&entity).cloned())
    }

    async fn tasks_with_label(&self, label_id: i64) -> AuthzResult<Vec<i64>> {
        Ok(self
            .read()
            .label_tasks
            .get(&label_id)
            .map(|tasks| tasks.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl TeamIndex for InMemoryStore {
    async fn teams_of(&self, user_id: i64) -> AuthzResult<BTreeSet<i64>> {
        Ok(self
            .read()
            .teams
            .iter()
            .filter(|(_, members)| members.contains(&user_id))
            .map(|(team_id, _)| *team_id)
            .collect())
    }

    async fn team_grant(&self, entity: EntityRef, team_id: i64) -> AuthzResult<PermissionLevel> {
        self.direct_grant(entity, GrantSubject::Team(team_id)).await
    }
}

#[async_trait]
impl GrantStore for InMemoryStore {
    async fn direct_grant(&self, entity: EntityRef, subject: GrantSubject) -> AuthzResult<PermissionLevel> {
        Ok(self
            .read()
            .grants
            .get(&(entity, subject))
            .map(|grant| grant.level)
            .unwrap_or_default())
    }

    async fn upsert(&self, entity: EntityRef, subject: GrantSubject, level: PermissionLevel) -> AuthzResult<Grant> {
        validate_grant(entity, level)?;

        let now = Utc::now();
        let mut state = self.write();
        if let Some(existing) = state.grants.get_mut(&(entity, subject)) {
            existing.level = level;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        state.next_grant_id += 1;
        let grant = Grant {
            id: state.next_grant_id,
            entity,
            subject,
            level,
            created_at: now,
            updated_at: now,
        };
        state.grants.insert((entity, subject), grant.clone());
        Ok(grant)
    }

    async fn revoke(&self, entity: EntityRef, subject: GrantSubject) -> AuthzResult<bool> {
        Ok(self.write().grants.remove(&(entity, subject)).is_some())
    }

    async fn grants_on(&self, entity: EntityRef) -> AuthzResult<Vec<Grant>> {
        Ok(self
            .read()
            .grants
            .values()
            .filter(|grant| grant.entity == entity)
            .cloned()
            .collect())
    }

    async fn subject_exists(&self, subject: GrantSubject) -> AuthzResult<bool> {
        let state = self.read();
        Ok(match subject {
            GrantSubject::User(id) => state.users.contains_key(&id),
            GrantSubject::Team(id) => state.teams.contains_key(&id),
        })
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn user_status(&self, user_id: i64) -> AuthzResult<Option<UserStatus>> {
        Ok(self
            .read()
            .users
            .get(&user_id)
            .map(|is_active| UserStatus { id: user_id, is_active: *is_active }))
    }

    async fn link_share_by_hash(&self, hash: &str) -> AuthzResult<Option<LinkShareIdentity>> {
        Ok(self.read().link_shares.get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_keeps_one_grant_per_subject() {
        let store = InMemoryStore::new();
        let project = EntityRef::project(1);
        let first = store.upsert(project, GrantSubject::User(1), PermissionLevel::Read).await.unwrap();
        let second = store.upsert(project, GrantSubject::User(1), PermissionLevel::Admin).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.grants_on(project).await.unwrap().len(), 1);
        assert_eq!(store.direct_grant(project, GrantSubject::User(1)).await.unwrap(), PermissionLevel::Admin);
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let store = InMemoryStore::new();
        let project = EntityRef::project(1);
        store.upsert(project, GrantSubject::Team(3), PermissionLevel::Write).await.unwrap();

        assert!(store.revoke(project, GrantSubject::Team(3)).await.unwrap());
        assert!(!store.revoke(project, GrantSubject::Team(3)).await.unwrap());
        assert_eq!(store.direct_grant(project, GrantSubject::Team(3)).await.unwrap(), PermissionLevel::None);
    }

    #[tokio::test]
    async fn team_membership_is_read_live() {
        let store = InMemoryStore::new();
        store.add_team_member(4, 9);
        store.add_team_member(5, 9);
        assert_eq!(store.teams_of(9).await.unwrap(), BTreeSet::from([4, 5]));

        store.remove_team_member(4, 9);
        assert_eq!(store.teams_of(9).await.unwrap(), BTreeSet::from([5]));
    }

    #[tokio::test]
    async fn parent_of_follows_nodes() {
        let store = InMemoryStore::new();
        store.add_namespace(1, 1);
        store.add_project(2, 1, 1);
        assert_eq!(store.parent_of(EntityRef::project(2)).await.unwrap(), Some(EntityRef::namespace(1)));
        assert_eq!(store.parent_of(EntityRef::namespace(1)).await.unwrap(), None);
        assert_eq!(store.parent_of(EntityRef::project(3)).await.unwrap(), None);
    }
}
