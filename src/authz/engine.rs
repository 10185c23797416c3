use std::collections::BTreeSet;

use super::entity::{Container, EntityKind, EntityNode, EntityRef};
use super::grants::{validate_grant, Grant, GrantSubject};
use super::level::{Capability, PermissionLevel};
use super::principal::{AuthContext, Principal, PrincipalResolver};
use super::AuthzStore;
use crate::config::RightsConfig;
use crate::errors::{AuthzError, AuthzResult};
use crate::events::{activity_event, EventBus};

/// Leaf, task, project, namespace.
const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    NotFound,
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn allow_if(condition: bool) -> Self {
        if condition {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::Forbidden)
        }
    }

    /// Turns a deny into the error the caller should surface.
    pub fn into_result(self, entity: EntityRef) -> AuthzResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => Err(AuthzError::unauthenticated("no usable principal")),
            Decision::Deny(DenyReason::NotFound) => Err(AuthzError::not_found(entity.to_string())),
            Decision::Deny(DenyReason::Forbidden) => Err(AuthzError::Forbidden),
        }
    }
}

/// Path from an entity up to its namespace, entity first.
#[derive(Debug, Clone)]
struct Ancestry {
    nodes: Vec<EntityNode>,
}

impl Ancestry {
    fn contains(&self, entity: EntityRef) -> bool {
        self.nodes.iter().any(|node| node.entity == entity)
    }

    fn created_by(&self, user_id: i64) -> bool {
        self.nodes.iter().any(|node| node.is_created_by(user_id))
    }

    fn grant_scopes(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.nodes
            .iter()
            .map(|node| node.entity)
            .filter(|entity| entity.kind.is_shareable())
    }
}

/// Decides whether a principal may perform a capability on an entity.
///
/// Stateless apart from its store handle: one engine is built per process and shared
/// by reference. For a check that must see the same snapshot as the write it guards,
/// build a short-lived engine over a transaction-scoped store with [`RightsEngine::with_store`].
#[derive(Clone)]
pub struct RightsEngine<S> {
    store: S,
    config: RightsConfig,
    events: Option<EventBus>,
}

impl<S: AuthzStore> RightsEngine<S> {
    pub fn new(store: S, config: RightsConfig) -> Self {
        Self {
            store,
            config,
            events: None,
        }
    }

    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Same configuration and event bus over another store.
    pub fn with_store<T: AuthzStore>(&self, store: T) -> RightsEngine<T> {
        RightsEngine {
            store,
            config: self.config.clone(),
            events: self.events.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &RightsConfig {
        &self.config
    }

    pub fn principals(&self) -> PrincipalResolver<'_, S> {
        PrincipalResolver::new(&self.store, &self.config)
    }

    pub async fn resolve(&self, ctx: &AuthContext) -> AuthzResult<Principal> {
        self.principals().resolve(ctx).await
    }

    /// Core decision. `Err` only for store failures; every deny is a `Decision`.
    pub async fn decide(&self, principal: &Principal, entity: EntityRef, capability: Capability) -> AuthzResult<Decision> {
        let decision = if !self.principal_is_usable(principal).await? {
            Decision::Deny(DenyReason::Unauthenticated)
        } else if entity.kind == EntityKind::Label {
            self.decide_label(principal, entity.id, capability).await?
        } else {
            self.decide_in_tree(principal, entity, capability).await?
        };

        tracing::debug!(
            principal = %principal,
            entity = %entity,
            capability = %capability,
            decision = ?decision,
            "rights decision"
        );

        Ok(decision)
    }

    /// Like [`decide`](Self::decide) but a deny becomes `Unauthenticated`, `NotFound` or `Forbidden`.
    pub async fn authorize(&self, principal: &Principal, entity: EntityRef, capability: Capability) -> AuthzResult<()> {
        self.decide(principal, entity, capability).await?.into_result(entity)
    }

    pub async fn can(&self, principal: &Principal, entity: EntityRef, capability: Capability) -> AuthzResult<bool> {
        Ok(self.decide(principal, entity, capability).await?.is_allowed())
    }

    pub async fn can_read(&self, principal: &Principal, entity: EntityRef) -> AuthzResult<bool> {
        self.can(principal, entity, Capability::Read).await
    }

    pub async fn can_update(&self, principal: &Principal, entity: EntityRef) -> AuthzResult<bool> {
        self.can(principal, entity, Capability::Update).await
    }

    pub async fn can_delete(&self, principal: &Principal, entity: EntityRef) -> AuthzResult<bool> {
        self.can(principal, entity, Capability::Delete).await
    }

    pub async fn can_create(&self, principal: &Principal, container: Container) -> AuthzResult<bool> {
        Ok(self.decide_create(principal, container).await?.is_allowed())
    }

    pub async fn decide_create(&self, principal: &Principal, container: Container) -> AuthzResult<Decision> {
        if !self.principal_is_usable(principal).await? {
            return Ok(Decision::Deny(DenyReason::Unauthenticated));
        }
        match container {
            // Your own root container, or a label, needs no prior grant
            Container::Root | Container::Unrestricted => Ok(Decision::allow_if(!principal.is_link_share())),
            Container::Within(parent) => self.decide(principal, parent, Capability::Create).await,
        }
    }

    /// Effective level of `principal` on `entity`. Missing or deleted entities are `NotFound`.
    pub async fn effective_level(&self, principal: &Principal, entity: EntityRef) -> AuthzResult<PermissionLevel> {
        if !self.principal_is_usable(principal).await? {
            return Err(AuthzError::unauthenticated("link share is no longer valid"));
        }

        if entity.kind == EntityKind::Label {
            let node = self
                .store
                .node(entity)
                .await?
                .ok_or_else(|| AuthzError::not_found(entity.to_string()))?;
            if principal.user_id().is_some_and(|id| node.is_created_by(id)) {
                return Ok(PermissionLevel::Admin);
            }
            let readable = self.label_readable_through_tasks(principal, entity.id).await?;
            return Ok(if readable { PermissionLevel::Read } else { PermissionLevel::None });
        }

        let ancestry = self
            .ancestry(entity)
            .await?
            .ok_or_else(|| AuthzError::not_found(entity.to_string()))?;
        self.level_in(principal, &ancestry).await
    }

    /// A link share stays usable only while sharing is enabled and its project and
    /// namespace are live. Registered users were checked when they were resolved.
    async fn principal_is_usable(&self, principal: &Principal) -> AuthzResult<bool> {
        let Principal::LinkShare { id, project_id, .. } = principal else {
            return Ok(true);
        };
        if !self.config.link_sharing_enabled {
            return Ok(false);
        }
        let live = self.principals().project_is_live(*project_id).await?;
        if !live {
            tracing::debug!(link_share_id = *id, project_id = *project_id, "link share is bound to a missing or deleted project");
        }
        Ok(live)
    }

    async fn decide_in_tree(&self, principal: &Principal, entity: EntityRef, capability: Capability) -> AuthzResult<Decision> {
        // Link shares never manage sharing, whatever level they were issued with
        if capability == Capability::Share && principal.is_link_share() {
            return Ok(Decision::Deny(DenyReason::Forbidden));
        }

        let Some(ancestry) = self.ancestry(entity).await? else {
            return Ok(Decision::Deny(DenyReason::NotFound));
        };

        let level = self.level_in(principal, &ancestry).await?;
        Ok(Decision::allow_if(level.satisfies(capability.required_level())))
    }

    async fn level_in(&self, principal: &Principal, ancestry: &Ancestry) -> AuthzResult<PermissionLevel> {
        match principal {
            Principal::User { id } => self.user_level(*id, ancestry).await,
            Principal::LinkShare { project_id, level, .. } => {
                if ancestry.contains(EntityRef::project(*project_id)) {
                    Ok(*level)
                } else {
                    Ok(PermissionLevel::None)
                }
            }
        }
    }

    async fn user_level(&self, user_id: i64, ancestry: &Ancestry) -> AuthzResult<PermissionLevel> {
        if ancestry.created_by(user_id) {
            return Ok(PermissionLevel::Admin);
        }

        let teams: BTreeSet<i64> = self.store.teams_of(user_id).await?;

        // Most permissive grant anywhere on the path wins
        let mut effective = PermissionLevel::None;
        for scope in ancestry.grant_scopes() {
            let direct = self.store.direct_grant(scope, GrantSubject::User(user_id)).await?;
            let via_team = if teams.is_empty() {
                PermissionLevel::None
            } else {
                self.store.best_team_grant(scope, &teams).await?
            };
            effective = effective.max(direct).max(via_team);
            if effective == PermissionLevel::Admin {
                break;
            }
        }

        Ok(effective)
    }

    /// Labels are shared laterally: readable by their creator or by anyone who can read
    /// a task carrying them. Editing stays with the creator.
    async fn decide_label(&self, principal: &Principal, label_id: i64, capability: Capability) -> AuthzResult<Decision> {
        let Some(node) = self.store.node(EntityRef::label(label_id)).await? else {
            return Ok(Decision::Deny(DenyReason::NotFound));
        };
        let is_creator = principal.user_id().is_some_and(|id| node.is_created_by(id));

        let decision = match capability {
            Capability::Read => {
                let readable = is_creator || self.label_readable_through_tasks(principal, label_id).await?;
                Decision::allow_if(readable)
            }
            Capability::Update | Capability::Delete | Capability::Share => Decision::allow_if(is_creator),
            Capability::Create => Decision::allow_if(!principal.is_link_share()),
        };

        Ok(decision)
    }

    async fn label_readable_through_tasks(&self, principal: &Principal, label_id: i64) -> AuthzResult<bool> {
        for task_id in self.store.tasks_with_label(label_id).await? {
            let decision = self.decide_in_tree(principal, EntityRef::task(task_id), Capability::Read).await?;
            if decision.is_allowed() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Walks from `entity` to its namespace. `None` if any hop is missing or deleted,
    /// or if the chain is malformed.
    async fn ancestry(&self, entity: EntityRef) -> AuthzResult<Option<Ancestry>> {
        let mut nodes: Vec<EntityNode> = Vec::with_capacity(MAX_DEPTH);
        let mut next = Some(entity);

        while let Some(current) = next {
            if nodes.len() == MAX_DEPTH {
                tracing::warn!(entity = %entity, "hierarchy walk exceeded maximum depth");
                return Ok(None);
            }

            let Some(node) = self.store.node(current).await? else {
                return Ok(None);
            };
            if node.deleted {
                tracing::debug!(entity = %entity, deleted = %current, "ancestor is deleted");
                return Ok(None);
            }
            if node.parent.map(|p| p.kind) != current.kind.parent_kind() {
                tracing::warn!(entity = %current, parent = ?node.parent, "unexpected parent kind");
                return Ok(None);
            }

            next = node.parent;
            nodes.push(node);
        }

        let rooted = nodes.last().is_some_and(|node| node.entity.kind == EntityKind::Namespace);
        Ok(rooted.then_some(Ancestry { nodes }))
    }

    /// Grants `level` on `entity` to `subject`. Caller must hold Admin on `entity`.
    pub async fn share(
        &self,
        actor: &Principal,
        entity: EntityRef,
        subject: GrantSubject,
        level: PermissionLevel,
    ) -> AuthzResult<Grant> {
        validate_grant(entity, level)?;
        self.authorize(actor, entity, Capability::Share).await?;

        if !self.store.subject_exists(subject).await? {
            return Err(AuthzError::not_found(subject.to_string()));
        }

        let previous = self.find_grant(entity, subject).await?;
        let grant = self.store.upsert(entity, subject, level).await?;

        tracing::info!(
            actor = %actor,
            entity = %entity,
            subject = %subject,
            level = %level,
            "grant upserted"
        );
        if let Some(bus) = &self.events {
            let event = activity_event("upserted", actor.user_id(), &grant, previous.as_ref());
            self.store.publish(bus, event);
        }

        Ok(grant)
    }

    /// Removes the grant of `subject` on `entity`. Idempotent.
    pub async fn unshare(&self, actor: &Principal, entity: EntityRef, subject: GrantSubject) -> AuthzResult<()> {
        if !entity.kind.is_shareable() {
            return Err(AuthzError::not_shareable(format!("{} cannot carry grants", entity.kind)));
        }
        self.authorize(actor, entity, Capability::Share).await?;

        let previous = self.find_grant(entity, subject).await?;
        let removed = self.store.revoke(entity, subject).await?;

        if let (true, Some(grant)) = (removed, previous) {
            tracing::info!(actor = %actor, entity = %entity, subject = %subject, "grant revoked");
            if let Some(bus) = &self.events {
                let event = activity_event("revoked", actor.user_id(), &grant, None);
                self.store.publish(bus, event);
            }
        }

        Ok(())
    }

    /// Sharing records on `entity`; needs Read on it.
    pub async fn list_grants(&self, actor: &Principal, entity: EntityRef) -> AuthzResult<Vec<Grant>> {
        if !entity.kind.is_shareable() {
            return Err(AuthzError::not_shareable(format!("{} cannot carry grants", entity.kind)));
        }
        self.authorize(actor, entity, Capability::Read).await?;
        self.store.grants_on(entity).await
    }

    async fn find_grant(&self, entity: EntityRef, subject: GrantSubject) -> AuthzResult<Option<Grant>> {
        let grants = self.store.grants_on(entity).await?;
        Ok(grants.into_iter().find(|grant| grant.subject == subject))
    }
}
