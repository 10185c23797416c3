use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AuthzError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Namespace,
    Project,
    Task,
    Label,
    LabelTask,
    Comment,
    Attachment,
    Reminder,
    Relation,
    LinkShare,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Namespace,
        EntityKind::Project,
        EntityKind::Task,
        EntityKind::Label,
        EntityKind::LabelTask,
        EntityKind::Comment,
        EntityKind::Attachment,
        EntityKind::Reminder,
        EntityKind::Relation,
        EntityKind::LinkShare,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Namespace => "namespace",
            EntityKind::Project => "project",
            EntityKind::Task => "task",
            EntityKind::Label => "label",
            EntityKind::LabelTask => "label_task",
            EntityKind::Comment => "comment",
            EntityKind::Attachment => "attachment",
            EntityKind::Reminder => "reminder",
            EntityKind::Relation => "relation",
            EntityKind::LinkShare => "link_share",
        }
    }

    /// Kind of the container one hop up. `None` for roots: namespaces, and labels,
    /// which sit outside the tree.
    pub fn parent_kind(self) -> Option<EntityKind> {
        match self {
            EntityKind::Namespace | EntityKind::Label => None,
            EntityKind::Project => Some(EntityKind::Namespace),
            EntityKind::Task | EntityKind::LinkShare => Some(EntityKind::Project),
            EntityKind::LabelTask
            | EntityKind::Comment
            | EntityKind::Attachment
            | EntityKind::Reminder
            | EntityKind::Relation => Some(EntityKind::Task),
        }
    }

    /// Only namespaces and projects carry explicit grants.
    pub fn is_shareable(self) -> bool {
        matches!(self, EntityKind::Namespace | EntityKind::Project)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| AuthzError::invalid_input(format!("unknown entity kind `{wanted}`")))
    }
}

/// Typed reference to a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn namespace(id: i64) -> Self {
        Self::new(EntityKind::Namespace, id)
    }

    pub fn project(id: i64) -> Self {
        Self::new(EntityKind::Project, id)
    }

    pub fn task(id: i64) -> Self {
        Self::new(EntityKind::Task, id)
    }

    pub fn label(id: i64) -> Self {
        Self::new(EntityKind::Label, id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Parses `kind:id`, e.g. `task:42`.
impl FromStr for EntityRef {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| AuthzError::invalid_input(format!("expected kind:id, got `{s}`")))?;
        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|_| AuthzError::invalid_input(format!("invalid entity id in `{s}`")))?;
        Ok(EntityRef::new(kind.parse()?, id))
    }
}

/// One hop of the hierarchy as the stores report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNode {
    pub entity: EntityRef,
    pub parent: Option<EntityRef>,
    /// Creator or owner, for kinds that record one.
    pub creator_id: Option<i64>,
    /// Logically deleted. Namespaces, projects and tasks carry this flag.
    pub deleted: bool,
}

impl EntityNode {
    pub fn new(entity: EntityRef, parent: Option<EntityRef>, creator_id: Option<i64>) -> Self {
        Self {
            entity,
            parent,
            creator_id,
            deleted: false,
        }
    }

    pub fn is_created_by(&self, user_id: i64) -> bool {
        self.creator_id == Some(user_id)
    }
}

/// Where a new entity would be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// A top-level namespace: any registered user may create one.
    Root,
    /// Inside an existing container; needs Write on it.
    Within(EntityRef),
    /// No owning container (labels): any registered user may create one.
    Unrestricted,
}
