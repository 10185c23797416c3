//! Records for every entity kind, and how each one answers the capability checks.

pub mod attachment;
pub mod comment;
pub mod grant;
pub mod label;
pub mod label_task;
pub mod link_share;
pub mod namespace;
pub mod project;
pub mod reminder;
pub mod relation;
pub mod task;
pub mod team;
pub mod user;

pub use attachment::Attachment;
pub use comment::Comment;
pub use label::Label;
pub use label_task::LabelTask;
pub use link_share::{LinkShare, LinkShareCreateRequest};
pub use namespace::Namespace;
pub use project::Project;
pub use reminder::Reminder;
pub use relation::TaskRelation;
pub use task::Task;
pub use team::{Team, TeamMember};
pub use user::User;
