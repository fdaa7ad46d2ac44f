//! Entities module - Domain entities
//!
//! Every entity maps one table of the database. Entities never leave the server as-is:
//! the `dtos` module owns the wire representation.

pub mod chat_message;
pub mod enums;
pub mod project;
pub mod task;
pub mod user;

pub use chat_message::ChatMessage;
pub use enums::{DeadlineKind, ProjectStatus, TaskStatus, UserRole};
pub use project::Project;
pub use task::ProjectTask;
pub use user::User;
