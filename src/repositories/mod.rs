//! Repositories module - One repository per table
//!
//! Queries are checked at runtime (`sqlx::query_as::<_, T>` over `FromRow` entities) so the
//! crate builds without a live database; the schema lives in `migrations/`.

pub mod chat_message;
pub mod project;
pub mod task;
pub mod traits;
pub mod user;

pub use traits::{Create, Read, Update};

pub use chat_message::ChatMessageRepository;
pub use project::ProjectRepository;
pub use task::TaskRepository;
pub use user::UserRepository;
