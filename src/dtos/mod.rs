//! DTOs module - Data Transfer Objects
//!
//! Wire types shared by the HTTP layer, the socket protocol and the chat client.
//! DTOs keep the external (camelCase JSON) representation apart from the entities.

pub mod conversation;
pub mod deadline;
pub mod message;
pub mod project;
pub mod task;
pub mod user;
pub mod ws_event;

pub use conversation::Conversation;
pub use deadline::DeadlineItem;
pub use message::{
    ChatMessageDTO, ConversationDTO, CreateChatMessageDTO, NewMessagePayload, RecipientDTO,
    SenderSummaryDTO, StoredAttachment, UnreadCountDTO,
};
pub use project::{CreateProjectDTO, ProjectDTO, UpdateProjectDTO};
pub use task::{CreateTaskDTO, TaskDTO, UpdateTaskDTO};
pub use user::{CreateUserDTO, UserDTO};
pub use ws_event::{ClientEvent, ServerEvent};
