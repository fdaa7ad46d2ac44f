//! Conversation key - identifies the thread displayed on one side of a chat

use serde::{Deserialize, Serialize};

/// A chat thread seen from the current user: either a direct thread with `recipient_id`
/// or the thread with `recipient_id` inside project `project_id`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conversation {
    #[serde(rename_all = "camelCase")]
    Direct { recipient_id: i32 },
    #[serde(rename_all = "camelCase")]
    Project { project_id: i32, recipient_id: i32 },
}

impl Conversation {
    pub fn direct(recipient_id: i32) -> Self {
        Conversation::Direct { recipient_id }
    }

    pub fn project(project_id: i32, recipient_id: i32) -> Self {
        Conversation::Project {
            project_id,
            recipient_id,
        }
    }

    /// Builds a key from a raw project id where a missing id or `0` means "direct".
    pub fn from_parts(project_id: Option<i32>, recipient_id: i32) -> Self {
        match project_id {
            Some(project_id) if project_id != 0 => Self::project(project_id, recipient_id),
            _ => Self::direct(recipient_id),
        }
    }

    pub fn recipient_id(&self) -> i32 {
        match self {
            Conversation::Direct { recipient_id } => *recipient_id,
            Conversation::Project { recipient_id, .. } => *recipient_id,
        }
    }

    pub fn project_id(&self) -> Option<i32> {
        match self {
            Conversation::Direct { .. } => None,
            Conversation::Project { project_id, .. } => Some(*project_id),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Conversation::Direct { .. })
    }

    /// Path of the conversation endpoint, relative to the `/api` prefix
    pub fn path(&self) -> String {
        match self {
            Conversation::Direct { recipient_id } => format!("/chat/direct/{}", recipient_id),
            Conversation::Project {
                project_id,
                recipient_id,
            } => format!("/projects/{}/chat/{}", project_id, recipient_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_project_id_is_direct() {
        assert_eq!(Conversation::from_parts(Some(0), 7), Conversation::direct(7));
        assert_eq!(Conversation::from_parts(None, 7), Conversation::direct(7));
        assert_eq!(
            Conversation::from_parts(Some(10), 7),
            Conversation::project(10, 7)
        );
    }

    #[test]
    fn test_paths() {
        assert_eq!(Conversation::direct(2).path(), "/chat/direct/2");
        assert_eq!(Conversation::project(10, 2).path(), "/projects/10/chat/2");
    }
}
