//! User DTOs

use crate::entities::{User, UserRole};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Public view of a user, the password hash never leaves the server
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserDTO {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub role: UserRole,
    pub avatar: Option<String>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            id: value.user_id,
            username: value.username,
            full_name: value.full_name,
            role: value.role,
            avatar: value.avatar,
        }
    }
}

/// DTO to create a new user (without user_id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDTO {
    #[validate(length(min = 3, max = 32, message = "Username must be between 3 and 32 characters"))]
    pub username: String,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: String,

    // registration always creates clients, staff accounts come from the bootstrap
    #[serde(skip)]
    pub role: UserRole,
}
