//! Project entity

use super::enums::ProjectStatus;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub project_id: i32,
    /// Owner of the project (a client)
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Owners and staff are the only users allowed to see a project
    pub fn is_accessible_by(&self, user_id: i32, is_admin: bool) -> bool {
        is_admin || self.user_id == user_id
    }
}
