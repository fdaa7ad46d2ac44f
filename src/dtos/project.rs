//! Project DTOs

use crate::entities::{Project, ProjectStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDTO {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectDTO {
    fn from(value: Project) -> Self {
        Self {
            id: value.project_id,
            user_id: value.user_id,
            title: value.title,
            description: value.description,
            status: value.status,
            deadline: value.deadline,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO to create a new project (without project_id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectDTO {
    #[serde(skip)]
    pub user_id: i32,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,

    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// DTO to update a project (only editable fields)
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectDTO {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub status: Option<ProjectStatus>,

    pub deadline: Option<DateTime<Utc>>,
}
