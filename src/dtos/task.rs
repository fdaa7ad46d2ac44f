//! Project task DTOs

use crate::entities::{ProjectTask, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskDTO {
    pub id: i32,
    pub project_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectTask> for TaskDTO {
    fn from(value: ProjectTask) -> Self {
        Self {
            id: value.task_id,
            project_id: value.project_id,
            title: value.title,
            description: value.description,
            status: value.status,
            deadline: value.deadline,
            created_at: value.created_at,
        }
    }
}

/// DTO to create a new task (project_id comes from the path)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskDTO {
    #[serde(skip)]
    pub project_id: i32,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// DTO to update a task (only editable fields)
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskDTO {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub deadline: Option<DateTime<Utc>>,
}
