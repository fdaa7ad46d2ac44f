//! Deadline DTO - computed projection over projects and tasks, never persisted

use crate::entities::{DeadlineKind, Project, ProjectStatus, ProjectTask, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineItem {
    pub id: i32,
    pub project_id: i32,
    pub project_title: String,
    pub title: String,
    pub deadline: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: DeadlineKind,
    pub status: String,
}

impl DeadlineItem {
    /// Deadline item for a project, `None` when the project has no deadline
    pub fn from_project(project: &Project) -> Option<Self> {
        project.deadline.map(|deadline| Self {
            id: project.project_id,
            project_id: project.project_id,
            project_title: project.title.clone(),
            title: project.title.clone(),
            deadline,
            kind: DeadlineKind::Project,
            status: project.status.as_str().to_string(),
        })
    }

    /// Deadline item for a task of `project`, `None` when the task has no deadline
    pub fn from_task(project: &Project, task: &ProjectTask) -> Option<Self> {
        task.deadline.map(|deadline| Self {
            id: task.task_id,
            project_id: project.project_id,
            project_title: project.title.clone(),
            title: task.title.clone(),
            deadline,
            kind: DeadlineKind::Task,
            status: task.status.as_str().to_string(),
        })
    }

    pub fn is_completed(&self) -> bool {
        match self.kind {
            DeadlineKind::Project => self.status == ProjectStatus::Completed.as_str(),
            DeadlineKind::Task => self.status == TaskStatus::Done.as_str(),
        }
    }
}
