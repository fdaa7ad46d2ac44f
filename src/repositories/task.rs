//! TaskRepository - Repository per la gestione dei task di progetto

use super::{Create, Read, Update};
use crate::dtos::{CreateTaskDTO, UpdateTaskDTO};
use crate::entities::ProjectTask;
use chrono::Utc;
use sqlx::{Error, SqlitePool};

const TASK_COLUMNS: &str = "task_id, project_id, title, description, status, deadline, created_at";

#[derive(Clone)]
pub struct TaskRepository {
    connection_pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Tasks of a project, newest first
    pub async fn find_many_by_project(&self, project_id: &i32) -> Result<Vec<ProjectTask>, Error> {
        let tasks = sqlx::query_as::<_, ProjectTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM project_tasks WHERE project_id = ? ORDER BY created_at DESC, task_id DESC"
        ))
        .bind(project_id)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(tasks)
    }
}

impl Create<ProjectTask, CreateTaskDTO> for TaskRepository {
    async fn create(&self, data: &CreateTaskDTO) -> Result<ProjectTask, Error> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO project_tasks (project_id, title, description, status, deadline, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.project_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.deadline)
        .bind(created_at)
        .execute(&self.connection_pool)
        .await?;

        Ok(ProjectTask {
            task_id: result.last_insert_rowid() as i32,
            project_id: data.project_id,
            title: data.title.clone(),
            description: data.description.clone(),
            status: data.status,
            deadline: data.deadline,
            created_at,
        })
    }
}

impl Read<ProjectTask, i32> for TaskRepository {
    async fn read(&self, id: &i32) -> Result<Option<ProjectTask>, Error> {
        let task = sqlx::query_as::<_, ProjectTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM project_tasks WHERE task_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(task)
    }
}

impl Update<ProjectTask, UpdateTaskDTO, i32> for TaskRepository {
    async fn update(&self, id: &i32, data: &UpdateTaskDTO) -> Result<ProjectTask, Error> {
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;

        let title = data.title.clone().unwrap_or(current.title);
        let description = data.description.clone().or(current.description);
        let status = data.status.unwrap_or(current.status);
        let deadline = data.deadline.or(current.deadline);

        sqlx::query(
            r#"
            UPDATE project_tasks
            SET title = ?, description = ?, status = ?, deadline = ?
            WHERE task_id = ?
            "#,
        )
        .bind(&title)
        .bind(&description)
        .bind(status)
        .bind(deadline)
        .bind(id)
        .execute(&self.connection_pool)
        .await?;

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}
