//! ProjectRepository - Repository per la gestione dei progetti

use super::{Create, Read, Update};
use crate::dtos::{CreateProjectDTO, UpdateProjectDTO};
use crate::entities::Project;
use chrono::Utc;
use sqlx::{Error, SqlitePool};

const PROJECT_COLUMNS: &str =
    "project_id, user_id, title, description, status, deadline, created_at, updated_at";

#[derive(Clone)]
pub struct ProjectRepository {
    connection_pool: SqlitePool,
}

impl ProjectRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// All projects owned by `user_id`, newest first
    pub async fn find_many_by_owner(&self, user_id: &i32) -> Result<Vec<Project>, Error> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ? ORDER BY created_at DESC, project_id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(projects)
    }

    /// Every project, for the back-office
    pub async fn find_all(&self) -> Result<Vec<Project>, Error> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, project_id DESC"
        ))
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(projects)
    }
}

impl Create<Project, CreateProjectDTO> for ProjectRepository {
    async fn create(&self, data: &CreateProjectDTO) -> Result<Project, Error> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO projects (user_id, title, description, status, deadline, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.user_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.deadline)
        .bind(now)
        .bind(now)
        .execute(&self.connection_pool)
        .await?;

        Ok(Project {
            project_id: result.last_insert_rowid() as i32,
            user_id: data.user_id,
            title: data.title.clone(),
            description: data.description.clone(),
            status: data.status,
            deadline: data.deadline,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Read<Project, i32> for ProjectRepository {
    async fn read(&self, id: &i32) -> Result<Option<Project>, Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(project)
    }
}

impl Update<Project, UpdateProjectDTO, i32> for ProjectRepository {
    async fn update(&self, id: &i32, data: &UpdateProjectDTO) -> Result<Project, Error> {
        // First, get the current project to ensure it exists
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;

        let title = data.title.clone().unwrap_or(current.title);
        let description = data.description.clone().unwrap_or(current.description);
        let status = data.status.unwrap_or(current.status);
        let deadline = data.deadline.or(current.deadline);

        sqlx::query(
            r#"
            UPDATE projects
            SET title = ?, description = ?, status = ?, deadline = ?, updated_at = ?
            WHERE project_id = ?
            "#,
        )
        .bind(&title)
        .bind(&description)
        .bind(status)
        .bind(deadline)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.connection_pool)
        .await?;

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}
