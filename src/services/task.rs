//! Task services - CRUD minimo dei task di progetto

use crate::core::{AppError, AppState};
use crate::dtos::{CreateTaskDTO, TaskDTO, UpdateTaskDTO};
use crate::entities::Project;
use crate::repositories::{Create, Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, project), fields(project_id = %project.project_id))]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(project): Extension<Project>,
) -> Result<Json<Vec<TaskDTO>>, AppError> {
    debug!("Listing tasks");
    let tasks = state.task.find_many_by_project(&project.project_id).await?;
    Ok(Json(tasks.into_iter().map(TaskDTO::from).collect()))
}

#[instrument(skip(state, project, body), fields(project_id = %project.project_id))]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(project): Extension<Project>,
    Json(mut body): Json<CreateTaskDTO>,
) -> Result<(StatusCode, Json<TaskDTO>), AppError> {
    debug!("Creating task");
    body.validate()?;
    body.project_id = project.project_id;

    let task = state.task.create(&body).await?;
    info!(task_id = task.task_id, "Task created");

    state.notifier.spawn_refresh_deadlines(project.user_id);

    Ok((StatusCode::CREATED, Json(TaskDTO::from(task))))
}

#[instrument(skip(state, project, body), fields(project_id = %project.project_id))]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(project): Extension<Project>,
    Path((_, task_id)): Path<(i32, i32)>,
    Json(body): Json<UpdateTaskDTO>,
) -> Result<Json<TaskDTO>, AppError> {
    debug!(task_id, "Updating task");
    body.validate()?;

    // 1. Il task deve esistere e appartenere al progetto del path
    match state.task.read(&task_id).await? {
        Some(task) if task.project_id == project.project_id => {}
        _ => {
            warn!(task_id, "Task not found in project");
            return Err(AppError::not_found("Task not found"));
        }
    }

    // 2. Aggiornamento, poi notifica al proprietario del progetto
    let updated = state.task.update(&task_id, &body).await?;
    info!(task_id, "Task updated");

    state.notifier.spawn_refresh_deadlines(project.user_id);

    Ok(Json(TaskDTO::from(updated)))
}
