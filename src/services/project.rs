//! Project services - CRUD minimo dei progetti
//!
//! Ogni mutazione ricalcola e invia le scadenze del proprietario.

use crate::core::{AppError, AppState};
use crate::dtos::{CreateProjectDTO, ProjectDTO, UpdateProjectDTO};
use crate::entities::{Project, User};
use crate::repositories::{Create, Update};
use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<ProjectDTO>>, AppError> {
    debug!("Listing projects");
    let projects = if current_user.is_admin() {
        state.project.find_all().await?
    } else {
        state.project.find_many_by_owner(&current_user.user_id).await?
    };

    Ok(Json(projects.into_iter().map(ProjectDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(mut body): Json<CreateProjectDTO>,
) -> Result<(StatusCode, Json<ProjectDTO>), AppError> {
    debug!("Creating project");
    body.validate()?;
    body.user_id = current_user.user_id;

    let project = state.project.create(&body).await?;
    info!(project_id = project.project_id, "Project created");

    state.notifier.spawn_refresh_deadlines(project.user_id);

    Ok((StatusCode::CREATED, Json(ProjectDTO::from(project))))
}

#[instrument(skip(project), fields(project_id = %project.project_id))]
pub async fn get_project(Extension(project): Extension<Project>) -> Json<ProjectDTO> {
    Json(ProjectDTO::from(project))
}

#[instrument(skip(state, current_user, project, body), fields(user_id = %current_user.user_id, project_id = %project.project_id))]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(project): Extension<Project>,
    Json(body): Json<UpdateProjectDTO>,
) -> Result<Json<ProjectDTO>, AppError> {
    debug!("Updating project");
    body.validate()?;

    let updated = state.project.update(&project.project_id, &body).await?;
    info!("Project updated");

    // composizione esplicita: persistenza, poi notifica
    state.notifier.spawn_refresh_deadlines(updated.user_id);

    Ok(Json(ProjectDTO::from(updated)))
}
