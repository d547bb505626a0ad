//! Project CRUD routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::routes::auth::AuthUser;
use crate::services::project::{self, ProjectError, ProjectRow};
use crate::state::AppState;

pub(crate) fn project_error_to_status(err: &ProjectError) -> StatusCode {
    match err {
        ProjectError::ProjectNotFound(_) | ProjectError::EndpointNotFound(_) => StatusCode::NOT_FOUND,
        ProjectError::Duplicate(_) => StatusCode::CONFLICT,
        ProjectError::InvalidDefinition(_) => StatusCode::BAD_REQUEST,
        ProjectError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Deserialize)]
pub struct CreateProjectBody {
    pub name: String,
}

/// `POST /api/projects` — create a project.
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateProjectBody>,
) -> Result<(StatusCode, Json<ProjectRow>), StatusCode> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let project = project::create_project(&state.pool, auth.0.id, name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /api/projects` — list the caller's projects.
pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ProjectRow>>, StatusCode> {
    let projects = project::list_projects(&state.pool, auth.0.id)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    Ok(Json(projects))
}

/// `DELETE /api/projects/{project}` — delete a project and everything in it.
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_name): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    project::delete_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    Ok(Json(json!({ "ok": true })))
}
