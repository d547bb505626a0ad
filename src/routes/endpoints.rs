//! Endpoint definition CRUD and prompt preview routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::llm::schema::JsonSchema;
use crate::routes::auth::AuthUser;
use crate::routes::projects::project_error_to_status;
use crate::routes::run::ai_error_response;
use crate::services::ai;
use crate::services::project::{self, EndpointDefinition, EndpointKind, EndpointRow};
use crate::state::AppState;

// =============================================================================
// WIRE SHAPES
// =============================================================================

#[derive(Serialize)]
pub struct EndpointResponse {
    pub name: String,
    pub http_verb: String,
    pub kind: EndpointKind,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub instructions: Option<String>,
    pub context: Option<String>,
    pub api_key_id: Option<Uuid>,
}

fn to_response(row: EndpointRow) -> EndpointResponse {
    EndpointResponse {
        name: row.name,
        http_verb: row.http_verb,
        kind: row.kind,
        input_schema: row.input_schema,
        output_schema: row.output_schema,
        instructions: row.instructions,
        context: row.context,
        api_key_id: row.api_key_id,
    }
}

#[derive(Deserialize)]
pub struct EndpointBody {
    pub name: String,
    pub http_verb: String,
    pub kind: String,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub instructions: Option<String>,
    pub context: Option<String>,
    pub api_key_id: Option<Uuid>,
}

fn definition_from_body(body: EndpointBody) -> Result<EndpointDefinition, StatusCode> {
    let kind = EndpointKind::from_str(&body.kind).ok_or(StatusCode::BAD_REQUEST)?;
    if body.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    // Reject schemas the renderer cannot consume, before they are stored.
    if let Some(schema) = &body.output_schema {
        serde_json::from_value::<JsonSchema>(schema.clone()).map_err(|_| StatusCode::BAD_REQUEST)?;
    }
    Ok(EndpointDefinition {
        name: body.name,
        http_verb: body.http_verb,
        kind,
        input_schema: body.input_schema,
        output_schema: body.output_schema,
        instructions: body.instructions,
        context: body.context,
        api_key_id: body.api_key_id,
    })
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/projects/{project}/endpoints` — define an endpoint.
pub async fn create_endpoint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_name): Path<String>,
    Json(body): Json<EndpointBody>,
) -> Result<(StatusCode, Json<EndpointResponse>), StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    let definition = definition_from_body(body)?;

    let row = project::create_endpoint(&state.pool, project.id, definition)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

/// `GET /api/projects/{project}/endpoints` — list endpoint definitions.
pub async fn list_endpoints(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_name): Path<String>,
) -> Result<Json<Vec<EndpointResponse>>, StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    let rows = project::list_endpoints(&state.pool, project.id)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// `GET /api/projects/{project}/endpoints/{endpoint}` — fetch one definition.
pub async fn get_endpoint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_name, endpoint_name)): Path<(String, String)>,
) -> Result<Json<EndpointResponse>, StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    let row = project::find_endpoint(&state.pool, project.id, &endpoint_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    Ok(Json(to_response(row)))
}

/// `PUT /api/projects/{project}/endpoints/{endpoint}` — replace a definition.
pub async fn update_endpoint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_name, endpoint_name)): Path<(String, String)>,
    Json(body): Json<EndpointBody>,
) -> Result<Json<EndpointResponse>, StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    let definition = definition_from_body(body)?;

    let row = project::update_endpoint(&state.pool, project.id, &endpoint_name, definition)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    Ok(Json(to_response(row)))
}

/// `DELETE /api/projects/{project}/endpoints/{endpoint}` — remove a definition.
pub async fn delete_endpoint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_name, endpoint_name)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    project::delete_endpoint(&state.pool, project.id, &endpoint_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    Ok(Json(json!({ "ok": true })))
}

/// `POST /api/projects/{project}/endpoints/{endpoint}/preview` — the prompt
/// an execution would send, without touching any provider.
pub async fn preview_prompt(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_name, endpoint_name)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let sample_input = body.map_or_else(|| json!({}), |Json(value)| value);
    let prompt = ai::preview(&state, auth.0.id, &project_name, &endpoint_name, sample_input)
        .await
        .map_err(|e| ai_error_response(&e))?;
    Ok(Json(json!({ "prompt": prompt })))
}
