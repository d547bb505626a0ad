//! Endpoint execution and usage event routes.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::routes::auth::AuthUser;
use crate::routes::projects::project_error_to_status;
use crate::services::ai::{self, AiError, ExecutionOutcome, IncomingRequest};
use crate::services::credential::CredentialError;
use crate::services::{analytics, project};
use crate::state::AppState;

const DEFAULT_EVENT_LIMIT: i64 = 50;
const MAX_EVENT_LIMIT: i64 = 200;

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn ai_error_response(err: &AiError) -> (StatusCode, Json<Value>) {
    let status = match err {
        AiError::Project(e) => project_error_to_status(e),
        AiError::VerbMismatch { .. } => StatusCode::METHOD_NOT_ALLOWED,
        AiError::Validation(_) | AiError::NoCredential => StatusCode::BAD_REQUEST,
        AiError::Credential(CredentialError::NotFound | CredentialError::Inactive | CredentialError::MissingSecret(_)) => {
            StatusCode::BAD_REQUEST
        }
        AiError::Credential(_) | AiError::ProviderConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AiError::LlmFailed(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

// =============================================================================
// EXECUTION
// =============================================================================

/// `ANY /api/run/{project}/{endpoint}` — execute an endpoint. The endpoint's
/// declared verb decides which method is accepted; GET reads input from the
/// query string, everything else from the JSON body.
pub async fn run_endpoint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_name, endpoint_name)): Path<(String, String)>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let query = query
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    let request = IncomingRequest {
        verb: method.as_str().to_ascii_uppercase(),
        query,
        body: body.map(|Json(value)| value),
    };

    let outcome = ai::execute(&state, auth.0.id, &project_name, &endpoint_name, request)
        .await
        .map_err(|e| ai_error_response(&e))?;

    Ok(Json(match outcome {
        ExecutionOutcome::Payload { api_payload, provider, endpoint_hint } => json!({
            "api_payload": api_payload,
            "provider": provider,
            "endpoint_hint": endpoint_hint,
        }),
        ExecutionOutcome::Generated { output, usage } => json!({
            "output": output,
            "usage": usage,
        }),
    }))
}

// =============================================================================
// USAGE EVENTS
// =============================================================================

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

/// `GET /api/projects/{project}/endpoints/{endpoint}/events` — recent
/// executions, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_name, endpoint_name)): Path<(String, String)>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<Value>, StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    let endpoint = project::find_endpoint(&state.pool, project.id, &endpoint_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    let events = analytics::list_events(&state.pool, endpoint.id, limit)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(json!({ "events": events })))
}
