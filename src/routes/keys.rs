//! Provider credential routes. Plaintext keys go in, never come back out.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::llm::Provider;
use crate::routes::auth::AuthUser;
use crate::routes::projects::project_error_to_status;
use crate::services::credential::{self, CredentialError, CredentialRow, NewCredential};
use crate::services::project;
use crate::state::AppState;

fn credential_error_to_status(err: &CredentialError) -> StatusCode {
    match err {
        CredentialError::NotFound => StatusCode::NOT_FOUND,
        CredentialError::Inactive | CredentialError::MissingSecret(_) => StatusCode::BAD_REQUEST,
        CredentialError::Crypto(_) | CredentialError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// WIRE SHAPES
// =============================================================================

/// Credential as listed back to its owner: secret material omitted, only a
/// flag saying whether a key is on file.
#[derive(Serialize)]
pub struct CredentialResponse {
    pub id: Uuid,
    pub name: String,
    pub provider: Provider,
    pub has_api_key: bool,
    pub endpoint_url: Option<String>,
    pub model: Option<String>,
    pub active: bool,
}

fn to_response(row: CredentialRow) -> CredentialResponse {
    CredentialResponse {
        id: row.id,
        name: row.name,
        provider: row.provider,
        has_api_key: row.api_key_ciphertext.is_some(),
        endpoint_url: row.endpoint_url,
        model: row.model,
        active: row.active,
    }
}

#[derive(Deserialize)]
pub struct CreateCredentialBody {
    pub name: String,
    pub provider: String,
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub model: Option<String>,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/projects/{project}/keys` — store a credential, encrypting the
/// API key at rest.
pub async fn create_credential(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_name): Path<String>,
    Json(body): Json<CreateCredentialBody>,
) -> Result<(StatusCode, Json<CredentialResponse>), StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;

    let Ok(provider) = Provider::parse(&body.provider) else {
        return Err(StatusCode::BAD_REQUEST);
    };
    if body.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    // The secret the provider will actually need must be present up front.
    let has_secret = match provider {
        Provider::LlmServer => body.endpoint_url.as_deref().is_some_and(|url| !url.trim().is_empty()),
        _ => body.api_key.as_deref().is_some_and(|key| !key.trim().is_empty()),
    };
    if !has_secret {
        return Err(StatusCode::BAD_REQUEST);
    }

    let row = credential::create_credential(
        &state.pool,
        &state.master_key,
        project.id,
        NewCredential {
            name: body.name,
            provider,
            api_key: body.api_key,
            endpoint_url: body.endpoint_url,
            model: body.model,
        },
    )
    .await
    .map_err(|e| credential_error_to_status(&e))?;

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

/// `GET /api/projects/{project}/keys` — list credentials without secrets.
pub async fn list_credentials(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_name): Path<String>,
) -> Result<Json<Vec<CredentialResponse>>, StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    let rows = credential::list_credentials(&state.pool, project.id)
        .await
        .map_err(|e| credential_error_to_status(&e))?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// `DELETE /api/projects/{project}/keys/{key_id}` — deactivate a credential.
pub async fn deactivate_credential(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_name, key_id)): Path<(String, Uuid)>,
) -> Result<Json<Value>, StatusCode> {
    let project = project::find_project(&state.pool, auth.0.id, &project_name)
        .await
        .map_err(|e| project_error_to_status(&e))?;
    credential::deactivate_credential(&state.pool, project.id, key_id)
        .await
        .map_err(|e| credential_error_to_status(&e))?;
    Ok(Json(json!({ "ok": true })))
}
