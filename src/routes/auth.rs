//! Bearer-token authentication and account routes.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::services::auth::{self, AuthedUser};
use crate::state::AppState;

// =============================================================================
// EXTRACTOR
// =============================================================================

/// Authenticated caller, resolved from `Authorization: Bearer <token>`.
pub struct AuthUser(pub AuthedUser);

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let token = header.strip_prefix("Bearer ").map(str::trim).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let user = auth::verify_token(&app_state.pool, token)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self(user))
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct RegisterBody {
    pub name: String,
}

/// `POST /api/users` — register an account. The bearer token is returned
/// exactly once; only its hash is stored.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<Value>, StatusCode> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let (user, token) = auth::register_user(&state.pool, name)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(json!({ "id": user.id, "name": user.name, "token": token })))
}

/// `GET /api/auth/me` — identify the caller.
pub async fn me(auth: AuthUser) -> Json<AuthedUser> {
    Json(auth.0)
}
