//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! All traffic is JSON over REST. Definition routes live under
//! `/api/projects`; execution is `/api/run/{project}/{endpoint}` with the
//! method left open so each endpoint's declared verb can be enforced by the
//! orchestrator rather than the router.

pub mod auth;
pub mod endpoints;
pub mod keys;
pub mod projects;
pub mod run;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{any, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/users", post(auth::register))
        .route("/api/auth/me", get(auth::me))
        .route("/api/projects", get(projects::list_projects).post(projects::create_project))
        .route("/api/projects/{project}", axum::routing::delete(projects::delete_project))
        .route(
            "/api/projects/{project}/endpoints",
            get(endpoints::list_endpoints).post(endpoints::create_endpoint),
        )
        .route(
            "/api/projects/{project}/endpoints/{endpoint}",
            get(endpoints::get_endpoint)
                .put(endpoints::update_endpoint)
                .delete(endpoints::delete_endpoint),
        )
        .route(
            "/api/projects/{project}/endpoints/{endpoint}/preview",
            post(endpoints::preview_prompt),
        )
        .route(
            "/api/projects/{project}/endpoints/{endpoint}/events",
            get(run::list_events),
        )
        .route("/api/projects/{project}/keys", get(keys::list_credentials).post(keys::create_credential))
        .route(
            "/api/projects/{project}/keys/{key_id}",
            axum::routing::delete(keys::deactivate_credential),
        )
        .route("/api/run/{project}/{endpoint}", any(run::run_endpoint))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
