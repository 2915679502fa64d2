//! HTTP application assembly.

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::coach::{CoachManager, CoachRouteState, coach_routes};
use crate::llm::{GenerateState, LlmProvider, generate_routes};
use crate::plans::{PlanRouteState, plan_routes};
use crate::store::Database;

/// Shared services behind every route.
#[derive(Clone)]
pub struct AppDeps {
    pub db: Arc<dyn Database>,
    pub llm: Arc<dyn LlmProvider>,
    pub coach: Arc<CoachManager>,
}

/// Build the full router: generation, plans, users, sessions and health.
pub fn build_app(deps: AppDeps) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(generate_routes(GenerateState {
            llm: Arc::clone(&deps.llm),
        }))
        .merge(plan_routes(PlanRouteState {
            db: Arc::clone(&deps.db),
        }))
        .merge(coach_routes(CoachRouteState {
            manager: Arc::clone(&deps.coach),
        }))
        .layer(CorsLayer::permissive())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "fitness-coach"
    }))
}
