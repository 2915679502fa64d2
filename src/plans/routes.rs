//! REST endpoints for user sync and plan storage.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::model::{NewPlan, Plan, UserSync};
use crate::error::ApiError;
use crate::store::Database;

/// Shared state for plan and user routes.
#[derive(Clone)]
pub struct PlanRouteState {
    pub db: Arc<dyn Database>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlanRequest {
    clerk_id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    workout_plan: serde_json::Value,
    #[serde(default)]
    diet_plan: serde_json::Value,
    is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPlansQuery {
    clerk_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncUserRequest {
    clerk_id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    image: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/plans
async fn create_plan(
    State(state): State<PlanRouteState>,
    body: Result<Json<CreatePlanRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body?;
    let clerk_id =
        non_empty(body.clerk_id).ok_or_else(|| ApiError::Validation("Missing clerkId".into()))?;

    let plan = NewPlan {
        name: body.name.unwrap_or_default(),
        workout_plan: body.workout_plan,
        diet_plan: body.diet_plan,
        is_active: body.is_active.unwrap_or(false),
    };
    let plan_id = state.db.create_plan(&clerk_id, &plan).await?;
    Ok(Json(json!({ "planId": plan_id })))
}

/// GET /api/plans?clerkId=...
///
/// Returns the user's plans, newest first.
async fn list_plans(
    State(state): State<PlanRouteState>,
    Query(query): Query<ListPlansQuery>,
) -> Result<Json<Vec<Plan>>, ApiError> {
    let clerk_id =
        non_empty(query.clerk_id).ok_or_else(|| ApiError::Validation("Missing clerkId".into()))?;
    let plans = state.db.list_plans(&clerk_id).await?;
    Ok(Json(plans))
}

/// POST /api/users/sync
async fn sync_user(
    State(state): State<PlanRouteState>,
    body: Result<Json<SyncUserRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body?;
    let (Some(clerk_id), Some(email)) = (non_empty(body.clerk_id), non_empty(body.email)) else {
        return Err(ApiError::Validation("Missing required fields".into()));
    };

    state
        .db
        .upsert_user(&UserSync {
            clerk_id,
            name: body.name,
            email,
            image: body.image,
        })
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// Build the plan and user REST routes.
pub fn plan_routes(state: PlanRouteState) -> Router {
    Router::new()
        .route("/api/plans", post(create_plan).get(list_plans))
        .route("/api/users/sync", post(sync_user))
        .with_state(state)
}
