use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::putaway_task::PutawayStatus;
use crate::errors::ServiceError;
use crate::handlers::common::{page_request, success_response};
use crate::services::putaway::PutawayConfirmation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub warehouse_id: Uuid,
    pub status: Option<PutawayStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub confirmations: Vec<PutawayConfirmation>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub warehouse_id: Uuid,
    pub sku_ids: Vec<Uuid>,
    pub quantities: Vec<i64>,
}

/// Putaway task and placement suggestion routes
pub fn putaway_routes() -> Router<AppState> {
    Router::new()
        .route("/putaway-tasks", get(list_tasks))
        .route("/putaway-tasks/:id", get(get_task))
        .route("/putaway-tasks/:id/refine", post(refine_suggestions))
        .route("/putaway-tasks/:id/confirm", post(confirm_task))
        .route("/putaway/suggestions", post(suggest_locations))
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = page_request(&state, query.page, query.per_page);
    Ok(success_response(
        state
            .services
            .putaway
            .list_tasks(query.warehouse_id, query.status, page)
            .await?,
    ))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.putaway.get_task(id).await?))
}

async fn refine_suggestions(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.putaway.refine_suggestions(id, &actor).await?,
    ))
}

async fn confirm_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .putaway
            .confirm(id, &request.confirmations, &actor)
            .await?,
    ))
}

async fn suggest_locations(
    State(state): State<AppState>,
    Json(request): Json<SuggestionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .putaway
            .suggest_batch(request.warehouse_id, &request.sku_ids, &request.quantities)
            .await?,
    ))
}
