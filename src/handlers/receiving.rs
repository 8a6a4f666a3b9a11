use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::receiving_order::ReceivingStatus;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, page_request, success_response};
use crate::services::receiving::{CreateReceivingRequest, ReceivingFilter};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReceivingQuery {
    pub warehouse_id: Option<Uuid>,
    pub status: Option<ReceivingStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Receiving order (GRN) routes
pub fn receiving_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/receiving-orders",
            get(list_receiving_orders).post(create_receiving_order),
        )
        .route("/receiving-orders/:id", get(get_receiving_order))
        .route("/receiving-orders/:id/submit", post(submit_receiving_order))
        .route("/receiving-orders/:id/approve", post(approve_receiving_order))
        .route("/receiving-orders/:id/post", post(post_receiving_order))
}

async fn create_receiving_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateReceivingRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.receiving.create(request, &actor).await?;
    Ok(created_response(order))
}

async fn list_receiving_orders(
    State(state): State<AppState>,
    Query(query): Query<ReceivingQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = page_request(&state, query.page, query.per_page);
    let filter = ReceivingFilter {
        warehouse_id: query.warehouse_id,
        status: query.status,
    };
    Ok(success_response(
        state.services.receiving.list(filter, page).await?,
    ))
}

async fn get_receiving_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.receiving.get(id).await?))
}

async fn submit_receiving_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.receiving.submit(id, &actor).await?,
    ))
}

async fn approve_receiving_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.receiving.approve(id, &actor).await?,
    ))
}

async fn post_receiving_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.receiving.post(id, &actor).await?,
    ))
}
