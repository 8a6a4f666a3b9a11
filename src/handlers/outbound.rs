use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::outbound::{OutboundKind, OutboundStatus};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, page_request, success_response};
use crate::services::ledger::DocumentRef;
use crate::services::outbound::{
    ApprovalDecision, CreateOutboundRequest, OutboundFilter, UpdateOutboundRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OutboundQuery {
    pub warehouse_id: Option<Uuid>,
    pub status: Option<OutboundStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Sales order and internal transfer routes
pub fn outbound_routes() -> Router<AppState> {
    Router::new()
        .route("/sales-orders", get(list_sales_orders).post(create_sales_order))
        .route("/sales-orders/:id", get(get_sales_order).put(update_sales_order))
        .route("/sales-orders/:id/submit", post(submit_sales_order))
        .route("/sales-orders/:id/approve", post(approve_sales_order))
        .route("/sales-orders/:id/cancel", post(cancel_sales_order))
        .route("/sales-orders/:id/reservations", get(sales_order_reservations))
        .route("/transfers", get(list_transfers).post(create_transfer))
        .route("/transfers/:id", get(get_transfer).put(update_transfer))
        .route("/transfers/:id/submit", post(submit_transfer))
        .route("/transfers/:id/cancel", post(cancel_transfer))
        .route("/transfers/:id/reservations", get(transfer_reservations))
}

async fn create(
    state: AppState,
    kind: OutboundKind,
    actor: Actor,
    request: CreateOutboundRequest,
) -> Result<impl IntoResponse, ServiceError> {
    if request.details.kind() != kind {
        return Err(ServiceError::ValidationError(format!(
            "expected a {} document, got {}",
            kind,
            request.details.kind()
        )));
    }
    let outcome = state.services.outbound.create(request, &actor).await?;
    Ok(created_response(outcome))
}

async fn list(
    state: AppState,
    kind: OutboundKind,
    query: OutboundQuery,
) -> Result<impl IntoResponse, ServiceError> {
    let page = page_request(&state, query.page, query.per_page);
    let filter = OutboundFilter {
        warehouse_id: query.warehouse_id,
        status: query.status,
    };
    Ok(success_response(
        state.services.outbound.list(kind, filter, page).await?,
    ))
}

async fn reservations_of(
    state: AppState,
    kind: OutboundKind,
    id: Uuid,
) -> Result<impl IntoResponse, ServiceError> {
    let reference = DocumentRef::new(kind.reference_table(), id);
    Ok(success_response(
        state
            .services
            .reservations
            .list_for_reference(reference)
            .await?,
    ))
}

async fn create_sales_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateOutboundRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    create(state, OutboundKind::SalesOrder, actor, request).await
}

async fn list_sales_orders(
    State(state): State<AppState>,
    Query(query): Query<OutboundQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    list(state, OutboundKind::SalesOrder, query).await
}

async fn get_sales_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.outbound.get(OutboundKind::SalesOrder, id).await?,
    ))
}

async fn update_sales_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOutboundRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .outbound
            .update(OutboundKind::SalesOrder, id, request, &actor)
            .await?,
    ))
}

async fn submit_sales_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .outbound
            .submit(OutboundKind::SalesOrder, id, &actor)
            .await?,
    ))
}

async fn approve_sales_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(decision): Json<ApprovalDecision>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.outbound.approve(id, decision, &actor).await?,
    ))
}

async fn cancel_sales_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .outbound
            .cancel(OutboundKind::SalesOrder, id, &actor)
            .await?,
    ))
}

async fn sales_order_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    reservations_of(state, OutboundKind::SalesOrder, id).await
}

async fn create_transfer(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateOutboundRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    create(state, OutboundKind::InternalTransfer, actor, request).await
}

async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<OutboundQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    list(state, OutboundKind::InternalTransfer, query).await
}

async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .outbound
            .get(OutboundKind::InternalTransfer, id)
            .await?,
    ))
}

async fn update_transfer(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOutboundRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .outbound
            .update(OutboundKind::InternalTransfer, id, request, &actor)
            .await?,
    ))
}

async fn submit_transfer(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .outbound
            .submit(OutboundKind::InternalTransfer, id, &actor)
            .await?,
    ))
}

async fn cancel_transfer(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .outbound
            .cancel(OutboundKind::InternalTransfer, id, &actor)
            .await?,
    ))
}

async fn transfer_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    reservations_of(state, OutboundKind::InternalTransfer, id).await
}
