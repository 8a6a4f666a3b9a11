use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{page_request, success_response};
use crate::services::ledger::MovementFilter;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub warehouse_id: Uuid,
    pub sku_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StockBatchRequest {
    pub warehouse_id: Uuid,
    pub sku_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub warehouse_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub reference_table: Option<String>,
    pub reference_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Stock level and movement log routes
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(stock_level))
        .route("/stock/batch", post(stock_levels))
        .route("/locations/:id/stock", get(stock_at_location))
        .route("/movements", get(list_movements))
}

async fn stock_level(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .inventory
            .stock_level(query.warehouse_id, query.sku_id)
            .await?,
    ))
}

async fn stock_levels(
    State(state): State<AppState>,
    Json(request): Json<StockBatchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .inventory
            .stock_levels(request.warehouse_id, &request.sku_ids)
            .await?,
    ))
}

async fn stock_at_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.inventory.stock_at_location(id).await?,
    ))
}

async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = page_request(&state, query.page, query.per_page);
    let filter = MovementFilter {
        warehouse_id: query.warehouse_id,
        sku_id: query.sku_id,
        location_id: query.location_id,
        reference_table: query.reference_table,
        reference_id: query.reference_id,
    };
    Ok(success_response(
        state.services.inventory.list_movements(filter, page).await?,
    ))
}
