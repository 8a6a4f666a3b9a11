use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::location::LocationType;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, page_request, success_response};
use crate::services::ledger::OccupancyStatus;
use crate::services::locations::{
    CapacityRequest, CreateLocationRequest, LocationFilter, OccupancyFilter, UpdateLocationRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub warehouse_id: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub location_type: Option<LocationType>,
    pub parent_id: Option<Uuid>,
    pub active: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    pub warehouse_id: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub status: Option<OccupancyStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct EmptyBinQuery {
    pub warehouse_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub limit: Option<u64>,
}

/// Location hierarchy, capacity and occupancy routes
pub fn locations_routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/:id", get(get_location).patch(update_location))
        .route("/locations/:id/capacity", put(configure_capacity))
        .route("/locations/:id/deactivate", post(deactivate_location))
        .route("/locations/:id/ancestry", get(location_ancestry))
        .route("/locations/:id/occupancy", get(bin_occupancy))
        .route("/occupancy", get(list_occupancy))
        .route("/empty-bins", get(search_empty_bins))
        .route("/warehouses/:warehouse_id/staging", get(staging_location))
}

async fn create_location(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateLocationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state
        .services
        .locations
        .create_location(request, &actor)
        .await?;
    Ok(created_response(location))
}

async fn update_location(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state
        .services
        .locations
        .update_location(id, request, &actor)
        .await?;
    Ok(success_response(location))
}

async fn configure_capacity(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<CapacityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state
        .services
        .locations
        .configure_capacity(id, request, &actor)
        .await?;
    Ok(success_response(location))
}

async fn deactivate_location(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state
        .services
        .locations
        .deactivate_location(id, &actor)
        .await?;
    Ok(success_response(location))
}

async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.locations.get_location(id).await?,
    ))
}

async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = page_request(&state, query.page, query.per_page);
    let filter = LocationFilter {
        warehouse_id: query.warehouse_id,
        zone_id: query.zone_id,
        location_type: query.location_type,
        parent_id: query.parent_id,
        active: query.active,
    };
    Ok(success_response(
        state.services.locations.list_locations(filter, page).await?,
    ))
}

async fn location_ancestry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.locations.ancestry(id).await?))
}

async fn bin_occupancy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.locations.view_bin_occupancy(id).await?,
    ))
}

async fn list_occupancy(
    State(state): State<AppState>,
    Query(query): Query<OccupancyQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = page_request(&state, query.page, query.per_page);
    let filter = OccupancyFilter {
        warehouse_id: query.warehouse_id,
        zone_id: query.zone_id,
        status: query.status,
    };
    Ok(success_response(
        state
            .services
            .locations
            .list_bin_occupancy(filter, page)
            .await?,
    ))
}

async fn search_empty_bins(
    State(state): State<AppState>,
    Query(query): Query<EmptyBinQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query.limit.unwrap_or(state.config.default_page_size);
    Ok(success_response(
        state
            .services
            .locations
            .search_empty_bins(query.warehouse_id, query.zone_id, limit)
            .await?,
    ))
}

async fn staging_location(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .locations
            .staging_location(warehouse_id)
            .await?,
    ))
}
