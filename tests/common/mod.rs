#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use wms_core::{
    auth::{Actor, Role},
    config::AppConfig,
    db,
    entities::{
        category,
        inventory_transaction::TransactionType,
        location::{self, LocationType},
        sku, zone,
    },
    events::{self, EventSender},
    handlers::{
        self,
        common::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER},
    },
    services::{
        ledger::{self, DocumentRef, LedgerKey},
        locations::CreateLocationRequest,
        AppServices,
    },
    AppState,
};

/// Application state over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

/// A small warehouse: one storage zone routed from category `ELEC` with two
/// bins, and a receiving zone holding the staging bin.
pub struct Layout {
    pub warehouse_id: Uuid,
    pub storage_zone: zone::Model,
    pub receiving_zone: zone::Model,
    pub aisle: location::Model,
    pub rack: location::Model,
    pub bin_large: location::Model,
    pub bin_small: location::Model,
    pub staging: location::Model,
    pub category: category::Model,
    pub sku: sku::Model,
}

pub fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Admin)
}

pub fn manager() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Manager)
}

pub fn staff() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Staff)
}

pub fn keeper() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Keeper)
}

pub fn today() -> chrono::NaiveDate {
    Utc::now().date_naive()
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        // Every pooled connection would open its own empty in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = handlers::app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// Sends a request through the full router, identifying as `actor` when given.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        actor: Option<&Actor>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder
                .header(ACTOR_ID_HEADER, actor.user_id.to_string())
                .header(ACTOR_ROLE_HEADER, actor.role.to_string());
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_zone(&self, warehouse_id: Uuid, code: &str) -> zone::Model {
        zone::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            code: Set(code.to_string()),
            name: Set(format!("Zone {}", code)),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed zone")
    }

    pub async fn seed_category(&self, code: &str) -> category::Model {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Category {}", code)),
            active: Set(true),
        }
        .insert(self.db())
        .await
        .expect("seed category")
    }

    pub async fn seed_sku(&self, code: &str, category_id: Option<Uuid>) -> sku::Model {
        sku::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Item {}", code)),
            category_id: Set(category_id),
            active: Set(true),
        }
        .insert(self.db())
        .await
        .expect("seed sku")
    }

    pub async fn create_location(
        &self,
        zone: &zone::Model,
        code: &str,
        location_type: LocationType,
        parent_id: Option<Uuid>,
        max_weight_kg: Option<Decimal>,
        is_staging: bool,
    ) -> location::Model {
        self.services()
            .locations
            .create_location(
                CreateLocationRequest {
                    warehouse_id: zone.warehouse_id,
                    zone_id: zone.id,
                    code: code.to_string(),
                    location_type,
                    parent_id,
                    max_weight_kg,
                    max_volume_m3: None,
                    is_picking_face: false,
                    is_staging,
                },
                &admin(),
            )
            .await
            .expect("create location")
    }

    pub async fn seed_layout(&self) -> Layout {
        let warehouse_id = Uuid::new_v4();
        let storage_zone = self.seed_zone(warehouse_id, "Z-ELEC").await;
        let receiving_zone = self.seed_zone(warehouse_id, "RCV").await;

        let aisle = self
            .create_location(&storage_zone, "A-01", LocationType::Aisle, None, None, false)
            .await;
        let rack = self
            .create_location(&storage_zone, "R-01", LocationType::Rack, Some(aisle.id), None, false)
            .await;
        let bin_large = self
            .create_location(
                &storage_zone,
                "B-01",
                LocationType::Bin,
                Some(rack.id),
                Some(Decimal::from(100)),
                false,
            )
            .await;
        let bin_small = self
            .create_location(
                &storage_zone,
                "B-02",
                LocationType::Bin,
                Some(rack.id),
                Some(Decimal::from(40)),
                false,
            )
            .await;

        let rcv_aisle = self
            .create_location(&receiving_zone, "RA-01", LocationType::Aisle, None, None, false)
            .await;
        let rcv_rack = self
            .create_location(
                &receiving_zone,
                "RR-01",
                LocationType::Rack,
                Some(rcv_aisle.id),
                None,
                false,
            )
            .await;
        let staging = self
            .create_location(
                &receiving_zone,
                "STG-01",
                LocationType::Bin,
                Some(rcv_rack.id),
                None,
                true,
            )
            .await;

        let category = self.seed_category("ELEC").await;
        let sku = self.seed_sku("SKU-TV-01", Some(category.id)).await;

        Layout {
            warehouse_id,
            storage_zone,
            receiving_zone,
            aisle,
            rack,
            bin_large,
            bin_small,
            staging,
            category,
            sku,
        }
    }

    /// Books `quantity` units straight onto a location.
    pub async fn seed_stock(&self, warehouse_id: Uuid, sku_id: Uuid, location_id: Uuid, quantity: i64) {
        ledger::apply_movement(
            self.db(),
            LedgerKey::new(warehouse_id, sku_id, None, location_id),
            quantity,
            TransactionType::Receive,
            DocumentRef::new("receiving_orders", Uuid::new_v4()),
            &admin(),
        )
        .await
        .expect("seed stock");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}
