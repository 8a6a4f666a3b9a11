// Ledger and numbering primitives shared by the workflows
pub mod documents;
pub mod ledger;

// Location hierarchy and stock reads
pub mod inventory;
pub mod locations;

// Workflows mutating the ledger
pub mod outbound;
pub mod putaway;
pub mod receiving;
pub mod reservations;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::events::EventSender;

use self::{
    inventory::InventoryService, locations::LocationService, outbound::OutboundService,
    putaway::PutawayService, receiving::ReceivingService, reservations::ReservationService,
};

/// Service container holding all service instances
#[derive(Clone)]
pub struct AppServices {
    pub locations: Arc<LocationService>,
    pub inventory: Arc<InventoryService>,
    pub reservations: Arc<ReservationService>,
    pub outbound: Arc<OutboundService>,
    pub receiving: Arc<ReceivingService>,
    pub putaway: Arc<PutawayService>,
}

impl AppServices {
    /// Creates every service over the shared connection and event channel
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, config: &AppConfig) -> Self {
        let events = Arc::new(event_sender);
        let max_page_size = config.max_page_size;

        Self {
            locations: Arc::new(LocationService::new(
                db.clone(),
                events.clone(),
                max_page_size,
            )),
            inventory: Arc::new(InventoryService::new(db.clone(), max_page_size)),
            reservations: Arc::new(ReservationService::new(db.clone(), events.clone())),
            outbound: Arc::new(OutboundService::new(
                db.clone(),
                events.clone(),
                config.rejection_reason_min_length,
                max_page_size,
            )),
            receiving: Arc::new(ReceivingService::new(
                db.clone(),
                events.clone(),
                max_page_size,
            )),
            putaway: Arc::new(PutawayService::new(db, events, max_page_size)),
        }
    }
}
