use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::outbound::OutboundKind;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event for work that has already been committed.
    /// A closed channel is logged and otherwise ignored.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

// Events published after a unit of work commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    LocationCreated {
        location_id: Uuid,
        warehouse_id: Uuid,
        code: String,
    },
    LocationDeactivated {
        location_id: Uuid,
    },
    InventoryReserved {
        warehouse_id: Uuid,
        reference_table: String,
        reference_id: Uuid,
        total_quantity: i64,
    },
    InventoryReleased {
        warehouse_id: Uuid,
        reference_table: String,
        reference_id: Uuid,
        total_quantity: i64,
    },
    OutboundSubmitted {
        kind: OutboundKind,
        document_id: Uuid,
        code: String,
    },
    OutboundApproved {
        kind: OutboundKind,
        document_id: Uuid,
        code: String,
        approved_by: Uuid,
    },
    OutboundRejected {
        kind: OutboundKind,
        document_id: Uuid,
        code: String,
    },
    OutboundCancelled {
        kind: OutboundKind,
        document_id: Uuid,
        code: String,
    },
    ReceivingPosted {
        receiving_order_id: Uuid,
        putaway_task_id: Uuid,
        posted_at: DateTime<Utc>,
    },
    PutawayConfirmed {
        task_id: Uuid,
        item_count: usize,
        total_quantity: i64,
    },
    PutawayCompleted {
        task_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::LocationCreated { .. } => "location_created",
            Event::LocationDeactivated { .. } => "location_deactivated",
            Event::InventoryReserved { .. } => "inventory_reserved",
            Event::InventoryReleased { .. } => "inventory_released",
            Event::OutboundSubmitted { .. } => "outbound_submitted",
            Event::OutboundApproved { .. } => "outbound_approved",
            Event::OutboundRejected { .. } => "outbound_rejected",
            Event::OutboundCancelled { .. } => "outbound_cancelled",
            Event::ReceivingPosted { .. } => "receiving_posted",
            Event::PutawayConfirmed { .. } => "putaway_confirmed",
            Event::PutawayCompleted { .. } => "putaway_completed",
        }
    }
}

/// Drains the event channel, logging each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(event = event.name(), %payload, "domain event"),
            Err(e) => warn!(event = event.name(), error = %e, "unserializable domain event"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();
        sender.emit(Event::LocationDeactivated { location_id: id }).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received, Event::LocationDeactivated { location_id: id });
        assert_eq!(received.name(), "location_deactivated");
    }

    #[tokio::test]
    async fn emit_ignores_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        sender
            .emit(Event::PutawayCompleted { task_id: Uuid::new_v4() })
            .await;
        assert!(sender.send(Event::PutawayCompleted { task_id: Uuid::new_v4() }).await.is_err());
    }
}
