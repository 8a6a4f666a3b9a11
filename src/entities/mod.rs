pub mod category;
pub mod inventory_lot;
pub mod inventory_snapshot;
pub mod inventory_transaction;
pub mod location;
pub mod outbound;
pub mod putaway_task;
pub mod putaway_task_item;
pub mod receiving_item;
pub mod receiving_order;
pub mod reservation;
pub mod sales_order;
pub mod sales_order_item;
pub mod sku;
pub mod transfer;
pub mod transfer_item;
pub mod zone;
