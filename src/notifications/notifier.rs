// Emitter handle for the order and stock subsystems

use std::sync::Arc;

use serde_json::Value;

use crate::notifications::{
    events::{NotificationEvent, Target},
    hub::{DeliveryReport, NotificationHub},
};

/// Cloneable handle collaborators use to push events
///
/// Emitters never see delivery failures; the report is informational.
#[derive(Clone)]
pub struct Notifier {
    hub: Arc<NotificationHub>,
}

impl Notifier {
    pub fn new(hub: Arc<NotificationHub>) -> Self {
        Self { hub }
    }

    pub fn emit(&self, event: &NotificationEvent) -> DeliveryReport {
        self.hub.emit(event)
    }

    /// Generic notification to any target
    pub fn notify(&self, target: Target, payload: Value) -> DeliveryReport {
        self.emit(&NotificationEvent::notification(target, payload))
    }

    /// Called when an order moves to a new status
    pub fn order_status_changed(&self, customer_id: i32, order_id: i64, status: &str) -> DeliveryReport {
        tracing::info!(
            "Order {} for customer {} moved to '{}'",
            order_id,
            customer_id,
            status
        );
        self.emit(&NotificationEvent::order_status(customer_id, order_id, status))
    }

    /// Called when a stock level drops below its threshold
    pub fn low_stock(&self, item: &str, remaining: i64, threshold: i64) -> DeliveryReport {
        tracing::warn!(
            "Low stock: '{}' at {} (threshold {})",
            item,
            remaining,
            threshold
        );
        self.emit(&NotificationEvent::low_stock(item, remaining, threshold))
    }
}
