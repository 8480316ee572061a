use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregate::Order;
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Lifecycle Events - facts published after each committed change
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LifecycleEventKind {
    Placed {
        total_amount: f64,
        item_count: i32,
    },
    StatusAdvanced {
        from: OrderStatus,
        to: OrderStatus,
    },
    Cancelled {
        from: OrderStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_id: Uuid,
    pub order_id: OrderId,
    pub owner_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: LifecycleEventKind,
}

impl LifecycleEvent {
    pub fn new(order: &Order, kind: LifecycleEventKind) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            order_id: order.id,
            owner_id: order.owner_id.clone(),
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self.kind {
            LifecycleEventKind::Placed { .. } => "OrderPlaced",
            LifecycleEventKind::StatusAdvanced { .. } => "OrderStatusAdvanced",
            LifecycleEventKind::Cancelled { .. } => "OrderCancelled",
        }
    }

    /// Status the order holds once this event has been applied.
    pub fn status_after(&self) -> OrderStatus {
        match self.kind {
            LifecycleEventKind::Placed { .. } => OrderStatus::Placed,
            LifecycleEventKind::StatusAdvanced { to, .. } => to,
            LifecycleEventKind::Cancelled { .. } => OrderStatus::Cancelled,
        }
    }
}
