use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::OrderError;
use super::value_objects::{OrderId, OrderItem, OrderStatus};

// ============================================================================
// Order - Placed purchase with its mutable lifecycle status
// ============================================================================
//
// Everything except `status` is fixed at placement. Status moves forward along
// Placed -> Cooking -> Out for Delivery -> Delivered, or sideways to Cancelled
// from any non-terminal status. Delivered and Cancelled are terminal.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: OrderId,
    pub owner_id: String,

    // Placement snapshot
    pub items: Vec<OrderItem>,
    pub address: String,
    pub total_amount: f64,
    pub placed_at: DateTime<Utc>,

    // Lifecycle
    pub status: OrderStatus,
}

impl Order {
    /// Validate the placement request and build a fresh `Placed` order.
    pub fn place(
        owner_id: &str,
        items: Vec<OrderItem>,
        address: &str,
        total_amount: f64,
    ) -> Result<Self, OrderError> {
        if owner_id.trim().is_empty() {
            return Err(OrderError::EmptyOwner);
        }

        Self::validate_items(&items)?;

        if !total_amount.is_finite() || total_amount < 0.0 {
            return Err(OrderError::InvalidTotal(total_amount));
        }

        Ok(Self {
            id: OrderId::new(),
            owner_id: owner_id.to_string(),
            items,
            address: address.to_string(),
            total_amount,
            placed_at: Utc::now(),
            status: OrderStatus::Placed,
        })
    }

    fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyItems);
        }

        for item in items {
            if item.quantity <= 0 {
                return Err(OrderError::InvalidQuantity(item.quantity));
            }
        }

        Ok(())
    }

    /// Move forward to `target`, returning the status left behind.
    ///
    /// Terminal orders never move. Targets that are not strictly ahead of the
    /// current status on the delivery track are refused, so a stale timer can
    /// not drag an order backwards. Skipping ahead (e.g. Placed -> Delivered) is
    /// allowed; there is no check against the exact predecessor.
    pub fn advance_to(&mut self, target: OrderStatus) -> Result<OrderStatus, OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::TerminalStatus(self.status));
        }

        let target_step = target
            .tracking_step()
            .ok_or(OrderError::InvalidAdvanceTarget(target))?;
        let current_step = self.status.tracking_step().unwrap_or(0);

        if target_step <= current_step {
            return Err(OrderError::NotAhead {
                current: self.status,
                target,
            });
        }

        let previous = self.status;
        self.status = target;
        Ok(previous)
    }

    /// Flip to `Cancelled`, returning the status left behind.
    pub fn cancel(&mut self) -> Result<OrderStatus, OrderError> {
        match self.status {
            OrderStatus::Delivered => Err(OrderError::AlreadyDelivered),
            OrderStatus::Cancelled => Err(OrderError::AlreadyCancelled),
            previous => {
                self.status = OrderStatus::Cancelled;
                Ok(previous)
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// When the delivered transition is due, given the delay from placement.
    pub fn estimated_delivery_at(&self, delivered_after: Duration) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(delivered_after)
            .ok()
            .and_then(|delay| self.placed_at.checked_add_signed(delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items() -> Vec<OrderItem> {
        vec![OrderItem::new("f1", "Burger", 10.0, 2)]
    }

    fn placed() -> Order {
        Order::place("u1", sample_items(), "A St", 20.0).unwrap()
    }

    #[test]
    fn test_place_builds_placed_order() {
        let order = placed();

        assert_eq!(order.owner_id, "u1");
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.total_amount, 20.0);
        assert_eq!(order.item_count(), 2);
    }

    #[test]
    fn test_place_rejects_invalid_requests() {
        assert_eq!(
            Order::place("", sample_items(), "A St", 20.0).unwrap_err(),
            OrderError::EmptyOwner
        );
        assert_eq!(
            Order::place("u1", vec![], "A St", 20.0).unwrap_err(),
            OrderError::EmptyItems
        );
        assert_eq!(
            Order::place("u1", vec![OrderItem::new("f1", "Burger", 10.0, 0)], "A St", 0.0)
                .unwrap_err(),
            OrderError::InvalidQuantity(0)
        );
        assert_eq!(
            Order::place("u1", sample_items(), "A St", -1.0).unwrap_err(),
            OrderError::InvalidTotal(-1.0)
        );
        assert!(matches!(
            Order::place("u1", sample_items(), "A St", f64::NAN),
            Err(OrderError::InvalidTotal(_))
        ));
    }

    #[test]
    fn test_total_is_not_recomputed_from_items() {
        let order = Order::place("u1", sample_items(), "A St", 0.0).unwrap();
        assert_eq!(order.total_amount, 0.0);
    }

    #[test]
    fn test_advance_moves_forward() {
        let mut order = placed();

        assert_eq!(order.advance_to(OrderStatus::Cooking), Ok(OrderStatus::Placed));
        assert_eq!(
            order.advance_to(OrderStatus::OutForDelivery),
            Ok(OrderStatus::Cooking)
        );
        assert_eq!(
            order.advance_to(OrderStatus::Delivered),
            Ok(OrderStatus::OutForDelivery)
        );
        assert!(order.is_terminal());
    }

    #[test]
    fn test_advance_may_skip_ahead() {
        let mut order = placed();
        assert_eq!(order.advance_to(OrderStatus::Delivered), Ok(OrderStatus::Placed));
    }

    #[test]
    fn test_advance_never_regresses() {
        let mut order = placed();
        order.advance_to(OrderStatus::OutForDelivery).unwrap();

        assert_eq!(
            order.advance_to(OrderStatus::Cooking),
            Err(OrderError::NotAhead {
                current: OrderStatus::OutForDelivery,
                target: OrderStatus::Cooking,
            })
        );
        assert!(matches!(
            order.advance_to(OrderStatus::OutForDelivery),
            Err(OrderError::NotAhead { .. })
        ));
        assert_eq!(order.status, OrderStatus::OutForDelivery);
    }

    #[test]
    fn test_advance_rejects_cancelled_target() {
        let mut order = placed();
        assert_eq!(
            order.advance_to(OrderStatus::Cancelled),
            Err(OrderError::InvalidAdvanceTarget(OrderStatus::Cancelled))
        );
    }

    #[test]
    fn test_terminal_orders_do_not_advance() {
        let mut order = placed();
        order.cancel().unwrap();

        assert_eq!(
            order.advance_to(OrderStatus::Cooking),
            Err(OrderError::TerminalStatus(OrderStatus::Cancelled))
        );
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_cancel_rules() {
        let mut order = placed();
        order.advance_to(OrderStatus::Cooking).unwrap();

        assert_eq!(order.cancel(), Ok(OrderStatus::Cooking));
        assert_eq!(order.cancel(), Err(OrderError::AlreadyCancelled));

        let mut delivered = placed();
        delivered.advance_to(OrderStatus::Delivered).unwrap();
        assert_eq!(delivered.cancel(), Err(OrderError::AlreadyDelivered));
        assert_eq!(delivered.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_estimated_delivery() {
        let order = placed();
        let eta = order
            .estimated_delivery_at(Duration::from_secs(360))
            .unwrap();

        assert_eq!((eta - order.placed_at).num_seconds(), 360);
    }
}
