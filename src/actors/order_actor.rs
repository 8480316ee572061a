use actix::prelude::*;

use crate::domain::order::{Order, OrderId, OrderItem};
use crate::lifecycle::{LifecycleError, OrderLifecycleManager, PlacedOrder};

// ============================================================================
// Actor Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "Result<PlacedOrder, LifecycleError>")]
pub struct PlaceOrder {
    pub owner_id: String,
    pub items: Vec<OrderItem>,
    pub address: String,
    pub total_amount: f64,
}

#[derive(Message)]
#[rtype(result = "Result<Order, LifecycleError>")]
pub struct CancelOrder {
    pub owner_id: String,
    pub order_id: OrderId,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<Order>, LifecycleError>")]
pub struct GetOrdersByOwner {
    pub owner_id: String,
}

#[derive(Message)]
#[rtype(result = "Result<Order, LifecycleError>")]
pub struct GetOrder {
    pub owner_id: String,
    pub order_id: OrderId,
}

// ============================================================================
// Order Lifecycle Actor - request-facing entry point to the lifecycle manager
// ============================================================================
//
// The actor owns no order state. Each message is forwarded to the shared
// manager, so requests for different orders proceed concurrently and
// per-order ordering is enforced by the manager's locks.
//
// ============================================================================

pub struct OrderLifecycleActor {
    manager: OrderLifecycleManager,
}

impl OrderLifecycleActor {
    pub fn new(manager: OrderLifecycleManager) -> Self {
        Self { manager }
    }
}

impl Actor for OrderLifecycleActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("OrderLifecycleActor started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("OrderLifecycleActor stopped");
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<PlaceOrder> for OrderLifecycleActor {
    type Result = ResponseFuture<Result<PlacedOrder, LifecycleError>>;

    fn handle(&mut self, msg: PlaceOrder, _: &mut Self::Context) -> Self::Result {
        let manager = self.manager.clone();

        Box::pin(async move {
            manager
                .place_order(&msg.owner_id, msg.items, &msg.address, msg.total_amount)
                .await
        })
    }
}

impl Handler<CancelOrder> for OrderLifecycleActor {
    type Result = ResponseFuture<Result<Order, LifecycleError>>;

    fn handle(&mut self, msg: CancelOrder, _: &mut Self::Context) -> Self::Result {
        let manager = self.manager.clone();

        Box::pin(async move { manager.cancel_order(&msg.owner_id, msg.order_id).await })
    }
}

impl Handler<GetOrdersByOwner> for OrderLifecycleActor {
    type Result = ResponseFuture<Result<Vec<Order>, LifecycleError>>;

    fn handle(&mut self, msg: GetOrdersByOwner, _: &mut Self::Context) -> Self::Result {
        let manager = self.manager.clone();

        Box::pin(async move { manager.get_orders_by_owner(&msg.owner_id).await })
    }
}

impl Handler<GetOrder> for OrderLifecycleActor {
    type Result = ResponseFuture<Result<Order, LifecycleError>>;

    fn handle(&mut self, msg: GetOrder, _: &mut Self::Context) -> Self::Result {
        let manager = self.manager.clone();

        Box::pin(async move { manager.get_order(&msg.owner_id, msg.order_id).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::lifecycle::LifecycleConfig;
    use crate::store::{InMemoryCartService, InMemoryOrderStore};
    use std::sync::Arc;

    fn start_actor() -> Addr<OrderLifecycleActor> {
        let manager = OrderLifecycleManager::new(
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(InMemoryCartService::new()),
            LifecycleConfig::default(),
            None,
        );
        OrderLifecycleActor::new(manager).start()
    }

    #[actix::test]
    async fn test_place_list_and_cancel_through_messages() {
        let actor = start_actor();

        let placed = actor
            .send(PlaceOrder {
                owner_id: "u1".to_string(),
                items: vec![OrderItem::new("f1", "Ramen", 12.5, 1)],
                address: "A St".to_string(),
                total_amount: 12.5,
            })
            .await
            .unwrap()
            .unwrap();

        let orders = actor
            .send(GetOrdersByOwner {
                owner_id: "u1".to_string(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Placed);

        let cancelled = actor
            .send(CancelOrder {
                owner_id: "u1".to_string(),
                order_id: placed.order_id(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let again = actor
            .send(CancelOrder {
                owner_id: "u1".to_string(),
                order_id: placed.order_id(),
            })
            .await
            .unwrap();
        assert!(matches!(again, Err(LifecycleError::AlreadyCancelled(_))));
    }

    #[actix::test]
    async fn test_get_unknown_order() {
        let actor = start_actor();

        let result = actor
            .send(GetOrder {
                owner_id: "u1".to_string(),
                order_id: OrderId::new(),
            })
            .await
            .unwrap();

        assert!(matches!(result, Err(LifecycleError::NotFound(_))));
    }
}
