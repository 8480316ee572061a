use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::config::LifecycleConfig;
use super::locks::OrderLocks;
use super::table::TransitionTable;
use crate::domain::order::{
    LifecycleEvent, LifecycleEventKind, Order, OrderError, OrderId, OrderItem, OrderStatus,
};
use crate::metrics::Metrics;
use crate::store::{CartService, OrderStore, StoreError, StoreOperation};
use crate::utils::{retry_on_transient, RetryResult};

// ============================================================================
// Order Lifecycle Manager
// ============================================================================
//
// Orchestrates: PlaceOrder -> scheduled AdvanceStatus x3 -> Delivered
//                          \-> CancelOrder -> Cancelled
//
// Every status read-modify-write for one order runs under that order's lock.
// A scheduled advance re-reads the order and does nothing once it is terminal,
// which is what makes cancellation safe against timers that were already
// firing when their handles were aborted.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Order {0} not found")]
    NotFound(OrderId),

    #[error("Order {0} already delivered and cannot be cancelled")]
    AlreadyDelivered(OrderId),

    #[error("Order {0} already cancelled")]
    AlreadyCancelled(OrderId),

    #[error("Order store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    #[error("Order lifecycle manager is shutting down")]
    ShuttingDown,
}

/// Non-fatal problems reported alongside a successful placement.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementWarning {
    CartClearFailed(String),
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub warnings: Vec<PlacementWarning>,
}

impl PlacedOrder {
    pub fn order_id(&self) -> OrderId {
        self.order.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The order does not exist for this owner.
    Missing,
    /// The order is already Delivered or Cancelled.
    Terminal(OrderStatus),
    /// The order is already at or beyond the target.
    NotAhead(OrderStatus),
    /// The target is not on the delivery track.
    InvalidTarget,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Missing => "missing",
            SkipReason::Terminal(_) => "terminal",
            SkipReason::NotAhead(_) => "not_ahead",
            SkipReason::InvalidTarget => "invalid_target",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Applied { from: OrderStatus, to: OrderStatus },
    Skipped(SkipReason),
}

struct Inner {
    store: Arc<dyn OrderStore>,
    cart: Arc<dyn CartService>,
    table: Arc<TransitionTable>,
    locks: OrderLocks,
    config: LifecycleConfig,
    metrics: Option<Arc<Metrics>>,
    events: broadcast::Sender<LifecycleEvent>,
    shutting_down: AtomicBool,
}

/// Cheap to clone; all clones share one transition table and lock registry.
#[derive(Clone)]
pub struct OrderLifecycleManager {
    inner: Arc<Inner>,
}

impl OrderLifecycleManager {
    pub fn new(
        store: Arc<dyn OrderStore>,
        cart: Arc<dyn CartService>,
        config: LifecycleConfig,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let table = TransitionTable::new(metrics.as_ref().map(|m| m.pending_timers.clone()));

        Self {
            inner: Arc::new(Inner {
                store,
                cart,
                table: Arc::new(table),
                locks: OrderLocks::default(),
                config,
                metrics,
                events,
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    /// Receive every lifecycle event committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.events.subscribe()
    }

    /// Persist a new order, schedule its Cooking / Out for Delivery /
    /// Delivered transitions and clear the owner's cart.
    pub async fn place_order(
        &self,
        owner_id: &str,
        items: Vec<OrderItem>,
        address: &str,
        total_amount: f64,
    ) -> Result<PlacedOrder, LifecycleError> {
        if self.is_shutting_down() {
            return Err(LifecycleError::ShuttingDown);
        }

        let order = Order::place(owner_id, items, address, total_amount)?;
        let origin = Instant::now();

        tracing::info!(
            order_id = %order.id,
            owner_id = %owner_id,
            item_count = order.items.len(),
            total_amount = order.total_amount,
            "Placing order"
        );

        // A cancel arriving right after the write must find the timers registered.
        let guard = self.inner.locks.acquire(order.id).await;

        if let Err(e) = self.inner.store.put(owner_id, &order).await {
            self.record_store_failure(StoreOperation::Put, &e);
            return Err(LifecycleError::StoreUnavailable(e));
        }

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_placed();
        }

        self.schedule_transitions(&order, origin).await;

        self.publish(LifecycleEvent::new(
            &order,
            LifecycleEventKind::Placed {
                total_amount: order.total_amount,
                item_count: order.item_count(),
            },
        ));
        drop(guard);

        let mut warnings = Vec::new();
        if let Err(e) = self.inner.cart.clear_cart(owner_id).await {
            tracing::warn!(
                order_id = %order.id,
                owner_id = %owner_id,
                error = %e,
                "Order placed but cart could not be cleared"
            );
            if let Some(metrics) = &self.inner.metrics {
                metrics.record_cart_clear_failure();
            }
            warnings.push(PlacementWarning::CartClearFailed(e.to_string()));
        }

        tracing::info!(order_id = %order.id, owner_id = %owner_id, "✅ Order placed");

        Ok(PlacedOrder { order, warnings })
    }

    async fn schedule_transitions(&self, order: &Order, origin: Instant) {
        let manager = self.clone();
        let owner_id = order.owner_id.clone();
        let order_id = order.id;

        self.inner
            .table
            .schedule(order_id, origin, &self.inner.config.schedule(), move |target| {
                let manager = manager.clone();
                let owner_id = owner_id.clone();
                async move {
                    manager.run_scheduled_advance(&owner_id, order_id, target).await;
                }
            })
            .await;

        // Lost a race with shutdown: nothing may fire after it returned.
        if self.is_shutting_down() {
            self.inner.table.cancel(order_id).await;
        }
    }

    /// Body of a fired timer. Failures are logged and the slot is consumed.
    async fn run_scheduled_advance(&self, owner_id: &str, order_id: OrderId, target: OrderStatus) {
        let retry = self.inner.config.advance_retry.clone();

        let result =
            retry_on_transient(retry, move |_attempt| {
                self.advance_status(owner_id, order_id, target)
            })
            .await;

        match result {
            RetryResult::Success(_) => {}
            RetryResult::Failed(e) | RetryResult::PermanentFailure(e) => {
                tracing::error!(
                    order_id = %order_id,
                    owner_id = %owner_id,
                    target = %target,
                    error = %e,
                    "Scheduled status advance failed, not rescheduling"
                );
            }
        }
    }

    /// Move a non-terminal order forward to `target`.
    ///
    /// Only timers call this. Missing, terminal and already-passed orders are
    /// left untouched.
    pub(crate) async fn advance_status(
        &self,
        owner_id: &str,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<AdvanceOutcome, StoreError> {
        let _guard = self.inner.locks.acquire(order_id).await;

        let mut order = match self.inner.store.get(owner_id, order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return Ok(self.skip(order_id, target, SkipReason::Missing)),
            Err(e) => {
                self.record_store_failure(StoreOperation::Get, &e);
                return Err(e);
            }
        };

        let from = match order.advance_to(target) {
            Ok(from) => from,
            Err(OrderError::TerminalStatus(status)) => {
                return Ok(self.skip(order_id, target, SkipReason::Terminal(status)))
            }
            Err(OrderError::NotAhead { current, .. }) => {
                return Ok(self.skip(order_id, target, SkipReason::NotAhead(current)))
            }
            Err(_) => return Ok(self.skip(order_id, target, SkipReason::InvalidTarget)),
        };

        if let Err(e) = self
            .inner
            .store
            .update_status(owner_id, order_id, target)
            .await
        {
            self.record_store_failure(StoreOperation::UpdateStatus, &e);
            return Err(e);
        }

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_transition(target.as_str());
        }

        tracing::info!(
            order_id = %order_id,
            owner_id = %owner_id,
            from = %from,
            to = %target,
            "Order status advanced"
        );

        self.publish(LifecycleEvent::new(
            &order,
            LifecycleEventKind::StatusAdvanced { from, to: target },
        ));

        Ok(AdvanceOutcome::Applied { from, to: target })
    }

    fn skip(&self, order_id: OrderId, target: OrderStatus, reason: SkipReason) -> AdvanceOutcome {
        tracing::info!(
            order_id = %order_id,
            target = %target,
            reason = reason.as_str(),
            "Skipping scheduled status advance"
        );

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_skipped(reason.as_str());
        }

        AdvanceOutcome::Skipped(reason)
    }

    /// Stop the order's pending timers and mark it `Cancelled`.
    ///
    /// Ownership is implied by the `(owner_id, order_id)` address: another
    /// owner's order is reported as not found.
    pub async fn cancel_order(
        &self,
        owner_id: &str,
        order_id: OrderId,
    ) -> Result<Order, LifecycleError> {
        let _guard = self.inner.locks.acquire(order_id).await;

        let mut order = match self.inner.store.get(owner_id, order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return Err(LifecycleError::NotFound(order_id)),
            Err(e) => {
                self.record_store_failure(StoreOperation::Get, &e);
                return Err(LifecycleError::StoreUnavailable(e));
            }
        };

        let from = order.cancel().map_err(|e| match e {
            OrderError::AlreadyDelivered => LifecycleError::AlreadyDelivered(order_id),
            OrderError::AlreadyCancelled => LifecycleError::AlreadyCancelled(order_id),
            other => LifecycleError::InvalidOrder(other),
        })?;

        let aborted = self.inner.table.cancel(order_id).await;
        tracing::debug!(order_id = %order_id, aborted, "Aborted pending status timers");

        if let Err(e) = self
            .inner
            .store
            .update_status(owner_id, order_id, OrderStatus::Cancelled)
            .await
        {
            self.record_store_failure(StoreOperation::UpdateStatus, &e);
            return Err(match e {
                StoreError::NotFound { .. } => LifecycleError::NotFound(order_id),
                e => LifecycleError::StoreUnavailable(e),
            });
        }

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_cancelled(from.as_str());
        }

        tracing::info!(
            order_id = %order_id,
            owner_id = %owner_id,
            from = %from,
            "🚫 Order cancelled"
        );

        self.publish(LifecycleEvent::new(
            &order,
            LifecycleEventKind::Cancelled { from },
        ));

        Ok(order)
    }

    pub async fn get_orders_by_owner(&self, owner_id: &str) -> Result<Vec<Order>, LifecycleError> {
        self.inner.store.list_by_owner(owner_id).await.map_err(|e| {
            self.record_store_failure(StoreOperation::ListByOwner, &e);
            LifecycleError::StoreUnavailable(e)
        })
    }

    pub async fn get_order(&self, owner_id: &str, order_id: OrderId) -> Result<Order, LifecycleError> {
        match self.inner.store.get(owner_id, order_id).await {
            Ok(Some(order)) => Ok(order),
            Ok(None) => Err(LifecycleError::NotFound(order_id)),
            Err(e) => {
                self.record_store_failure(StoreOperation::Get, &e);
                Err(LifecycleError::StoreUnavailable(e))
            }
        }
    }

    /// Number of timers still pending for the order.
    pub async fn pending_transitions(&self, order_id: OrderId) -> usize {
        self.inner.table.pending(order_id).await
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Refuse new placements and abandon every pending timer.
    /// Persisted orders keep whatever status they last committed.
    pub async fn shutdown(&self) -> usize {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        let aborted = self.inner.table.cancel_all().await;

        tracing::info!(aborted, "Order lifecycle manager shut down");
        aborted
    }

    fn publish(&self, event: LifecycleEvent) {
        // No subscribers is not an error.
        let _ = self.inner.events.send(event);
    }

    fn record_store_failure(&self, operation: StoreOperation, error: &StoreError) {
        tracing::error!(operation = operation.as_str(), error = %error, "Order store call failed");

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_store_failure(operation.as_str());
        }
    }
}
