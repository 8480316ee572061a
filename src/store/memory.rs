use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{CartError, CartService, OrderStore, StoreError, StoreOperation};
use crate::domain::order::{Order, OrderId, OrderItem, OrderStatus};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Process-local implementation of the store collaborators. Used by the
// binary's `memory` backend and by tests, which can make the next N calls of
// any operation fail with `StoreError::Unavailable`.
//
// ============================================================================

#[derive(Default)]
struct FailurePlan {
    get: AtomicU32,
    put: AtomicU32,
    update_status: AtomicU32,
    list_by_owner: AtomicU32,
}

impl FailurePlan {
    fn counter(&self, operation: StoreOperation) -> &AtomicU32 {
        match operation {
            StoreOperation::Get => &self.get,
            StoreOperation::Put => &self.put,
            StoreOperation::UpdateStatus => &self.update_status,
            StoreOperation::ListByOwner => &self.list_by_owner,
        }
    }

    /// Consume one planned failure, if any is left.
    fn take(&self, operation: StoreOperation) -> bool {
        self.counter(operation)
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, HashMap<OrderId, Order>>>,
    failures: FailurePlan,
    status_writes: AtomicUsize,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls of `operation` fail.
    pub fn fail_next(&self, operation: StoreOperation, count: u32) {
        self.failures.counter(operation).store(count, Ordering::SeqCst);
    }

    /// Number of committed status updates.
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    fn check(&self, operation: StoreOperation) -> Result<(), StoreError> {
        if self.failures.take(operation) {
            tracing::debug!(operation = operation.as_str(), "Injected store failure");
            return Err(StoreError::unavailable(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, owner_id: &str, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        self.check(StoreOperation::Get)?;

        let orders = self.orders.read().await;
        Ok(orders
            .get(owner_id)
            .and_then(|owned| owned.get(&order_id))
            .cloned())
    }

    async fn put(&self, owner_id: &str, order: &Order) -> Result<(), StoreError> {
        self.check(StoreOperation::Put)?;

        let mut orders = self.orders.write().await;
        orders
            .entry(owner_id.to_string())
            .or_default()
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        owner_id: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), StoreError> {
        self.check(StoreOperation::UpdateStatus)?;

        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(owner_id)
            .and_then(|owned| owned.get_mut(&order_id))
            .ok_or_else(|| StoreError::NotFound {
                owner_id: owner_id.to_string(),
                order_id,
            })?;

        order.status = status;
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Order>, StoreError> {
        self.check(StoreOperation::ListByOwner)?;

        let orders = self.orders.read().await;
        let mut owned: Vec<Order> = orders
            .get(owner_id)
            .map(|owned| owned.values().cloned().collect())
            .unwrap_or_default();
        owned.sort_by(|a, b| a.placed_at.cmp(&b.placed_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }
}

#[derive(Default)]
pub struct InMemoryCartService {
    carts: RwLock<HashMap<String, Vec<OrderItem>>>,
    failures: AtomicU32,
    clear_calls: AtomicUsize,
}

impl InMemoryCartService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_item(&self, owner_id: &str, item: OrderItem) {
        self.carts
            .write()
            .await
            .entry(owner_id.to_string())
            .or_default()
            .push(item);
    }

    pub async fn items(&self, owner_id: &str) -> Vec<OrderItem> {
        self.carts
            .read()
            .await
            .get(owner_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the next `count` clears fail.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn clear_cart(&self, owner_id: &str) -> Result<(), CartError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CartError::Unavailable("injected failure".to_string()));
        }

        self.carts.write().await.remove(owner_id);
        Ok(())
    }
}
