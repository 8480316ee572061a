use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::client::session::Session;
use std::sync::Arc;
use uuid::Uuid;

use super::{CartError, CartService, OrderStore, StoreError, StoreOperation};
use crate::domain::order::{Order, OrderId, OrderItem, OrderStatus};

// ============================================================================
// ScyllaDB Order Store
// ============================================================================
//
// Orders live in one partition per owner, clustered by order id, mirroring
// the users/{ownerId}/orders/{orderId} document layout. Line items are kept
// as a JSON text column; status is stored by its wire name.
//
// ============================================================================

const ORDER_COLUMNS: &str =
    "order_id, owner_id, items, address, total_amount, placed_at, status";

type OrderRow = (Uuid, String, String, String, f64, DateTime<Utc>, String);

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Create the orders table if it does not exist yet.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        self.session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS orders_by_owner (
                    owner_id text,
                    order_id uuid,
                    items text,
                    address text,
                    total_amount double,
                    placed_at timestamp,
                    status text,
                    PRIMARY KEY (owner_id, order_id)
                )",
                (),
            )
            .await?;

        tracing::info!("orders_by_owner table ready");
        Ok(())
    }

    fn order_from_row(row: OrderRow) -> Result<Order, StoreError> {
        let (order_id, owner_id, items_json, address, total_amount, placed_at, status) = row;

        let corrupt = |reason: String| StoreError::Corrupt {
            order_id: order_id.to_string(),
            reason,
        };

        let items: Vec<OrderItem> =
            serde_json::from_str(&items_json).map_err(|e| corrupt(e.to_string()))?;
        let status: OrderStatus = status.parse().map_err(|e: crate::domain::order::OrderError| {
            corrupt(e.to_string())
        })?;

        Ok(Order {
            id: OrderId::from(order_id),
            owner_id,
            items,
            address,
            total_amount,
            placed_at,
            status,
        })
    }
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn get(&self, owner_id: &str, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let op = StoreOperation::Get;
        let result = self
            .session
            .query_unpaged(
                format!(
                    "SELECT {} FROM orders_by_owner WHERE owner_id = ? AND order_id = ?",
                    ORDER_COLUMNS
                ),
                (owner_id, order_id.as_uuid()),
            )
            .await
            .map_err(|e| StoreError::unavailable(op, e))?;

        let rows_result = match result.into_rows_result() {
            Ok(rows) => rows,
            Err(_) => return Ok(None), // No rows
        };

        let row = rows_result
            .maybe_first_row::<OrderRow>()
            .map_err(|e| StoreError::unavailable(op, e))?;

        row.map(Self::order_from_row).transpose()
    }

    async fn put(&self, owner_id: &str, order: &Order) -> Result<(), StoreError> {
        let op = StoreOperation::Put;
        let items_json =
            serde_json::to_string(&order.items).map_err(|e| StoreError::unavailable(op, e))?;

        self.session
            .query_unpaged(
                format!(
                    "INSERT INTO orders_by_owner ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                    ORDER_COLUMNS
                ),
                (
                    order.id.as_uuid(),
                    owner_id,
                    items_json,
                    order.address.as_str(),
                    order.total_amount,
                    order.placed_at,
                    order.status.as_str(),
                ),
            )
            .await
            .map_err(|e| StoreError::unavailable(op, e))?;

        tracing::debug!(order_id = %order.id, owner_id = %owner_id, "Persisted order");
        Ok(())
    }

    async fn update_status(
        &self,
        owner_id: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), StoreError> {
        // CQL UPDATE is an upsert; callers read the order before writing.
        self.session
            .query_unpaged(
                "UPDATE orders_by_owner SET status = ? WHERE owner_id = ? AND order_id = ?",
                (status.as_str(), owner_id, order_id.as_uuid()),
            )
            .await
            .map_err(|e| StoreError::unavailable(StoreOperation::UpdateStatus, e))?;

        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Order>, StoreError> {
        let op = StoreOperation::ListByOwner;
        let result = self
            .session
            .query_unpaged(
                format!(
                    "SELECT {} FROM orders_by_owner WHERE owner_id = ?",
                    ORDER_COLUMNS
                ),
                (owner_id,),
            )
            .await
            .map_err(|e| StoreError::unavailable(op, e))?;

        let mut orders = Vec::new();

        let rows_result = match result.into_rows_result() {
            Ok(rows) => rows,
            Err(_) => return Ok(orders), // No rows
        };

        for row in rows_result
            .rows::<OrderRow>()
            .map_err(|e| StoreError::unavailable(op, e))?
        {
            let row = row.map_err(|e| StoreError::unavailable(op, e))?;
            orders.push(Self::order_from_row(row)?);
        }

        orders.sort_by(|a, b| a.placed_at.cmp(&b.placed_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }
}

// ============================================================================
// ScyllaDB Cart Service
// ============================================================================

pub struct ScyllaCartService {
    session: Arc<Session>,
}

impl ScyllaCartService {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        self.session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS cart_items (
                    user_id text,
                    item_id text,
                    name text,
                    price double,
                    quantity int,
                    image text,
                    PRIMARY KEY (user_id, item_id)
                )",
                (),
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CartService for ScyllaCartService {
    async fn clear_cart(&self, owner_id: &str) -> Result<(), CartError> {
        self.session
            .query_unpaged("DELETE FROM cart_items WHERE user_id = ?", (owner_id,))
            .await
            .map_err(|e| CartError::Unavailable(e.to_string()))?;

        tracing::debug!(owner_id = %owner_id, "Cleared cart");
        Ok(())
    }
}
