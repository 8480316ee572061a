use async_trait::async_trait;

use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::utils::IsTransient;

// ============================================================================
// Store Collaborators
// ============================================================================
//
// The lifecycle manager only talks to persistence through these two narrow
// traits. Orders are addressed by (owner_id, order_id).
//
// - memory        - in-process implementation with failure injection
// - scylla_store  - ScyllaDB-backed implementation
//
// ============================================================================

mod memory;
mod scylla_store;

pub use memory::{InMemoryCartService, InMemoryOrderStore};
pub use scylla_store::{ScyllaCartService, ScyllaOrderStore};

/// Store operations, used for failure injection and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Get,
    Put,
    UpdateStatus,
    ListByOwner,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::Get => "get",
            StoreOperation::Put => "put",
            StoreOperation::UpdateStatus => "update_status",
            StoreOperation::ListByOwner => "list_by_owner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Order {order_id} not found for owner {owner_id}")]
    NotFound { owner_id: String, order_id: OrderId },

    #[error("Order store unavailable during {operation}: {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },

    #[error("Corrupt order record {order_id}: {reason}")]
    Corrupt { order_id: String, reason: String },
}

impl StoreError {
    pub fn unavailable(operation: StoreOperation, reason: impl ToString) -> Self {
        StoreError::Unavailable {
            operation: operation.as_str(),
            reason: reason.to_string(),
        }
    }
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

/// Durable order records, addressed by owner and order id.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, owner_id: &str, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Full upsert, used at placement.
    async fn put(&self, owner_id: &str, order: &Order) -> Result<(), StoreError>;

    /// Partial update of the status field only.
    async fn update_status(
        &self,
        owner_id: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), StoreError>;

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Order>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("Cart service unavailable: {0}")]
    Unavailable(String),
}

/// The owner's active cart. Cleared once after a successful placement.
#[async_trait]
pub trait CartService: Send + Sync {
    async fn clear_cart(&self, owner_id: &str) -> Result<(), CartError>;
}
