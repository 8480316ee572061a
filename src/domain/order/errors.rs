use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order owner cannot be empty")]
    EmptyOwner,

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Invalid total amount: {0}")]
    InvalidTotal(f64),

    #[error("Order already delivered and cannot be cancelled")]
    AlreadyDelivered,

    #[error("Order is already cancelled")]
    AlreadyCancelled,

    #[error("Order is in terminal status: {0}")]
    TerminalStatus(OrderStatus),

    #[error("Status {target} is not ahead of current status {current}")]
    NotAhead {
        current: OrderStatus,
        target: OrderStatus,
    },

    #[error("Status {0} cannot be reached by a scheduled advance")]
    InvalidAdvanceTarget(OrderStatus),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
