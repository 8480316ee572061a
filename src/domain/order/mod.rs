// ============================================================================
// Order Domain - Business Logic for placed orders
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderId, OrderItem, OrderStatus)
// - Order record with its transition rules
// - Lifecycle events (Placed, StatusAdvanced, Cancelled)
// - Errors (OrderError enum)
//
// Scheduling, persistence and locking live in `crate::lifecycle`.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod errors;
pub mod aggregate;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use errors::*;
pub use aggregate::*;
