// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based entry point for request handlers. The lifecycle state machine
// itself lives in `crate::lifecycle`; the actor only forwards typed messages.
//
// ============================================================================

mod order_actor;

pub use order_actor::{
    CancelOrder, GetOrder, GetOrdersByOwner, OrderLifecycleActor, PlaceOrder,
};
