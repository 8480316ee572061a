// ============================================================================
// Order Lifecycle
// ============================================================================
//
// - config   - transition delays and advance policy
// - table    - scheduled transition table (pending timer handles per order)
// - locks    - per-order serialization
// - manager  - placement, scheduled advance, cancellation
//
// ============================================================================

mod config;
mod locks;
mod manager;
mod table;

pub use config::{
    ConfigError, LifecycleConfig, ENV_ADVANCE_MAX_ATTEMPTS, ENV_COOKING_DELAY,
    ENV_DELIVERED_DELAY, ENV_OUT_FOR_DELIVERY_DELAY, MAX_TRANSITION_DELAY,
};
pub use manager::{
    AdvanceOutcome, LifecycleError, OrderLifecycleManager, PlacedOrder, PlacementWarning,
    SkipReason,
};
pub use table::TransitionTable;
