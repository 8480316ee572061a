// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure domain types and rules. No I/O, no timers, no locks: the lifecycle
// manager drives these types and the store persists them.
//
// ============================================================================

pub mod order;
