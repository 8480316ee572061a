//! Order lifecycle backend for a food-delivery service.
//!
//! Placed orders advance Placed -> Cooking -> Out for Delivery -> Delivered on
//! timers and can be cancelled until they reach a terminal status.

pub mod actors;
pub mod config;
pub mod domain;
pub mod lifecycle;
pub mod metrics;
pub mod store;
pub mod utils;
