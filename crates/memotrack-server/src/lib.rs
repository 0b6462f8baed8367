//! memotrack server library entry.
//!
//! Wires config, the memo store, the metric set, request timing, and the
//! active-memo refresher into an axum application. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod memo;
pub mod obs;
pub mod ops;
pub mod router;
