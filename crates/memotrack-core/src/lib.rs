//! memotrack core: runtime-free metrics primitives and the shared error type.
//!
//! This crate defines the metric registry, instruments, and exposition format
//! used by the server, plus the error surface shared by every crate. It carries
//! no transport or runtime dependencies so it can be reused in tests and tools.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `MemoTrackError`/`Result` so recording a metric never crashes
//! the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{MemoTrackError, Result};
