//! Top-level facade crate for memotrack.
//!
//! Re-exports the core metrics/error types and the server library so users can depend on a single crate.

pub mod core {
    pub use memotrack_core::*;
}

pub mod server {
    pub use memotrack_server::*;
}
