//! Observability: the server metric set, request timing, and the periodic
//! active-memo refresher. Metric storage and exposition live in
//! `memotrack_core::metrics`.

pub mod interceptor;
pub mod metrics;
pub mod refresher;

pub use interceptor::{RequestTimer, UNMATCHED_ROUTE};
pub use metrics::ServiceMetrics;
pub use refresher::{RefreshOutcome, Refresher, RefresherState};
