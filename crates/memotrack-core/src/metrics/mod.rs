//! In-process metrics: registry, instruments, and text exposition.
//!
//! Labels are validated against each descriptor's declared names, so a typo
//! fails loudly instead of minting a new series. Series live for the process
//! lifetime; keep label values low-cardinality.

pub mod descriptor;
pub mod exposition;
pub mod instruments;
pub mod registry;

pub use descriptor::{MetricDescriptor, MetricKind};
pub use exposition::CONTENT_TYPE;
pub use instruments::{Counter, Gauge, Histogram, HistogramSnapshot, Sample, SampleValue};
pub use registry::{Metric, Registry};
