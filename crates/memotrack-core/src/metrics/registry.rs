//! Process metric registry.
//!
//! One `Registry` is built at startup and shared (`Arc`) with everything that
//! records or scrapes. The family list is append-only and guarded by an
//! `RwLock` that is only written during registration; hot-path recording goes
//! through the typed handles and never touches it.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{MemoTrackError, Result};
use crate::metrics::descriptor::{MetricDescriptor, MetricKind};
use crate::metrics::exposition;
use crate::metrics::instruments::{Counter, Family, Gauge, Histogram, Sample};

/// Handle returned by [`Registry::register`].
#[derive(Clone)]
pub enum Metric {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
}

#[derive(Default)]
pub struct Registry {
    families: RwLock<Vec<Arc<Family>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Fails with `DuplicateName` if the name is taken
    /// (registry left untouched) or `InvalidDescriptor` if it does not validate.
    pub fn register(&self, desc: MetricDescriptor) -> Result<Metric> {
        desc.validate()?;

        let mut families = self.families.write().unwrap_or_else(PoisonError::into_inner);
        if families.iter().any(|f| f.descriptor().name() == desc.name()) {
            return Err(MemoTrackError::DuplicateName(desc.name().to_string()));
        }

        tracing::debug!(metric = %desc.name(), kind = desc.kind().as_str(), "metric registered");
        let kind = desc.kind();
        let family = Arc::new(Family::new(desc));
        families.push(Arc::clone(&family));

        Ok(match kind {
            MetricKind::Counter => Metric::Counter(Counter::new(family)),
            MetricKind::Gauge => Metric::Gauge(Gauge::new(family)),
            MetricKind::Histogram => Metric::Histogram(Histogram::new(family)),
        })
    }

    pub fn register_counter(&self, name: &str, help: &str, labels: &[&str]) -> Result<Counter> {
        match self.register(MetricDescriptor::counter(name, help, labels))? {
            Metric::Counter(c) => Ok(c),
            _ => Err(MemoTrackError::Internal(format!("{name}: expected counter"))),
        }
    }

    pub fn register_gauge(&self, name: &str, help: &str, labels: &[&str]) -> Result<Gauge> {
        match self.register(MetricDescriptor::gauge(name, help, labels))? {
            Metric::Gauge(g) => Ok(g),
            _ => Err(MemoTrackError::Internal(format!("{name}: expected gauge"))),
        }
    }

    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        buckets: &[f64],
    ) -> Result<Histogram> {
        match self.register(MetricDescriptor::histogram(name, help, labels, buckets))? {
            Metric::Histogram(h) => Ok(h),
            _ => Err(MemoTrackError::Internal(format!("{name}: expected histogram"))),
        }
    }

    /// Look up a registered descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<Arc<MetricDescriptor>> {
        self.families()
            .into_iter()
            .find(|f| f.descriptor().name() == name)
            .map(|f| Arc::clone(f.descriptor()))
    }

    pub fn len(&self) -> usize {
        self.families.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn families(&self) -> Vec<Arc<Family>> {
        self.families.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every series of every metric, by registration order then first-seen
    /// order. Each family is snapshotted only when iteration reaches it; call
    /// again to restart.
    pub fn collect_all(&self) -> impl Iterator<Item = Sample> {
        self.families().into_iter().flat_map(|f| f.samples())
    }

    /// Render all metrics in Prometheus text format. Metrics with no series yet
    /// still emit their `# HELP` / `# TYPE` header.
    pub fn render_exposition(&self) -> String {
        let mut out = String::new();
        for family in self.families() {
            exposition::write_header(&mut out, family.descriptor());
            for sample in family.samples() {
                exposition::write_sample(&mut out, &sample);
            }
        }
        out
    }
}
