//! Metric descriptors: name, help, kind, declared label names, and (for
//! histograms) bucket boundaries. Immutable once registered.

use crate::error::{MemoTrackError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Name used on the `# TYPE` line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<String>,
    buckets: Vec<f64>,
}

impl MetricDescriptor {
    pub fn counter(name: impl Into<String>, help: impl Into<String>, labels: &[&str]) -> Self {
        Self::new(name, help, MetricKind::Counter, labels, Vec::new())
    }

    pub fn gauge(name: impl Into<String>, help: impl Into<String>, labels: &[&str]) -> Self {
        Self::new(name, help, MetricKind::Gauge, labels, Vec::new())
    }

    /// Histogram with the given finite upper bounds. The `+Inf` bucket is implicit.
    pub fn histogram(
        name: impl Into<String>,
        help: impl Into<String>,
        labels: &[&str],
        buckets: &[f64],
    ) -> Self {
        Self::new(name, help, MetricKind::Histogram, labels, buckets.to_vec())
    }

    fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
        labels: &[&str],
        buckets: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            label_names: labels.iter().map(|l| l.to_string()).collect(),
            buckets,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Finite bucket upper bounds (histograms only; empty otherwise).
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !is_metric_name(&self.name) {
            return Err(invalid(format!("bad metric name {:?}", self.name)));
        }
        for (i, label) in self.label_names.iter().enumerate() {
            if !is_label_name(label) {
                return Err(invalid(format!("{}: bad label name {:?}", self.name, label)));
            }
            if self.label_names[..i].contains(label) {
                return Err(invalid(format!("{}: duplicate label {:?}", self.name, label)));
            }
            if self.kind == MetricKind::Histogram && label == "le" {
                return Err(invalid(format!("{}: label \"le\" is reserved", self.name)));
            }
        }

        match self.kind {
            MetricKind::Histogram => {
                if self.buckets.is_empty() {
                    return Err(invalid(format!("{}: histogram needs buckets", self.name)));
                }
                if self.buckets.iter().any(|b| !b.is_finite()) {
                    return Err(invalid(format!("{}: buckets must be finite", self.name)));
                }
                if self.buckets.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(invalid(format!(
                        "{}: buckets must be strictly ascending",
                        self.name
                    )));
                }
            }
            _ => {
                if !self.buckets.is_empty() {
                    return Err(invalid(format!("{}: only histograms take buckets", self.name)));
                }
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> MemoTrackError {
    MemoTrackError::InvalidDescriptor(msg)
}

// [a-zA-Z_:][a-zA-Z0-9_:]*
fn is_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

// [a-zA-Z_][a-zA-Z0-9_]*, `__` prefix reserved
fn is_label_name(s: &str) -> bool {
    if s.starts_with("__") {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_descriptors() {
        MetricDescriptor::counter("memo_ops_total", "ops", &["operation", "outcome"])
            .validate()
            .unwrap();
        MetricDescriptor::histogram("latency_seconds", "lat", &["route"], &[0.1, 1.0, 10.0])
            .validate()
            .unwrap();
        MetricDescriptor::gauge("ns:active", "active", &[]).validate().unwrap();
    }

    #[test]
    fn rejects_bad_names() {
        assert!(MetricDescriptor::counter("1abc", "h", &[]).validate().is_err());
        assert!(MetricDescriptor::counter("a-b", "h", &[]).validate().is_err());
        assert!(MetricDescriptor::counter("ok", "h", &["bad-label"]).validate().is_err());
        assert!(MetricDescriptor::counter("ok", "h", &["__reserved"]).validate().is_err());
        assert!(MetricDescriptor::counter("ok", "h", &["a", "a"]).validate().is_err());
    }

    #[test]
    fn rejects_bad_buckets() {
        let unsorted = MetricDescriptor::histogram("h", "h", &[], &[5.0, 1.0]);
        assert!(matches!(unsorted.validate(), Err(MemoTrackError::InvalidDescriptor(_))));

        let dup = MetricDescriptor::histogram("h", "h", &[], &[1.0, 1.0]);
        assert!(dup.validate().is_err());

        let inf = MetricDescriptor::histogram("h", "h", &[], &[1.0, f64::INFINITY]);
        assert!(inf.validate().is_err());

        assert!(MetricDescriptor::histogram("h", "h", &[], &[]).validate().is_err());
        assert!(MetricDescriptor::histogram("h", "h", &["le"], &[1.0]).validate().is_err());
    }
}
