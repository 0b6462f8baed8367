//! Counter / Gauge / Histogram instruments with validated label sets.
//!
//! Each metric is a `Family`: one descriptor plus a `DashMap` of series keyed by
//! label values in declared-label order. Series are created lazily on first
//! use and never evicted. Counters and gauges are single atomics holding `f64`
//! bits; a histogram series sits behind its own small mutex so that buckets,
//! sum and count always move together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::error::{MemoTrackError, Result};
use crate::metrics::descriptor::{MetricDescriptor, MetricKind};

/// Point-in-time view of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper_bound, cumulative_count)`; the last entry is `+Inf`.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Counter(f64),
    Gauge(f64),
    Histogram(HistogramSnapshot),
}

/// One (descriptor, label set, value) triple produced by a collection pass.
#[derive(Debug, Clone)]
pub struct Sample {
    pub descriptor: Arc<MetricDescriptor>,
    /// `(label_name, label_value)` in declared order.
    pub labels: Vec<(String, String)>,
    pub value: SampleValue,
}

struct HistogramState {
    // cumulative per finite bound; +Inf is `count`
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

enum Cell {
    Scalar(AtomicU64),
    Histogram(Mutex<HistogramState>),
}

struct Series {
    first_seen: u64,
    cell: Cell,
}

pub(crate) struct Family {
    desc: Arc<MetricDescriptor>,
    series: DashMap<Vec<String>, Arc<Series>>,
    seq: AtomicU64,
}

impl Family {
    pub(crate) fn new(desc: MetricDescriptor) -> Self {
        Self {
            desc: Arc::new(desc),
            series: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.desc
    }

    /// Order label values by the declared names, rejecting anything that is
    /// not exactly the declared set.
    fn key(&self, labels: &[(&str, &str)]) -> Result<Vec<String>> {
        let names = self.desc.label_names();
        let mut key = Vec::with_capacity(names.len());
        if labels.len() == names.len() {
            for name in names {
                match labels.iter().find(|(k, _)| *k == name.as_str()) {
                    Some((_, v)) => key.push(v.to_string()),
                    None => break,
                }
            }
        }
        if key.len() != names.len() || labels.len() != names.len() {
            return Err(MemoTrackError::LabelMismatch {
                metric: self.desc.name().to_string(),
                expected: names.to_vec(),
                got: labels.iter().map(|(k, _)| k.to_string()).collect(),
            });
        }
        Ok(key)
    }

    fn series(&self, labels: &[(&str, &str)]) -> Result<Arc<Series>> {
        let key = self.key(labels)?;
        if let Some(existing) = self.series.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }
        let entry = self.series.entry(key).or_insert_with(|| {
            Arc::new(Series {
                first_seen: self.seq.fetch_add(1, Ordering::Relaxed),
                cell: self.new_cell(),
            })
        });
        Ok(Arc::clone(entry.value()))
    }

    fn lookup(&self, labels: &[(&str, &str)]) -> Result<Option<Arc<Series>>> {
        let key = self.key(labels)?;
        Ok(self.series.get(&key).map(|s| Arc::clone(s.value())))
    }

    fn new_cell(&self) -> Cell {
        match self.desc.kind() {
            MetricKind::Counter | MetricKind::Gauge => Cell::Scalar(AtomicU64::new(0f64.to_bits())),
            MetricKind::Histogram => Cell::Histogram(Mutex::new(HistogramState {
                buckets: vec![0; self.desc.buckets().len()],
                sum: 0.0,
                count: 0,
            })),
        }
    }

    /// Snapshot every series, ordered by first-seen.
    pub(crate) fn samples(&self) -> Vec<Sample> {
        let mut rows: Vec<(u64, Vec<String>, Arc<Series>)> = self
            .series
            .iter()
            .map(|r| (r.value().first_seen, r.key().clone(), Arc::clone(r.value())))
            .collect();
        rows.sort_by_key(|(seq, _, _)| *seq);

        rows.into_iter()
            .map(|(_, values, series)| Sample {
                descriptor: Arc::clone(&self.desc),
                labels: self
                    .desc
                    .label_names()
                    .iter()
                    .cloned()
                    .zip(values)
                    .collect(),
                value: self.read(&series),
            })
            .collect()
    }

    fn read(&self, series: &Series) -> SampleValue {
        match (&series.cell, self.desc.kind()) {
            (Cell::Scalar(bits), MetricKind::Counter) => {
                SampleValue::Counter(f64::from_bits(bits.load(Ordering::Acquire)))
            }
            (Cell::Scalar(bits), _) => SampleValue::Gauge(f64::from_bits(bits.load(Ordering::Acquire))),
            (Cell::Histogram(state), _) => SampleValue::Histogram(self.histogram_snapshot(state)),
        }
    }

    fn histogram_snapshot(&self, state: &Mutex<HistogramState>) -> HistogramSnapshot {
        let st = state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut buckets: Vec<(f64, u64)> = self
            .desc
            .buckets()
            .iter()
            .copied()
            .zip(st.buckets.iter().copied())
            .collect();
        buckets.push((f64::INFINITY, st.count));
        HistogramSnapshot {
            buckets,
            sum: st.sum,
            count: st.count,
        }
    }
}

fn scalar(series: &Series) -> Result<&AtomicU64> {
    match &series.cell {
        Cell::Scalar(bits) => Ok(bits),
        Cell::Histogram(_) => Err(MemoTrackError::Internal("scalar op on histogram series".into())),
    }
}

// CAS loop so concurrent adds on the same series never lose an update.
fn atomic_add(bits: &AtomicU64, delta: f64) {
    let mut cur = bits.load(Ordering::Relaxed);
    loop {
        let next = (f64::from_bits(cur) + delta).to_bits();
        match bits.compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => cur = actual,
        }
    }
}

/// Monotonically non-decreasing counter.
#[derive(Clone)]
pub struct Counter {
    family: Arc<Family>,
}

impl Counter {
    pub(crate) fn new(family: Arc<Family>) -> Self {
        Self { family }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        self.family.descriptor()
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) -> Result<()> {
        self.increment(labels, 1.0)
    }

    /// Increment by `delta`. Negative (or NaN) deltas are rejected and leave the
    /// series untouched.
    pub fn increment(&self, labels: &[(&str, &str)], delta: f64) -> Result<()> {
        if delta.is_nan() || delta < 0.0 {
            return Err(MemoTrackError::NegativeDelta(delta));
        }
        let series = self.family.series(labels)?;
        atomic_add(scalar(&series)?, delta);
        Ok(())
    }

    /// Current value, or `None` if the series was never touched.
    pub fn get(&self, labels: &[(&str, &str)]) -> Result<Option<f64>> {
        match self.family.lookup(labels)? {
            Some(series) => Ok(Some(f64::from_bits(scalar(&series)?.load(Ordering::Acquire)))),
            None => Ok(None),
        }
    }
}

/// Arbitrary real value; last writer wins.
#[derive(Clone)]
pub struct Gauge {
    family: Arc<Family>,
}

impl Gauge {
    pub(crate) fn new(family: Arc<Family>) -> Self {
        Self { family }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        self.family.descriptor()
    }

    pub fn set(&self, labels: &[(&str, &str)], value: f64) -> Result<()> {
        let series = self.family.series(labels)?;
        scalar(&series)?.store(value.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Add a signed delta.
    pub fn add(&self, labels: &[(&str, &str)], delta: f64) -> Result<()> {
        let series = self.family.series(labels)?;
        atomic_add(scalar(&series)?, delta);
        Ok(())
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Result<Option<f64>> {
        match self.family.lookup(labels)? {
            Some(series) => Ok(Some(f64::from_bits(scalar(&series)?.load(Ordering::Acquire)))),
            None => Ok(None),
        }
    }
}

/// Fixed-bucket histogram.
#[derive(Clone)]
pub struct Histogram {
    family: Arc<Family>,
}

impl Histogram {
    pub(crate) fn new(family: Arc<Family>) -> Self {
        Self { family }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        self.family.descriptor()
    }

    /// Record one observation: bumps every bucket whose bound is `>= value`,
    /// the count, and the sum, under the series lock.
    pub fn observe(&self, labels: &[(&str, &str)], value: f64) -> Result<()> {
        let series = self.family.series(labels)?;
        let Cell::Histogram(state) = &series.cell else {
            return Err(MemoTrackError::Internal("observe on scalar series".into()));
        };
        let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
        for (slot, bound) in st.buckets.iter_mut().zip(self.family.descriptor().buckets()) {
            if value <= *bound {
                *slot += 1;
            }
        }
        st.count += 1;
        st.sum += value;
        Ok(())
    }

    pub fn snapshot(&self, labels: &[(&str, &str)]) -> Result<Option<HistogramSnapshot>> {
        let Some(series) = self.family.lookup(labels)? else {
            return Ok(None);
        };
        match &series.cell {
            Cell::Histogram(state) => Ok(Some(self.family.histogram_snapshot(state))),
            Cell::Scalar(_) => Err(MemoTrackError::Internal("snapshot on scalar series".into())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn counter() -> Counter {
        Counter::new(Arc::new(Family::new(MetricDescriptor::counter(
            "ops_total",
            "ops",
            &["operation", "outcome"],
        ))))
    }

    #[test]
    fn label_order_does_not_create_new_series() {
        let c = counter();
        c.inc(&[("operation", "create"), ("outcome", "success")]).unwrap();
        c.inc(&[("outcome", "success"), ("operation", "create")]).unwrap();

        let v = c.get(&[("operation", "create"), ("outcome", "success")]).unwrap();
        assert_eq!(v, Some(2.0));
        assert_eq!(c.family.samples().len(), 1);
    }

    #[test]
    fn mismatched_labels_rejected() {
        let c = counter();
        let missing = c.inc(&[("operation", "create")]);
        assert!(matches!(missing, Err(MemoTrackError::LabelMismatch { .. })));

        let extra = c.inc(&[("operation", "a"), ("outcome", "b"), ("x", "y")]);
        assert!(matches!(extra, Err(MemoTrackError::LabelMismatch { .. })));

        let dup = c.inc(&[("operation", "a"), ("operation", "b")]);
        assert!(matches!(dup, Err(MemoTrackError::LabelMismatch { .. })));

        assert!(c.family.samples().is_empty());
    }

    #[test]
    fn negative_delta_leaves_value_unchanged() {
        let c = counter();
        let ls = [("operation", "accept"), ("outcome", "error")];
        c.increment(&ls, 3.0).unwrap();

        let err = c.increment(&ls, -1.0).unwrap_err();
        assert!(matches!(err, MemoTrackError::NegativeDelta(d) if d == -1.0));
        assert!(c.increment(&ls, f64::NAN).is_err());
        assert_eq!(c.get(&ls).unwrap(), Some(3.0));
    }

    #[test]
    fn gauge_set_and_add() {
        let g = Gauge::new(Arc::new(Family::new(MetricDescriptor::gauge("g", "g", &["state"]))));
        assert_eq!(g.get(&[("state", "idle")]).unwrap(), None);
        g.set(&[("state", "idle")], 4.0).unwrap();
        g.add(&[("state", "idle")], -1.5).unwrap();
        assert_eq!(g.get(&[("state", "idle")]).unwrap(), Some(2.5));
    }

    #[test]
    fn histogram_cumulative_buckets() {
        let h = Histogram::new(Arc::new(Family::new(MetricDescriptor::histogram(
            "h",
            "h",
            &[],
            &[1.0, 5.0, 10.0],
        ))));
        for v in [0.5, 3.0, 7.0, 20.0] {
            h.observe(&[], v).unwrap();
        }
        let snap = h.snapshot(&[]).unwrap().unwrap();
        assert_eq!(
            snap.buckets,
            vec![(1.0, 1), (5.0, 2), (10.0, 3), (f64::INFINITY, 4)]
        );
        assert_eq!(snap.sum, 30.5);
        assert_eq!(snap.count, 4);
    }

    #[test]
    fn series_ordered_by_first_seen() {
        let c = counter();
        c.inc(&[("operation", "b"), ("outcome", "x")]).unwrap();
        c.inc(&[("operation", "a"), ("outcome", "x")]).unwrap();
        c.inc(&[("operation", "b"), ("outcome", "x")]).unwrap();

        let ops: Vec<String> = c
            .family
            .samples()
            .into_iter()
            .map(|s| s.labels[0].1.clone())
            .collect();
        assert_eq!(ops, vec!["b", "a"]);
    }
}
