//! Single-series collectors.
//!
//! Every type here is internally synchronized: counters and gauges are lock-free
//! atomics, histograms keep per-bucket atomic counts, and summaries guard their
//! sample window with a short-lived mutex.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rpcmetrics_core::protocol::Objective;

use super::atomic::AtomicF64;

/// Monotonic counter. Callers reject negative increments before calling in.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicF64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_by(&self, v: f64) {
        self.value.add(v);
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }
}

/// Gauge: arbitrary up/down value with absolute set.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicF64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, v: f64) {
        self.value.add(v);
    }

    pub fn sub(&self, v: f64) {
        self.value.add(-v);
    }

    pub fn set(&self, v: f64) {
        self.value.set(v);
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }
}

/// Point-in-time histogram view with cumulative bucket counts.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper_bound, cumulative_count)`; the implicit `+Inf` bucket is `count`.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

/// Histogram with fixed upper bounds.
#[derive(Debug)]
pub struct Histogram {
    upper_bounds: Arc<[f64]>,
    counts: Box<[AtomicU64]>,
    sum: AtomicF64,
    count: AtomicU64,
}

impl Histogram {
    /// `upper_bounds` must be strictly increasing (checked by the factory).
    pub fn new(upper_bounds: Arc<[f64]>) -> Self {
        let counts = (0..upper_bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            upper_bounds,
            counts,
            sum: AtomicF64::default(),
            count: AtomicU64::new(0),
        }
    }

    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper_bounds
    }

    pub fn observe(&self, v: f64) {
        // Values above the last bound only land in +Inf (== count).
        let slot = self
            .upper_bounds
            .iter()
            .position(|&b| v <= b)
            .and_then(|i| self.counts.get(i));
        if let Some(slot) = slot {
            slot.fetch_add(1, Ordering::Relaxed);
        }
        self.sum.add(v);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut acc = 0u64;
        let buckets = self
            .upper_bounds
            .iter()
            .zip(self.counts.iter())
            .map(|(&le, c)| {
                acc += c.load(Ordering::Relaxed);
                (le, acc)
            })
            .collect();
        HistogramSnapshot {
            buckets,
            sum: self.sum.get(),
            count: self.count.load(Ordering::Relaxed),
        }
    }
}

/// Number of most recent samples a summary keeps for quantile estimation.
pub const SUMMARY_WINDOW: usize = 500;

/// Point-in-time summary view.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    /// `(quantile, value)`; value is NaN while no sample has been observed.
    pub quantiles: Vec<(f64, f64)>,
    pub sum: f64,
    pub count: u64,
}

#[derive(Debug, Default)]
struct SummaryState {
    count: u64,
    sum: f64,
    window: VecDeque<f64>,
}

/// Summary over a sliding window of recent samples.
///
/// Without objectives only `count` and `sum` are reported.
#[derive(Debug)]
pub struct Summary {
    objectives: Arc<[Objective]>,
    state: Mutex<SummaryState>,
}

impl Summary {
    pub fn new(objectives: Arc<[Objective]>) -> Self {
        Self {
            objectives,
            state: Mutex::new(SummaryState::default()),
        }
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn observe(&self, v: f64) {
        let mut st = self.lock();
        st.count += 1;
        st.sum += v;
        if self.objectives.is_empty() || v.is_nan() {
            return;
        }
        st.window.push_back(v);
        if st.window.len() > SUMMARY_WINDOW {
            st.window.pop_front();
        }
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        let (count, sum, mut sorted) = {
            let st = self.lock();
            (st.count, st.sum, st.window.iter().copied().collect::<Vec<_>>())
        };
        sorted.sort_by(f64::total_cmp);

        let quantiles = self
            .objectives
            .iter()
            .map(|o| (o.quantile, rank_value(&sorted, o.quantile)))
            .collect();

        SummarySnapshot {
            quantiles,
            sum,
            count,
        }
    }

    // A poisoned lock only means an observer panicked mid-update; the state
    // is still a valid sample set, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, SummaryState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn rank_value(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted
        .get(rank.min(sorted.len() - 1))
        .copied()
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_set_then_sub() {
        let g = Gauge::new();
        g.set(10.0);
        g.sub(4.0);
        assert_eq!(g.get(), 6.0);
        g.set(10.0);
        g.set(10.0);
        assert_eq!(g.get(), 10.0);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = Histogram::new(Arc::from(vec![1.0, 5.0, 10.0]));
        for v in [0.5, 1.0, 3.0, 7.0, 42.0] {
            h.observe(v);
        }
        let snap = h.snapshot();
        assert_eq!(snap.buckets, vec![(1.0, 2), (5.0, 3), (10.0, 4)]);
        assert_eq!(snap.count, 5);
        assert_eq!(snap.sum, 53.5);
    }

    #[test]
    fn summary_without_objectives_reports_count_and_sum() {
        let s = Summary::new(Arc::from(Vec::new()));
        s.observe(2.0);
        s.observe(3.0);
        let snap = s.snapshot();
        assert!(snap.quantiles.is_empty());
        assert_eq!(snap.count, 2);
        assert_eq!(snap.sum, 5.0);
    }

    #[test]
    fn summary_quantiles_over_window() {
        let s = Summary::new(Arc::from(vec![
            Objective { quantile: 0.5, error: 0.05 },
            Objective { quantile: 0.99, error: 0.001 },
        ]));
        for v in 1..=101 {
            s.observe(v as f64);
        }
        let snap = s.snapshot();
        assert_eq!(snap.quantiles, vec![(0.5, 51.0), (0.99, 100.0)]);
    }

    #[test]
    fn summary_window_is_bounded() {
        let s = Summary::new(Arc::from(vec![Objective { quantile: 0.0, error: 0.01 }]));
        for v in 0..(SUMMARY_WINDOW + 10) {
            s.observe(v as f64);
        }
        let snap = s.snapshot();
        // The oldest ten samples fell out of the window.
        assert_eq!(snap.quantiles, vec![(0.0, 10.0)]);
        assert_eq!(snap.count, (SUMMARY_WINDOW + 10) as u64);
    }

    #[test]
    fn empty_summary_quantile_is_nan() {
        let s = Summary::new(Arc::from(vec![Objective { quantile: 0.5, error: 0.05 }]));
        assert!(s.snapshot().quantiles[0].1.is_nan());
    }
}
