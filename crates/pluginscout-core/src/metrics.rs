//! Discovery metrics
//!
//! A small histogram vector with Prometheus text exposition. One sample is
//! recorded per discovery run, labelled with the source class and the
//! number of bundles found.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::constants::metrics::{DEFAULT_BUCKETS, FIND_DURATION, FIND_DURATION_HELP};

static GLOBAL: Lazy<Arc<FindMetrics>> = Lazy::new(|| Arc::new(FindMetrics::new()));

/// Label values of one series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FindLabels {
    pub class: String,
    pub total: String,
}

/// Accumulated observations of one series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub count: u64,
    pub sum: f64,
    /// Non-cumulative count per bucket, `+Inf` last
    pub buckets: Vec<u64>,
}

#[derive(Debug)]
pub struct FindMetrics {
    bounds: Vec<f64>,
    series: Mutex<BTreeMap<FindLabels, SeriesSnapshot>>,
}

impl FindMetrics {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS.to_vec())
    }

    /// `bounds` are upper bucket bounds in ascending order
    pub fn with_buckets(bounds: Vec<f64>) -> Self {
        Self {
            bounds,
            series: Mutex::new(BTreeMap::new()),
        }
    }

    /// Process-wide sink
    pub fn global() -> Arc<FindMetrics> {
        GLOBAL.clone()
    }

    pub fn observe(&self, class: &str, total: usize, seconds: f64) {
        let labels = FindLabels {
            class: class.to_string(),
            total: total.to_string(),
        };
        let bucket = self
            .bounds
            .iter()
            .position(|bound| seconds <= *bound)
            .unwrap_or(self.bounds.len());

        let mut series = self.series.lock();
        let entry = series.entry(labels).or_insert_with(|| SeriesSnapshot {
            count: 0,
            sum: 0.0,
            buckets: vec![0; self.bounds.len() + 1],
        });
        entry.count += 1;
        entry.sum += seconds;
        entry.buckets[bucket] += 1;
    }

    pub fn snapshot(&self) -> BTreeMap<FindLabels, SeriesSnapshot> {
        self.series.lock().clone()
    }

    /// Total observations across all series
    pub fn sample_count(&self) -> u64 {
        self.series.lock().values().map(|s| s.count).sum()
    }

    /// Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# HELP {FIND_DURATION} {FIND_DURATION_HELP}");
        let _ = writeln!(out, "# TYPE {FIND_DURATION} histogram");

        for (labels, series) in self.series.lock().iter() {
            let base = format!(r#"class="{}",total="{}""#, labels.class, labels.total);
            let mut cumulative = 0;
            for (idx, count) in series.buckets.iter().enumerate() {
                cumulative += count;
                let le = match self.bounds.get(idx) {
                    Some(bound) => bound.to_string(),
                    None => "+Inf".to_string(),
                };
                let _ = writeln!(
                    out,
                    r#"{FIND_DURATION}_bucket{{{base},le="{le}"}} {cumulative}"#
                );
            }
            let _ = writeln!(out, "{FIND_DURATION}_sum{{{base}}} {}", series.sum);
            let _ = writeln!(out, "{FIND_DURATION}_count{{{base}}} {}", series.count);
        }

        out
    }
}

impl Default for FindMetrics {
    fn default() -> Self {
        Self::new()
    }
}
