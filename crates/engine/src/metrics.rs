//! Conversion counters, timings, and the node type histogram.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use adfmark_core::{Document, NodeType};
use log::warn;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Conversions slower than this are logged.
pub const SLOW_CONVERSION_THRESHOLD: Duration = Duration::from_millis(100);

/// Thread-safe collector updated by every conversion.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    conversions: AtomicU64,
    errors: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
    slow_conversions: AtomicU64,
    node_types: Mutex<FxHashMap<NodeType, u64>>,
}

/// Point-in-time copy of the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Calls to `convert`, cache hits included.
    pub conversions: u64,
    /// Conversions that produced an error document.
    pub errors: u64,
    /// Lookups answered from the cache.
    pub cache_hits: u64,
    /// Lookups that had to convert.
    pub cache_misses: u64,
    /// `hits / (hits + misses)`, 0 when there were no lookups.
    pub cache_hit_rate: f64,
    /// Mean wall time per conversion in milliseconds.
    pub avg_ms: f64,
    /// Slowest conversion in milliseconds.
    pub max_ms: f64,
    /// Conversions at or over [`SLOW_CONVERSION_THRESHOLD`].
    pub slow_conversions: u64,
    /// Nodes produced per type, over freshly converted documents.
    pub node_types: BTreeMap<String, u64>,
}

impl MetricsCollector {
    /// A zeroed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one conversion and its wall time.
    pub fn record_conversion(&self, elapsed: Duration, input_len: usize) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.conversions.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
        if elapsed >= SLOW_CONVERSION_THRESHOLD {
            self.slow_conversions.fetch_add(1, Ordering::Relaxed);
            warn!(
                "slow conversion: {:.1} ms for {input_len} bytes",
                elapsed.as_secs_f64() * 1000.0
            );
        }
    }

    /// Records a conversion that fell back to the error document.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache hit.
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache miss.
    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a document's nodes to the histogram.
    pub fn record_nodes(&self, doc: &Document) {
        let counts = doc.node_type_counts();
        let mut histogram = self.node_types.lock();
        for (node_type, count) in counts {
            *histogram.entry(node_type).or_insert(0) += count;
        }
    }

    /// Copies the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let conversions = self.conversions.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let total_nanos = self.total_nanos.load(Ordering::Relaxed);
        let lookups = cache_hits + cache_misses;

        let node_types = self
            .node_types
            .lock()
            .iter()
            .map(|(node_type, count)| (node_type.as_str().to_string(), *count))
            .collect();

        MetricsSnapshot {
            conversions,
            errors: self.errors.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                cache_hits as f64 / lookups as f64
            },
            avg_ms: if conversions == 0 {
                0.0
            } else {
                total_nanos as f64 / conversions as f64 / 1e6
            },
            max_ms: self.max_nanos.load(Ordering::Relaxed) as f64 / 1e6,
            slow_conversions: self.slow_conversions.load(Ordering::Relaxed),
            node_types,
        }
    }

    /// Zeroes every counter and the histogram.
    pub fn reset(&self) {
        for counter in [
            &self.conversions,
            &self.errors,
            &self.cache_hits,
            &self.cache_misses,
            &self.total_nanos,
            &self.max_nanos,
            &self.slow_conversions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.node_types.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adfmark_core::Node;

    #[test]
    fn rates_and_averages() {
        let metrics = MetricsCollector::new();
        metrics.record_miss();
        metrics.record_conversion(Duration::from_millis(2), 10);
        metrics.record_hit();
        metrics.record_conversion(Duration::from_millis(4), 10);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.conversions, 2);
        assert_eq!(snapshot.cache_hit_rate, 0.5);
        assert!((snapshot.avg_ms - 3.0).abs() < 1e-9);
        assert!((snapshot.max_ms - 4.0).abs() < 1e-9);
        assert_eq!(snapshot.slow_conversions, 0);
    }

    #[test]
    fn slow_conversions_are_counted() {
        let metrics = MetricsCollector::new();
        metrics.record_conversion(SLOW_CONVERSION_THRESHOLD, 1);
        assert_eq!(metrics.snapshot().slow_conversions, 1);
    }

    #[test]
    fn histogram_uses_wire_names() {
        let metrics = MetricsCollector::new();
        let doc = Document::new(vec![Node::container(
            NodeType::CodeBlock,
            vec![Node::text("x")],
        )]);
        metrics.record_nodes(&doc);
        metrics.record_nodes(&doc);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.node_types.get("codeBlock"), Some(&2));
        assert_eq!(snapshot.node_types.get("text"), Some(&2));
    }

    #[test]
    fn reset_zeroes_everything() {
        let metrics = MetricsCollector::new();
        metrics.record_error();
        metrics.record_nodes(&Document::new(vec![Node::empty_paragraph()]));
        metrics.reset();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.errors, 0);
        assert!(snapshot.node_types.is_empty());
    }

    #[test]
    fn empty_snapshot_has_no_nan() {
        let snapshot = MetricsCollector::new().snapshot();
        assert_eq!(snapshot.cache_hit_rate, 0.0);
        assert_eq!(snapshot.avg_ms, 0.0);
    }
}
