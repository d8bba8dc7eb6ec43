//! Snapshot-to-feature pipeline.
//!
//! Stages run strictly downstream, one snapshot at a time:
//!
//! 1. [`SnapshotFilter`] drops books without N levels on both sides
//! 2. [`ChangeDetector`] drops books whose top N levels did not change (optional)
//! 3. [`LevelExtractor`] slices the top N levels and computes the mid-price
//! 4. [`LabelAssigner`] hands out the next bar label
//! 5. [`FeatureTable`] accumulates the row
//!
//! All run state lives in [`FeaturePipeline`]; there is no global state.

pub mod change_detector;
pub mod extractor;
pub mod filter;
pub mod labeler;

pub use change_detector::ChangeDetector;
pub use extractor::{ExtractedLevels, LevelExtractor};
pub use filter::{DepthCheck, SnapshotFilter};
pub use labeler::LabelAssigner;

use crate::config::ExtractorConfig;
use crate::error::{FeatureError, Result};
use crate::table::FeatureTable;
use crate::types::{FeatureRow, OrderBookSnapshot};

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    /// Snapshots pulled from the stream
    pub snapshots_seen: u64,

    /// Dropped because one side had no levels
    pub dropped_empty: u64,

    /// Dropped because one side had fewer than N levels
    pub dropped_insufficient_depth: u64,

    /// Dropped because the top N levels were unchanged
    pub dropped_unchanged: u64,

    /// Rows emitted
    pub rows_retained: u64,

    /// Timestamp of the first retained row
    pub first_timestamp: Option<i64>,

    /// Timestamp of the last retained row
    pub last_timestamp: Option<i64>,
}

impl PipelineStats {
    /// Snapshots that passed the depth filter.
    pub fn passed_filter(&self) -> u64 {
        self.snapshots_seen - self.dropped_empty - self.dropped_insufficient_depth
    }

    /// Fraction of seen snapshots that became rows.
    pub fn retention_ratio(&self) -> f64 {
        if self.snapshots_seen == 0 {
            0.0
        } else {
            self.rows_retained as f64 / self.snapshots_seen as f64
        }
    }

    /// Span covered by retained rows, in seconds.
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => Some((last - first) as f64 / 1e9),
            _ => None,
        }
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "seen={} retained={} ({:.2}%) empty={} thin={} unchanged={}",
            self.snapshots_seen,
            self.rows_retained,
            self.retention_ratio() * 100.0,
            self.dropped_empty,
            self.dropped_insufficient_depth,
            self.dropped_unchanged,
        )
    }
}

/// Pipeline context: every stage plus the accumulated table.
///
/// # Example
/// ```
/// use lob_feature_extractor::{ExtractorConfig, FeaturePipeline, Level, OrderBookSnapshot};
///
/// let mut pipeline = FeaturePipeline::new(&ExtractorConfig::new(1));
///
/// let book = OrderBookSnapshot::new(1, vec![Level::new(101.0, 2.0)], vec![Level::new(99.0, 3.0)]);
/// assert_eq!(pipeline.process(&book).unwrap(), Some(0));
///
/// let (table, stats) = pipeline.finish();
/// assert_eq!(table.rows()[0].mid_price(), 100.0);
/// assert_eq!(stats.rows_retained, 1);
/// ```
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    filter: SnapshotFilter,
    change_detector: ChangeDetector,
    extractor: LevelExtractor,
    labeler: LabelAssigner,
    table: FeatureTable,
    stats: PipelineStats,
}

impl FeaturePipeline {
    /// Build a pipeline from a configuration.
    ///
    /// Only `max_level` and `only_changes` are consulted.
    pub fn new(config: &ExtractorConfig) -> Self {
        let depth = config.max_level;
        Self {
            filter: SnapshotFilter::new(depth),
            change_detector: ChangeDetector::new(config.only_changes),
            extractor: LevelExtractor::new(depth),
            labeler: LabelAssigner::new(),
            table: FeatureTable::new(depth),
            stats: PipelineStats::default(),
        }
    }

    /// Levels per side.
    #[inline]
    pub fn depth(&self) -> usize {
        self.filter.depth()
    }

    /// Push one snapshot through every stage.
    ///
    /// # Returns
    /// - `Ok(Some(label))` if a row was emitted
    /// - `Ok(None)` if the snapshot was filtered out
    ///
    /// # Errors
    /// `FeatureError::Structural` if a row reaching the table violates the
    /// depth or label invariants.
    pub fn process(&mut self, snapshot: &OrderBookSnapshot) -> Result<Option<u64>> {
        self.stats.snapshots_seen += 1;

        match self.filter.check(snapshot) {
            DepthCheck::Sufficient => {}
            DepthCheck::EmptySide => {
                self.stats.dropped_empty += 1;
                return Ok(None);
            }
            DepthCheck::Insufficient { .. } => {
                self.stats.dropped_insufficient_depth += 1;
                return Ok(None);
            }
        }

        let depth = self.depth();
        if !self
            .change_detector
            .should_retain(&snapshot.asks()[..depth], &snapshot.bids()[..depth])
        {
            self.stats.dropped_unchanged += 1;
            return Ok(None);
        }

        let extracted = self.extractor.extract(snapshot).ok_or_else(|| {
            FeatureError::structural(format!(
                "snapshot at {} passed the depth filter with an empty side",
                snapshot.timestamp
            ))
        })?;

        let label = self.labeler.assign();
        let row = FeatureRow::new(
            snapshot.timestamp,
            extracted.asks,
            extracted.bids,
            extracted.mid_price,
            label,
        );
        self.table.push(row)?;

        self.stats.rows_retained += 1;
        if self.stats.first_timestamp.is_none() {
            self.stats.first_timestamp = Some(snapshot.timestamp);
        }
        self.stats.last_timestamp = Some(snapshot.timestamp);

        Ok(Some(label))
    }

    /// Drain a snapshot stream through the pipeline.
    pub fn run<I>(&mut self, snapshots: I) -> Result<()>
    where
        I: IntoIterator<Item = OrderBookSnapshot>,
    {
        for snapshot in snapshots {
            self.process(&snapshot)?;
        }
        Ok(())
    }

    /// Current statistics.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Rows accumulated so far.
    pub fn table(&self) -> &FeatureTable {
        &self.table
    }

    /// Consume the pipeline, returning the table and statistics.
    pub fn finish(self) -> (FeatureTable, PipelineStats) {
        (self.table, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;

    fn book(ts: i64, asks: &[(f64, f64)], bids: &[(f64, f64)]) -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            ts,
            asks.iter().map(|&(p, v)| Level::new(p, v)).collect(),
            bids.iter().map(|&(p, v)| Level::new(p, v)).collect(),
        )
    }

    fn two_level(ts: i64, ask_vol: f64) -> OrderBookSnapshot {
        book(
            ts,
            &[(101.0, ask_vol), (102.0, 1.0)],
            &[(100.0, 1.0), (99.0, 1.0)],
        )
    }

    #[test]
    fn test_process_emits_sequential_labels() {
        let mut pipeline = FeaturePipeline::new(&ExtractorConfig::new(2));

        assert_eq!(pipeline.process(&two_level(1, 1.0)).unwrap(), Some(0));
        assert_eq!(pipeline.process(&two_level(2, 2.0)).unwrap(), Some(1));
        assert_eq!(pipeline.process(&two_level(3, 3.0)).unwrap(), Some(2));

        assert_eq!(pipeline.table().len(), 3);
        assert_eq!(pipeline.stats().rows_retained, 3);
        assert_eq!(pipeline.stats().first_timestamp, Some(1));
        assert_eq!(pipeline.stats().last_timestamp, Some(3));
    }

    #[test]
    fn test_thin_book_consumes_no_label() {
        let mut pipeline = FeaturePipeline::new(&ExtractorConfig::new(2));

        assert_eq!(pipeline.process(&two_level(1, 1.0)).unwrap(), Some(0));
        let thin = book(2, &[(101.0, 1.0)], &[(100.0, 1.0), (99.0, 1.0)]);
        assert_eq!(pipeline.process(&thin).unwrap(), None);
        let empty = book(3, &[], &[(100.0, 1.0)]);
        assert_eq!(pipeline.process(&empty).unwrap(), None);
        assert_eq!(pipeline.process(&two_level(4, 2.0)).unwrap(), Some(1));

        let stats = pipeline.stats();
        assert_eq!(stats.dropped_insufficient_depth, 1);
        assert_eq!(stats.dropped_empty, 1);
        assert_eq!(stats.passed_filter(), 2);
    }

    #[test]
    fn test_dedup_only_compares_top_levels() {
        let config = ExtractorConfig::new(1).with_only_changes(true);
        let mut pipeline = FeaturePipeline::new(&config);

        let a = book(1, &[(101.0, 1.0), (102.0, 1.0)], &[(100.0, 1.0)]);
        // Differs only below the top level
        let b = book(2, &[(101.0, 1.0), (105.0, 9.0)], &[(100.0, 1.0)]);

        assert_eq!(pipeline.process(&a).unwrap(), Some(0));
        assert_eq!(pipeline.process(&b).unwrap(), None);
        assert_eq!(pipeline.stats().dropped_unchanged, 1);
    }

    #[test]
    fn test_without_dedup_duplicates_are_kept() {
        let mut pipeline = FeaturePipeline::new(&ExtractorConfig::new(2));
        pipeline
            .run(vec![two_level(1, 1.0), two_level(2, 1.0), two_level(3, 1.0)])
            .unwrap();
        assert_eq!(pipeline.stats().rows_retained, 3);
        assert_eq!(pipeline.stats().dropped_unchanged, 0);
    }

    #[test]
    fn test_extra_depth_is_sliced() {
        let mut pipeline = FeaturePipeline::new(&ExtractorConfig::new(1));
        pipeline
            .process(&book(1, &[(101.0, 1.0), (102.0, 1.0)], &[(99.0, 1.0), (98.0, 1.0)]))
            .unwrap();

        let (table, _) = pipeline.finish();
        let row = &table.rows()[0];
        assert_eq!(row.asks().len(), 1);
        assert_eq!(row.bids().len(), 1);
        assert_eq!(row.mid_price(), 100.0);
    }

    #[test]
    fn test_stats_summary() {
        let mut pipeline = FeaturePipeline::new(&ExtractorConfig::new(2));
        pipeline.process(&two_level(1_000_000_000, 1.0)).unwrap();
        pipeline.process(&two_level(3_000_000_000, 1.0)).unwrap();

        let stats = pipeline.stats();
        assert_eq!(stats.duration_seconds(), Some(2.0));
        assert!((stats.retention_ratio() - 1.0).abs() < 1e-12);
        assert!(stats.summary().contains("retained=2"));
    }
}
