//! End-to-end extraction run.
//!
//! Metadata lookup → stream request → pipeline → persisted table. Any
//! failure aborts the run; nothing is retried.

use std::path::PathBuf;

use crate::config::ExtractorConfig;
use crate::error::Result;
use crate::metadata::{StreamRequest, TradeCountLookup};
use crate::persist::Persister;
use crate::pipeline::{FeaturePipeline, PipelineStats};
use crate::source::SnapshotStreamFactory;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Where the table was written
    pub output_path: PathBuf,

    /// The stream request derived from upstream metadata
    pub request: StreamRequest,

    /// Pipeline counters
    pub stats: PipelineStats,
}

impl RunSummary {
    /// Log the outcome at info level.
    pub fn log(&self) {
        log::info!(
            "Wrote {} rows for {} to {} from {} snapshots",
            self.stats.rows_retained,
            self.request.instrument,
            self.output_path.display(),
            self.stats.snapshots_seen
        );
    }
}

/// One configured extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    config: ExtractorConfig,
}

impl ExtractionJob {
    /// Create a job.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run the extraction.
    ///
    /// # Errors
    /// - `InvalidConfig` before anything else happens
    /// - `MissingUpstreamMetadata` before any snapshot is pulled
    /// - `Source` if the stream cannot be opened or fails partway
    /// - `Structural` on an internal invariant violation
    /// - `Persistence` if the table cannot be written
    pub fn run<L, F>(&self, lookup: &L, factory: &F) -> Result<RunSummary>
    where
        L: TradeCountLookup + ?Sized,
        F: SnapshotStreamFactory,
    {
        self.config.validate()?;
        self.log_parameters();

        let record = lookup.lookup()?;
        let request = StreamRequest::from_record(&record, self.config.block_size)?;
        log::info!(
            "Extracting {} levels for {} starting at {} ns",
            self.config.max_level,
            request.instrument,
            request.start_ns
        );

        let stream = factory.open(&request)?;
        let mut pipeline = FeaturePipeline::new(&self.config);
        for snapshot in stream {
            // A broken stream aborts the run; a partial table is never persisted
            pipeline.process(&snapshot?)?;
        }

        let (table, stats) = pipeline.finish();
        log::info!("Pipeline finished: {}", stats.summary());

        let output_path = Persister::for_config(&self.config).write(&table)?;

        let summary = RunSummary {
            output_path,
            request,
            stats,
        };
        summary.log();
        Ok(summary)
    }

    fn log_parameters(&self) {
        let c = &self.config;
        log::info!(
            "Run parameters: max_level={} only_changes={} time_discretization={} output_dir={}",
            c.max_level,
            c.only_changes,
            c.time_discretization,
            c.output_dir.display()
        );
        log::debug!(
            "Accepted, not used by the pipeline: data={} volume_threshold={} tick_size={} data_frac={}",
            c.data_path.display(),
            c.volume_threshold,
            c.tick_size,
            c.data_frac
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;
    use crate::metadata::StaticTradeCountLookup;
    use crate::source::{JsonLinesSource, VecSource};
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn unique_temp_dir(test_name: &str) -> PathBuf {
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "job_test_{}_{}_{}",
            std::process::id(),
            test_name,
            counter
        ))
    }

    fn cleanup(dir: &Path) {
        let _ = std::fs::remove_dir_all(dir);
    }

    fn line(ts: i64) -> String {
        format!(
            r#"{{"timestamp": {ts}, "asks": [[101.0, 1.0], [101.5, 2.0]], "bids": [[100.0, 1.0]]}}"#
        )
    }

    #[cfg(feature = "compressed")]
    #[test]
    fn test_truncated_stream_fails_without_output() {
        let dir = unique_temp_dir("truncated");
        std::fs::create_dir_all(&dir).unwrap();
        let data = dir.join("snapshots.jsonl.zst");
        {
            let mut bytes = Vec::new();
            let mut encoder = zstd::stream::write::Encoder::new(&mut bytes, 3).unwrap();
            for ts in 1..=20_000 {
                writeln!(encoder, "{}", line(ts)).unwrap();
            }
            encoder.finish().unwrap();
            let half = bytes.len() / 2;
            std::fs::write(&data, &bytes[..half]).unwrap();
        }

        let config = ExtractorConfig::new(1).with_output_dir(dir.join("out"));
        let err = ExtractionJob::new(config.clone())
            .run(
                &StaticTradeCountLookup::single("X", 1, 2),
                &JsonLinesSource::new(&data),
            )
            .unwrap_err();

        assert!(matches!(err, FeatureError::Source(_)));
        assert!(!config.output_path().exists());
        cleanup(&dir);
    }

    #[test]
    fn test_bad_line_fails_run_unless_skipping() {
        let dir = unique_temp_dir("bad_line");
        std::fs::create_dir_all(&dir).unwrap();
        let data = dir.join("snapshots.jsonl");
        {
            let mut f = std::fs::File::create(&data).unwrap();
            writeln!(f, "{}", line(1)).unwrap();
            writeln!(f, "{{\"timestamp\": 2, \"asks\": [[101.0").unwrap();
            writeln!(f, "{}", line(3)).unwrap();
        }
        let config = ExtractorConfig::new(1).with_output_dir(dir.join("out"));
        let lookup = StaticTradeCountLookup::single("X", 1, 2);
        let job = ExtractionJob::new(config.clone());

        let err = job.run(&lookup, &JsonLinesSource::new(&data)).unwrap_err();
        assert!(matches!(err, FeatureError::Source(_)));
        assert!(!config.output_path().exists());

        let summary = job
            .run(&lookup, &JsonLinesSource::new(&data).skip_invalid(true))
            .unwrap();
        assert_eq!(summary.stats.rows_retained, 2);
        assert!(summary.output_path.exists());
        cleanup(&dir);
    }

    #[test]
    fn test_missing_metadata_aborts_before_stream() {
        let job = ExtractionJob::new(ExtractorConfig::new(1).with_output_dir("/nonexistent/never"));
        let err = job
            .run(&StaticTradeCountLookup::empty(), &VecSource::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, FeatureError::MissingUpstreamMetadata(_)));
    }

    #[test]
    fn test_invalid_config_aborts() {
        let job = ExtractionJob::new(ExtractorConfig::new(0));
        let err = job
            .run(
                &StaticTradeCountLookup::single("X", 1, 2),
                &VecSource::new(Vec::new()),
            )
            .unwrap_err();
        assert!(matches!(err, FeatureError::InvalidConfig(_)));
    }
}
