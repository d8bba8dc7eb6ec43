//! Snapshot stream abstraction.
//!
//! The replay engine that turns raw exchange messages into book snapshots
//! lives outside this crate. This module defines the seam it plugs into and
//! ships two implementations:
//!
//! - [`VecSource`]: in-memory snapshots, for tests and simulations
//! - [`JsonLinesSource`]: newline-delimited JSON snapshots on disk, read
//!   lazily in blocks (optionally zstd-compressed, `compressed` feature)
//!
//! Streams yield `Result<OrderBookSnapshot>`. An `Err` item is terminal:
//! the input could not be read to its end, and the run must not treat what
//! came before as complete.
//!
//! # Example
//!
//! ```
//! use lob_feature_extractor::source::{SnapshotStreamFactory, VecSource};
//! use lob_feature_extractor::{Level, OrderBookSnapshot, StreamRequest};
//!
//! let snapshots = vec![
//!     OrderBookSnapshot::new(10, vec![Level::new(101.0, 1.0)], vec![Level::new(100.0, 2.0)]),
//!     OrderBookSnapshot::new(20, vec![Level::new(101.5, 1.0)], vec![Level::new(100.5, 2.0)]),
//! ];
//!
//! let source = VecSource::new(snapshots);
//! let request = StreamRequest::new(15, "BINANCE:BTCUSDT", 5000);
//!
//! // Snapshots before the requested start are not replayed
//! let replayed: Vec<_> = source
//!     .open(&request)
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(replayed.len(), 1);
//! assert_eq!(replayed[0].timestamp, 20);
//! ```

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{FeatureError, Result};
use crate::metadata::StreamRequest;
use crate::types::OrderBookSnapshot;

/// I/O buffer size for snapshot files.
pub const IO_BUFFER_SIZE: usize = 1024 * 1024; // 1 MB

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about a snapshot source.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// Instrument the source holds, if known
    pub instrument: Option<String>,

    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Provider name (e.g., "memory", "jsonl")
    pub provider: Option<String>,

    /// Estimated snapshot count
    pub estimated_snapshots: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instrument.
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the estimated snapshot count.
    pub fn with_estimated_snapshots(mut self, count: u64) -> Self {
        self.estimated_snapshots = Some(count);
        self
    }

    /// Fail when this source is pinned to a different instrument.
    fn check_instrument(&self, request: &StreamRequest) -> Result<()> {
        match &self.instrument {
            Some(own) if own != &request.instrument => Err(FeatureError::Source(format!(
                "source holds '{own}' but '{}' was requested",
                request.instrument
            ))),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Snapshot Stream Factory Trait
// ============================================================================

/// Factory for lazy, pull-based snapshot streams.
///
/// Streams yield snapshots in increasing time order starting at the
/// requested start time. They may be unbounded, and each pull may block
/// until the next snapshot is available. A stream that cannot continue
/// yields one `Err` and then ends.
pub trait SnapshotStreamFactory {
    /// The iterator type for snapshots.
    type Stream: Iterator<Item = Result<OrderBookSnapshot>>;

    /// Open a stream for `request`.
    fn open(&self, request: &StreamRequest) -> Result<Self::Stream>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// A simple in-memory source.
pub struct VecSource {
    snapshots: Vec<OrderBookSnapshot>,
    metadata: SourceMetadata,
}

impl VecSource {
    /// Create a new vector source.
    pub fn new(snapshots: Vec<OrderBookSnapshot>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_snapshots(snapshots.len() as u64),
            snapshots,
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Stream over an in-memory snapshot list.
pub struct VecStream {
    inner: std::vec::IntoIter<OrderBookSnapshot>,
    start_ns: i64,
}

impl Iterator for VecStream {
    type Item = Result<OrderBookSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        let start_ns = self.start_ns;
        self.inner.by_ref().find(|s| s.timestamp >= start_ns).map(Ok)
    }
}

impl SnapshotStreamFactory for VecSource {
    type Stream = VecStream;

    fn open(&self, request: &StreamRequest) -> Result<Self::Stream> {
        self.metadata.check_instrument(request)?;
        Ok(VecStream {
            inner: self.snapshots.clone().into_iter(),
            start_ns: request.start_ns,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// JSON Lines Source
// ============================================================================

/// Snapshots stored one JSON object per line.
///
/// Each line looks like
/// `{"timestamp": 1700000000000000000, "asks": [[101.0, 2.5], ...], "bids": [[100.9, 1.0], ...]}`.
/// Files ending in `.zst` are decompressed on the fly when the `compressed`
/// feature is enabled.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
    skip_invalid: bool,
    metadata: SourceMetadata,
}

impl JsonLinesSource {
    /// Create a source for `path`. The file is opened on [`SnapshotStreamFactory::open`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut metadata = SourceMetadata::new()
            .with_provider("jsonl")
            .with_file_path(&path);
        if let Ok(meta) = std::fs::metadata(&path) {
            metadata.file_size = Some(meta.len());
        }
        Self {
            path,
            skip_invalid: false,
            metadata,
        }
    }

    /// Skip undecodable lines instead of failing the stream on the first
    /// one (default: fail).
    pub fn skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    /// Pin the source to an instrument; requests for another one fail.
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.metadata.instrument = Some(instrument.into());
        self
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_compressed(&self) -> bool {
        self.path.extension().is_some_and(|e| e == "zst")
    }

    fn open_reader(&self) -> Result<Box<dyn BufRead>> {
        let file = File::open(&self.path).map_err(|e| {
            FeatureError::Source(format!("cannot open {}: {e}", self.path.display()))
        })?;

        if self.is_compressed() {
            return self.open_compressed(file);
        }
        Ok(Box::new(BufReader::with_capacity(IO_BUFFER_SIZE, file)))
    }

    #[cfg(feature = "compressed")]
    fn open_compressed(&self, file: File) -> Result<Box<dyn BufRead>> {
        let decoder = zstd::stream::read::Decoder::new(file).map_err(|e| {
            FeatureError::Source(format!(
                "cannot create zstd decoder for {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(Box::new(BufReader::with_capacity(IO_BUFFER_SIZE, decoder)))
    }

    #[cfg(not(feature = "compressed"))]
    fn open_compressed(&self, _file: File) -> Result<Box<dyn BufRead>> {
        Err(FeatureError::Source(format!(
            "{} is compressed but the `compressed` feature is disabled",
            self.path.display()
        )))
    }
}

impl SnapshotStreamFactory for JsonLinesSource {
    type Stream = SnapshotIterator;

    fn open(&self, request: &StreamRequest) -> Result<Self::Stream> {
        self.metadata.check_instrument(request)?;
        let reader = self.open_reader()?;
        log::info!(
            "Opened snapshot stream {} for {} from {} (block size {})",
            self.path.display(),
            request.instrument,
            request.start_ns,
            request.block_size
        );
        Ok(SnapshotIterator::new(
            reader,
            request.start_ns,
            request.block_size,
            self.skip_invalid,
        ))
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Statistics for a snapshot stream.
#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    /// Snapshots decoded and handed out
    pub snapshots_read: u64,

    /// Snapshots decoded but earlier than the requested start
    pub snapshots_before_start: u64,

    /// Lines that could not be decoded
    pub lines_skipped: u64,

    /// Blocks pulled from the underlying reader
    pub blocks_loaded: u64,
}

/// Lazy iterator over snapshots in a JSON lines reader.
///
/// Lines are decoded a block at a time into an internal buffer. A read
/// error, or an undecodable line when not skipping, is yielded after the
/// snapshots buffered before it, and ends the stream.
pub struct SnapshotIterator {
    reader: Box<dyn BufRead>,
    buffer: VecDeque<OrderBookSnapshot>,
    failure: Option<FeatureError>,
    line: String,
    line_no: u64,
    start_ns: i64,
    block_size: usize,
    skip_invalid: bool,
    exhausted: bool,
    stats: SourceStats,
}

impl SnapshotIterator {
    fn new(reader: Box<dyn BufRead>, start_ns: i64, block_size: usize, skip_invalid: bool) -> Self {
        let block_size = block_size.max(1);
        Self {
            reader,
            buffer: VecDeque::with_capacity(block_size),
            failure: None,
            line: String::new(),
            line_no: 0,
            start_ns,
            block_size,
            skip_invalid,
            exhausted: false,
            stats: SourceStats::default(),
        }
    }

    /// Get current statistics.
    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }

    /// Decode up to one block of lines into the buffer.
    fn fill_block(&mut self) {
        let mut lines_in_block = 0;

        while lines_in_block < self.block_size {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("Failed to read snapshot line {}: {e}", self.line_no + 1);
                    self.failure = Some(FeatureError::Source(format!(
                        "failed to read snapshot line {}: {e}",
                        self.line_no + 1
                    )));
                    self.exhausted = true;
                    break;
                }
            }
            self.line_no += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            lines_in_block += 1;

            match serde_json::from_str::<OrderBookSnapshot>(text) {
                Ok(snapshot) if snapshot.timestamp < self.start_ns => {
                    self.stats.snapshots_before_start += 1;
                }
                Ok(snapshot) => self.buffer.push_back(snapshot),
                Err(e) => {
                    if self.skip_invalid {
                        log::warn!("Skipping undecodable snapshot on line {}: {e}", self.line_no);
                        self.stats.lines_skipped += 1;
                    } else {
                        log::error!("Undecodable snapshot on line {}: {e}", self.line_no);
                        self.failure = Some(FeatureError::Source(format!(
                            "undecodable snapshot on line {}: {e}",
                            self.line_no
                        )));
                        self.exhausted = true;
                        break;
                    }
                }
            }
        }

        if lines_in_block > 0 {
            self.stats.blocks_loaded += 1;
        }
    }
}

impl Iterator for SnapshotIterator {
    type Item = Result<OrderBookSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(snapshot) = self.buffer.pop_front() {
                self.stats.snapshots_read += 1;
                return Some(Ok(snapshot));
            }
            if self.exhausted {
                return self.failure.take().map(Err);
            }
            self.fill_block();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;
    use std::io::{Cursor, Write};
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn unique_temp_file(name: &str) -> PathBuf {
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "source_test_{}_{}_{}",
            std::process::id(),
            counter,
            name
        ))
    }

    fn snap(ts: i64) -> OrderBookSnapshot {
        OrderBookSnapshot::new(ts, vec![Level::new(101.0, 1.0)], vec![Level::new(100.0, 1.0)])
    }

    fn line(ts: i64) -> String {
        format!(r#"{{"timestamp": {ts}, "asks": [[101.0, 1.0]], "bids": [[100.0, 1.0]]}}"#)
    }

    fn iter_over(text: String, start_ns: i64, block: usize, skip: bool) -> SnapshotIterator {
        SnapshotIterator::new(Box::new(Cursor::new(text.into_bytes())), start_ns, block, skip)
    }

    fn timestamps<I: Iterator<Item = Result<OrderBookSnapshot>>>(it: I) -> Vec<i64> {
        it.map(|s| s.unwrap().timestamp).collect()
    }

    #[test]
    fn test_vec_source_filters_by_start() {
        let source = VecSource::new(vec![snap(1), snap(5), snap(9)]);
        assert_eq!(source.metadata().estimated_snapshots, Some(3));
        assert_eq!(source.metadata().provider, Some("memory".to_string()));

        let got = timestamps(source.open(&StreamRequest::new(5, "X", 10)).unwrap());
        assert_eq!(got, vec![5, 9]);
    }

    #[test]
    fn test_vec_source_instrument_mismatch() {
        let source = VecSource::new(vec![snap(1)])
            .with_metadata(SourceMetadata::new().with_instrument("BINANCE:ETHUSDT"));
        let result = source.open(&StreamRequest::new(0, "BINANCE:BTCUSDT", 10));
        assert!(matches!(result, Err(FeatureError::Source(_))));
    }

    #[test]
    fn test_iterator_reads_in_blocks() {
        let text = (1..=5).map(line).collect::<Vec<_>>().join("\n");
        let mut it = iter_over(text, 0, 2, false);

        let got = timestamps(it.by_ref());
        assert_eq!(got, vec![1, 2, 3, 4, 5]);
        assert_eq!(it.stats().snapshots_read, 5);
        assert_eq!(it.stats().blocks_loaded, 3);
    }

    #[test]
    fn test_iterator_skips_before_start_and_blank_lines() {
        let text = format!("{}\n\n{}\n{}\n", line(1), line(2), line(3));
        let mut it = iter_over(text, 2, 100, false);

        let got = timestamps(it.by_ref());
        assert_eq!(got, vec![2, 3]);
        assert_eq!(it.stats().snapshots_before_start, 1);
    }

    #[test]
    fn test_iterator_skip_invalid() {
        let text = format!("{}\nnot json\n{}\n", line(1), line(2));

        let mut skipping = iter_over(text.clone(), 0, 100, true);
        assert_eq!(timestamps(skipping.by_ref()), vec![1, 2]);
        assert_eq!(skipping.stats().lines_skipped, 1);

        // Without skipping, the snapshot before the bad line is delivered,
        // then the failure, then nothing
        let mut strict = iter_over(text, 0, 100, false);
        assert_eq!(strict.next().unwrap().unwrap().timestamp, 1);
        assert!(matches!(strict.next(), Some(Err(FeatureError::Source(_)))));
        assert!(strict.next().is_none());
    }

    #[test]
    fn test_jsonl_source_from_file() {
        let path = unique_temp_file("snapshots.jsonl");
        {
            let mut f = File::create(&path).unwrap();
            for ts in 1..=3 {
                writeln!(f, "{}", line(ts)).unwrap();
            }
        }

        let source = JsonLinesSource::new(&path);
        assert_eq!(source.metadata().provider, Some("jsonl".to_string()));
        assert!(source.metadata().file_size.unwrap() > 0);

        let got: Vec<_> = source
            .open(&StreamRequest::new(0, "X", 2))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0], snap(1));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_jsonl_source_missing_file() {
        let source = JsonLinesSource::new("/nonexistent/snapshots.jsonl");
        let result = source.open(&StreamRequest::new(0, "X", 10));
        assert!(matches!(result, Err(FeatureError::Source(_))));
    }

    #[cfg(feature = "compressed")]
    #[test]
    fn test_jsonl_source_zstd() {
        let path = unique_temp_file("snapshots.jsonl.zst");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = zstd::stream::write::Encoder::new(file, 3).unwrap();
            for ts in 1..=4 {
                writeln!(encoder, "{}", line(ts)).unwrap();
            }
            encoder.finish().unwrap();
        }

        let got = timestamps(
            JsonLinesSource::new(&path)
                .open(&StreamRequest::new(3, "X", 10))
                .unwrap(),
        );
        assert_eq!(got, vec![3, 4]);

        let _ = std::fs::remove_file(&path);
    }

    #[cfg(feature = "compressed")]
    #[test]
    fn test_truncated_zstd_ends_with_error() {
        let path = unique_temp_file("truncated.jsonl.zst");
        {
            let mut bytes = Vec::new();
            let mut encoder = zstd::stream::write::Encoder::new(&mut bytes, 3).unwrap();
            for ts in 1..=2000 {
                writeln!(encoder, "{}", line(ts)).unwrap();
            }
            encoder.finish().unwrap();
            let half = bytes.len() / 2;
            std::fs::write(&path, &bytes[..half]).unwrap();
        }

        let results: Vec<_> = JsonLinesSource::new(&path)
            .open(&StreamRequest::new(0, "X", 100))
            .unwrap()
            .collect();
        assert!(results.len() < 2001);
        assert!(matches!(results.last(), Some(Err(FeatureError::Source(_)))));
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
