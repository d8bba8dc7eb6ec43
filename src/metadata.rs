//! Upstream trade-count metadata.
//!
//! The historical trade-count record tells us where the recorded data starts
//! and which instrument it covers. The pipeline never reads it directly; it
//! only parameterizes the snapshot stream request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

/// One entry of the trade-count history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCountEntry {
    /// Exchange-qualified instrument identifier
    pub full_symbol: String,

    /// Number of trades recorded for this entry
    #[serde(default)]
    pub trade_count: Option<u64>,
}

/// Historical trade-count record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCountRecord {
    /// First recorded timestamp (nanoseconds since epoch)
    pub start_ts_nanoseconds: i64,

    /// Last recorded timestamp (nanoseconds since epoch)
    pub end_ts_nanoseconds: i64,

    /// Per-instrument history; the last entry names the instrument to replay
    #[serde(default)]
    pub history_trade_count: Vec<TradeCountEntry>,
}

impl TradeCountRecord {
    /// Instrument identifier of the most recent history entry.
    pub fn latest_symbol(&self) -> Option<&str> {
        self.history_trade_count
            .last()
            .map(|e| e.full_symbol.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Recorded span in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.end_ts_nanoseconds
            .saturating_sub(self.start_ts_nanoseconds) as f64
            / 1e9
    }
}

/// Source of the trade-count record.
pub trait TradeCountLookup {
    /// Fetch the record.
    fn lookup(&self) -> Result<TradeCountRecord>;
}

/// Trade-count record stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonTradeCountLookup {
    path: PathBuf,
}

impl JsonTradeCountLookup {
    /// Create a lookup reading `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TradeCountLookup for JsonTradeCountLookup {
    fn lookup(&self) -> Result<TradeCountRecord> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            FeatureError::MissingUpstreamMetadata(format!(
                "cannot read trade-count record {}: {e}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            FeatureError::MissingUpstreamMetadata(format!(
                "cannot parse trade-count record {}: {e}",
                self.path.display()
            ))
        })
    }
}

/// In-memory lookup, for tests and simulations.
#[derive(Debug, Clone)]
pub struct StaticTradeCountLookup {
    record: Option<TradeCountRecord>,
}

impl StaticTradeCountLookup {
    /// Lookup that always yields `record`.
    pub fn new(record: TradeCountRecord) -> Self {
        Self {
            record: Some(record),
        }
    }

    /// Lookup that never yields a record.
    pub fn empty() -> Self {
        Self { record: None }
    }

    /// Convenience constructor for a single-instrument record.
    pub fn single(symbol: impl Into<String>, start_ns: i64, end_ns: i64) -> Self {
        Self::new(TradeCountRecord {
            start_ts_nanoseconds: start_ns,
            end_ts_nanoseconds: end_ns,
            history_trade_count: vec![TradeCountEntry {
                full_symbol: symbol.into(),
                trade_count: None,
            }],
        })
    }
}

impl TradeCountLookup for StaticTradeCountLookup {
    fn lookup(&self) -> Result<TradeCountRecord> {
        self.record.clone().ok_or_else(|| {
            FeatureError::MissingUpstreamMetadata("no trade-count record available".to_string())
        })
    }
}

/// Parameters of a snapshot stream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Replay start (nanoseconds since epoch)
    pub start_ns: i64,
    /// Instrument identifier
    pub instrument: String,
    /// Internal batching size of the stream
    pub block_size: usize,
}

impl StreamRequest {
    /// Create a request directly.
    pub fn new(start_ns: i64, instrument: impl Into<String>, block_size: usize) -> Self {
        Self {
            start_ns,
            instrument: instrument.into(),
            block_size,
        }
    }

    /// Derive the request from a trade-count record.
    ///
    /// Start is the record start; the instrument is the last history entry.
    pub fn from_record(record: &TradeCountRecord, block_size: usize) -> Result<Self> {
        if record.start_ts_nanoseconds <= 0 {
            return Err(FeatureError::MissingUpstreamMetadata(format!(
                "record has no usable start time ({})",
                record.start_ts_nanoseconds
            )));
        }
        let instrument = record.latest_symbol().ok_or_else(|| {
            FeatureError::MissingUpstreamMetadata(
                "record has no instrument in its trade-count history".to_string(),
            )
        })?;
        Ok(Self::new(record.start_ts_nanoseconds, instrument, block_size))
    }
}
