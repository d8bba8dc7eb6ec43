//! # LOB Feature Extractor
//!
//! Fixed-depth, time-indexed feature tables from limit order book snapshots,
//! for order-flow-imbalance research (Cont, Kukanov & Stoikov; Xu, Gould &
//! Howison multi-level OFI).
//!
//! Each snapshot pulled from a replay stream is:
//!
//! 1. dropped unless both sides hold at least N levels,
//! 2. optionally dropped if its top N levels equal the last kept snapshot's,
//! 3. sliced to its top N levels per side, with mid-price `|ask₀ + bid₀| / 2`,
//! 4. given the next bar label (0, 1, 2, ...),
//! 5. appended to an in-memory table that is written once, as CSV, at the end.
//!
//! ## Quick Start
//!
//! ```rust
//! use lob_feature_extractor::{ExtractorConfig, FeaturePipeline, Level, OrderBookSnapshot};
//!
//! let config = ExtractorConfig::new(2).with_only_changes(true);
//! let mut pipeline = FeaturePipeline::new(&config);
//!
//! let book = OrderBookSnapshot::new(
//!     1_700_000_000_000_000_000,
//!     vec![Level::new(100.02, 3.0), Level::new(100.01, 1.5)],
//!     vec![Level::new(99.99, 2.0), Level::new(99.98, 4.0)],
//! );
//!
//! assert_eq!(pipeline.process(&book).unwrap(), Some(0));
//! // Same top levels again: suppressed
//! assert_eq!(pipeline.process(&book).unwrap(), None);
//!
//! let (table, stats) = pipeline.finish();
//! assert_eq!(table.len(), 1);
//! assert_eq!(stats.dropped_unchanged, 1);
//! ```
//!
//! ## Full Run
//!
//! ```ignore
//! use lob_feature_extractor::{ExtractionJob, ExtractorConfig, JsonLinesSource, JsonTradeCountLookup};
//!
//! let job = ExtractionJob::new(ExtractorConfig::new(10).with_output_dir("data_cleaned"));
//! let summary = job.run(
//!     &JsonTradeCountLookup::new("data/trade_count.json"),
//!     &JsonLinesSource::new("data/BTCUSDT.snapshots.jsonl.zst"),
//! )?;
//! println!("{} rows -> {}", summary.stats.rows_retained, summary.output_path.display());
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | `Level`, `LevelSet`, `OrderBookSnapshot`, `FeatureRow` |
//! | [`config`] | `ExtractorConfig`, `TimeDiscretization` |
//! | [`metadata`] | Trade-count record lookup, `StreamRequest` |
//! | [`source`] | `SnapshotStreamFactory`, `VecSource`, `JsonLinesSource` |
//! | [`pipeline`] | Filter, change detector, extractor, labeler, `FeaturePipeline` |
//! | [`table`] | `FeatureTable` and its column layout |
//! | [`persist`] | Atomic CSV writer and reader |
//! | [`job`] | `ExtractionJob` orchestration |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `compressed` | ✅ | Read `.zst` snapshot files |

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod job;
pub mod metadata;
pub mod persist;
pub mod pipeline;
pub mod source;
pub mod table;
pub mod types;

// Re-exports - Core types
pub use error::{FeatureError, Result};
pub use types::{FeatureRow, Level, LevelSet, OrderBookSnapshot, Side};

// Re-exports - Configuration
pub use config::{ExtractorConfig, TimeDiscretization};

// Re-exports - Pipeline
pub use pipeline::{
    ChangeDetector, DepthCheck, FeaturePipeline, LabelAssigner, LevelExtractor, PipelineStats,
    SnapshotFilter,
};

// Re-exports - Table and persistence
pub use persist::{read_table, Persister};
pub use table::{Column, FeatureTable};

// Re-exports - Upstream collaborators
pub use metadata::{
    JsonTradeCountLookup, StaticTradeCountLookup, StreamRequest, TradeCountEntry,
    TradeCountLookup, TradeCountRecord,
};
pub use source::{JsonLinesSource, SnapshotStreamFactory, SourceMetadata, VecSource};

// Re-exports - Orchestration
pub use job::{ExtractionJob, RunSummary};
