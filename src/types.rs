//! Core data types for book snapshots and feature rows.
//!
//! Prices and volumes are `f64`: the upstream books quote fractional sizes
//! on a sub-cent tick, so fixed-point integers would only move the rounding
//! problem elsewhere. Equality on these types is exact.

use serde::{Deserialize, Serialize};

/// One price point on one side of the book.
///
/// Serialized as a compact `[price, volume]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Level {
    /// Price of the level
    pub price: f64,
    /// Resting volume at that price
    pub volume: f64,
}

impl Level {
    /// Create a new level.
    #[inline]
    pub fn new(price: f64, volume: f64) -> Self {
        Self { price, volume }
    }
}

impl From<(f64, f64)> for Level {
    fn from((price, volume): (f64, f64)) -> Self {
        Self { price, volume }
    }
}

impl From<Level> for (f64, f64) {
    fn from(level: Level) -> Self {
        (level.price, level.volume)
    }
}

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy side, natural order is descending price
    Bid,
    /// Sell side, natural order is ascending price
    Ask,
}

impl Side {
    /// Sort levels into this side's natural order (best price first).
    pub fn sort_levels(self, levels: &mut [Level]) {
        match self {
            Side::Ask => levels.sort_by(|a, b| a.price.total_cmp(&b.price)),
            Side::Bid => levels.sort_by(|a, b| b.price.total_cmp(&a.price)),
        }
    }

    /// Lowercase name used in column headers.
    pub fn name(self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

/// Complete picture of the book at one instant.
///
/// Produced by the replay collaborator; read-only for the pipeline.
/// Both sides are kept in natural order (asks ascending, bids descending),
/// which [`OrderBookSnapshot::new`] and deserialization enforce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotWire")]
pub struct OrderBookSnapshot {
    /// Timestamp (nanoseconds since epoch)
    pub timestamp: i64,
    /// Ask levels, lowest price first
    asks: Vec<Level>,
    /// Bid levels, highest price first
    bids: Vec<Level>,
}

/// Wire form of a snapshot; sides may arrive in any order.
#[derive(Deserialize)]
struct SnapshotWire {
    timestamp: i64,
    #[serde(default)]
    asks: Vec<Level>,
    #[serde(default)]
    bids: Vec<Level>,
}

impl From<SnapshotWire> for OrderBookSnapshot {
    fn from(wire: SnapshotWire) -> Self {
        OrderBookSnapshot::new(wire.timestamp, wire.asks, wire.bids)
    }
}

impl OrderBookSnapshot {
    /// Create a snapshot, sorting each side into its natural order.
    pub fn new(timestamp: i64, mut asks: Vec<Level>, mut bids: Vec<Level>) -> Self {
        Side::Ask.sort_levels(&mut asks);
        Side::Bid.sort_levels(&mut bids);
        Self {
            timestamp,
            asks,
            bids,
        }
    }

    /// Create a snapshot from sides the caller guarantees are already sorted.
    pub fn from_sorted(timestamp: i64, asks: Vec<Level>, bids: Vec<Level>) -> Self {
        debug_assert!(asks.windows(2).all(|w| w[0].price <= w[1].price));
        debug_assert!(bids.windows(2).all(|w| w[0].price >= w[1].price));
        Self {
            timestamp,
            asks,
            bids,
        }
    }

    /// Ask levels, ascending by price.
    #[inline]
    pub fn asks(&self) -> &[Level] {
        &self.asks
    }

    /// Bid levels, descending by price.
    #[inline]
    pub fn bids(&self) -> &[Level] {
        &self.bids
    }

    /// Levels of one side.
    #[inline]
    pub fn side(&self, side: Side) -> &[Level] {
        match side {
            Side::Ask => &self.asks,
            Side::Bid => &self.bids,
        }
    }

    /// Best (lowest) ask.
    #[inline]
    pub fn best_ask(&self) -> Option<Level> {
        self.asks.first().copied()
    }

    /// Best (highest) bid.
    #[inline]
    pub fn best_bid(&self) -> Option<Level> {
        self.bids.first().copied()
    }
}

/// The first N levels of one side of a snapshot, in that side's natural order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelSet(Vec<Level>);

impl LevelSet {
    /// Copy the first `depth` levels (or all, if fewer) of a side.
    pub fn top(levels: &[Level], depth: usize) -> Self {
        Self(levels[..depth.min(levels.len())].to_vec())
    }

    /// Number of levels held.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no levels are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Level at the top of the side.
    #[inline]
    pub fn best(&self) -> Option<Level> {
        self.0.first().copied()
    }

    /// Level at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Level> {
        self.0.get(index).copied()
    }

    /// All levels as a slice.
    #[inline]
    pub fn levels(&self) -> &[Level] {
        &self.0
    }

    /// Prices in order.
    pub fn prices(&self) -> Vec<f64> {
        self.0.iter().map(|l| l.price).collect()
    }

    /// Volumes in order.
    pub fn volumes(&self) -> Vec<f64> {
        self.0.iter().map(|l| l.volume).collect()
    }

    /// Exact element-wise comparison against a slice of levels.
    #[inline]
    pub fn matches(&self, levels: &[Level]) -> bool {
        self.0.as_slice() == levels
    }
}

impl From<Vec<Level>> for LevelSet {
    fn from(levels: Vec<Level>) -> Self {
        Self(levels)
    }
}

/// One emitted observation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    timestamp: i64,
    asks: LevelSet,
    bids: LevelSet,
    mid_price: f64,
    label: u64,
}

impl FeatureRow {
    /// Assemble a row from its parts.
    pub fn new(timestamp: i64, asks: LevelSet, bids: LevelSet, mid_price: f64, label: u64) -> Self {
        Self {
            timestamp,
            asks,
            bids,
            mid_price,
            label,
        }
    }

    /// Timestamp of the snapshot this row came from (nanoseconds since epoch).
    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Top-N ask levels.
    #[inline]
    pub fn asks(&self) -> &LevelSet {
        &self.asks
    }

    /// Top-N bid levels.
    #[inline]
    pub fn bids(&self) -> &LevelSet {
        &self.bids
    }

    /// `|best_ask + best_bid| / 2`.
    #[inline]
    pub fn mid_price(&self) -> f64 {
        self.mid_price
    }

    /// Bar label (sequence position among retained rows).
    #[inline]
    pub fn label(&self) -> u64 {
        self.label
    }
}
