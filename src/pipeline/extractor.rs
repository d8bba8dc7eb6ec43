//! Top-N level extraction and mid-price.

use crate::types::{LevelSet, OrderBookSnapshot};

/// Levels and mid-price pulled from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLevels {
    /// Top-N asks, ascending
    pub asks: LevelSet,
    /// Top-N bids, descending
    pub bids: LevelSet,
    /// `|best_ask + best_bid| / 2`
    pub mid_price: f64,
}

/// Slices the first N levels of each side.
#[derive(Debug, Clone, Copy)]
pub struct LevelExtractor {
    depth: usize,
}

impl LevelExtractor {
    /// Create an extractor for `depth` levels.
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Number of levels extracted per side.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Mid-price as the magnitude of the summed best prices, halved.
    ///
    /// Kept literally: it equals the plain mean only for positive prices.
    #[inline]
    pub fn mid_price(best_ask: f64, best_bid: f64) -> f64 {
        (best_ask + best_bid).abs() / 2.0
    }

    /// Extract levels from a snapshot that already passed the depth filter.
    ///
    /// Returns `None` if either side is empty.
    pub fn extract(&self, snapshot: &OrderBookSnapshot) -> Option<ExtractedLevels> {
        let asks = LevelSet::top(snapshot.asks(), self.depth);
        let bids = LevelSet::top(snapshot.bids(), self.depth);
        let mid_price = Self::mid_price(asks.best()?.price, bids.best()?.price);

        Some(ExtractedLevels {
            asks,
            bids,
            mid_price,
        })
    }
}
