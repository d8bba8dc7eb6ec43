//! Depth filter: drops snapshots that cannot fill N levels on both sides.

use crate::types::OrderBookSnapshot;

/// Outcome of the depth check for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthCheck {
    /// Both sides have at least N levels
    Sufficient,
    /// One or both sides have no levels at all
    EmptySide,
    /// Both sides quoted, but at least one has fewer than N levels
    Insufficient {
        /// Ask levels available
        asks: usize,
        /// Bid levels available
        bids: usize,
    },
}

impl DepthCheck {
    /// Returns true if the snapshot may continue down the pipeline.
    #[inline]
    pub fn is_sufficient(&self) -> bool {
        matches!(self, DepthCheck::Sufficient)
    }
}

/// Accepts only snapshots with at least `depth` levels on each side.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotFilter {
    depth: usize,
}

impl SnapshotFilter {
    /// Create a filter requiring `depth` levels per side.
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Required depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Classify a snapshot.
    #[inline]
    pub fn check(&self, snapshot: &OrderBookSnapshot) -> DepthCheck {
        let asks = snapshot.asks().len();
        let bids = snapshot.bids().len();

        if asks == 0 || bids == 0 {
            DepthCheck::EmptySide
        } else if asks < self.depth || bids < self.depth {
            DepthCheck::Insufficient { asks, bids }
        } else {
            DepthCheck::Sufficient
        }
    }

    /// Returns true if the snapshot passes.
    #[inline]
    pub fn accepts(&self, snapshot: &OrderBookSnapshot) -> bool {
        self.check(snapshot).is_sufficient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;

    fn book(asks: usize, bids: usize) -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            0,
            (0..asks).map(|i| Level::new(101.0 + i as f64, 1.0)).collect(),
            (0..bids).map(|i| Level::new(100.0 - i as f64, 1.0)).collect(),
        )
    }

    #[test]
    fn test_sufficient_depth() {
        let filter = SnapshotFilter::new(2);
        assert_eq!(filter.check(&book(2, 2)), DepthCheck::Sufficient);
        assert_eq!(filter.check(&book(5, 3)), DepthCheck::Sufficient);
        assert!(filter.accepts(&book(2, 2)));
    }

    #[test]
    fn test_empty_side() {
        let filter = SnapshotFilter::new(1);
        assert_eq!(filter.check(&book(0, 3)), DepthCheck::EmptySide);
        assert_eq!(filter.check(&book(3, 0)), DepthCheck::EmptySide);
        assert_eq!(filter.check(&book(0, 0)), DepthCheck::EmptySide);
    }

    #[test]
    fn test_insufficient_depth() {
        let filter = SnapshotFilter::new(2);
        assert_eq!(
            filter.check(&book(1, 2)),
            DepthCheck::Insufficient { asks: 1, bids: 2 }
        );
        assert_eq!(
            filter.check(&book(4, 1)),
            DepthCheck::Insufficient { asks: 4, bids: 1 }
        );
        assert!(!filter.accepts(&book(1, 2)));
    }
}
