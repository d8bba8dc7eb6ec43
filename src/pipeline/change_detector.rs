//! Suppression of snapshots whose top levels did not change.

use crate::types::{Level, LevelSet};

/// Remembers the top-N levels of the last retained snapshot.
///
/// The cache starts empty, so the first candidate is always retained.
/// Comparison is exact on every price and volume, in order.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    enabled: bool,
    last: Option<(LevelSet, LevelSet)>,
}

impl ChangeDetector {
    /// Create a detector. A disabled detector retains everything.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last: None,
        }
    }

    /// Whether deduplication is active.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Top levels of the last retained snapshot, if any.
    pub fn last(&self) -> Option<(&LevelSet, &LevelSet)> {
        self.last.as_ref().map(|(a, b)| (a, b))
    }

    /// Decide whether a candidate with these top levels is retained, and
    /// remember it if so.
    pub fn should_retain(&mut self, asks: &[Level], bids: &[Level]) -> bool {
        if !self.enabled {
            return true;
        }

        if let Some((last_asks, last_bids)) = &self.last {
            if last_asks.matches(asks) && last_bids.matches(bids) {
                return false;
            }
        }

        self.last = Some((LevelSet::from(asks.to_vec()), LevelSet::from(bids.to_vec())));
        true
    }

    /// Forget the cached levels.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
