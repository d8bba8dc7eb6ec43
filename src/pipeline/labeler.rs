//! Sequential bar labels.

/// Hands out 0, 1, 2, ... to retained rows.
///
/// The label is a sequence position only. It does not depend on the
/// configured time discretization.
#[derive(Debug, Clone, Default)]
pub struct LabelAssigner {
    next: u64,
}

impl LabelAssigner {
    /// Create an assigner starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current label and advance.
    #[inline]
    pub fn assign(&mut self) -> u64 {
        let label = self.next;
        self.next += 1;
        label
    }

    /// Label the next row will receive (also the number of labels handed out).
    #[inline]
    pub fn peek(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_sequential() {
        let mut labeler = LabelAssigner::new();
        let labels: Vec<u64> = (0..5).map(|_| labeler.assign()).collect();
        assert_eq!(labels, vec![0, 1, 2, 3, 4]);
        assert_eq!(labeler.peek(), 5);
    }
}
