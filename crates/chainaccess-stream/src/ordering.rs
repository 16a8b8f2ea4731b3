//! Sequence-index validation for streams that number their messages.

use chainaccess_core::OrderingError;

/// Next expected message index of one subscription.
///
/// Owned by the subscription's background task; never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceState {
    /// `None` once `u64::MAX` has been accepted.
    next_expected: Option<u64>,
}

impl SequenceState {
    pub fn new(start: u64) -> Self {
        Self {
            next_expected: Some(start),
        }
    }

    pub fn next_expected(&self) -> Option<u64> {
        self.next_expected
    }

    /// Accept `observed` if it is exactly the next expected index.
    ///
    /// On failure the state is left untouched.
    pub fn check_and_advance(&mut self, observed: u64) -> Result<(), OrderingError> {
        let expected = self
            .next_expected
            .ok_or(OrderingError::Exhausted { observed })?;
        if observed != expected {
            return Err(OrderingError::OutOfOrder { expected, observed });
        }
        self.next_expected = expected.checked_add(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_consecutive_indices() {
        let mut s = SequenceState::new(10);
        for i in 10..20 {
            s.check_and_advance(i).unwrap();
        }
        assert_eq!(s.next_expected(), Some(20));
    }

    #[test]
    fn first_index_must_match_start() {
        let mut s = SequenceState::new(0);
        assert_eq!(
            s.check_and_advance(1),
            Err(OrderingError::OutOfOrder {
                expected: 0,
                observed: 1
            })
        );
    }

    #[test]
    fn gap_duplicate_and_regression_fail_without_advancing() {
        for bad in [13, 11, 5] {
            let mut s = SequenceState::new(10);
            s.check_and_advance(10).unwrap();
            s.check_and_advance(11).unwrap();
            let err = s.check_and_advance(bad).unwrap_err();
            assert_eq!(
                err,
                OrderingError::OutOfOrder {
                    expected: 12,
                    observed: bad
                }
            );
            assert_eq!(s.next_expected(), Some(12));
        }
    }

    #[test]
    fn exhausted_after_max() {
        let mut s = SequenceState::new(u64::MAX);
        s.check_and_advance(u64::MAX).unwrap();
        assert_eq!(s.next_expected(), None);
        assert_eq!(
            s.check_and_advance(0),
            Err(OrderingError::Exhausted { observed: 0 })
        );
    }
}
