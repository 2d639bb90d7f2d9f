use std::collections::VecDeque;

use super::{OnlineError, Update};

/// Merge-join of two streams of updates.
///
/// Updates are pushed on either side in time order. [`ChainsCombinator::combine`] emits the
/// combination of both sides over every range where both are known, consuming an update once
/// the other side has caught up with its end. The unconsumed remainder of either side is kept for
/// the next call, so the combinator can be fed incrementally.
///
/// ```rust
/// use banquo_spatial::online::{ChainsCombinator, Update};
///
/// let mut combinator = ChainsCombinator::new();
/// combinator.push_left(Update::new(0.0, 4.0, 1).unwrap()).unwrap();
/// combinator.push_right(Update::new(0.0, 2.0, 10).unwrap()).unwrap();
///
/// let combined = combinator.combine(|l, r| l + r);
/// assert_eq!(combined, vec![Update::new(0.0, 2.0, 11).unwrap()]);
///
/// combinator.push_right(Update::new(2.0, 5.0, 20).unwrap()).unwrap();
/// let combined = combinator.combine(|l, r| l + r);
/// assert_eq!(combined, vec![Update::new(2.0, 4.0, 21).unwrap()]);
/// ```
#[derive(Debug, Clone)]
pub struct ChainsCombinator<L, R> {
    left: VecDeque<Update<L>>,
    right: VecDeque<Update<R>>,
}

fn push<V>(queue: &mut VecDeque<Update<V>>, update: Update<V>) -> Result<(), OnlineError> {
    match queue.back() {
        Some(last) if update.start() < last.end() => Err(OnlineError::OutOfOrder {
            previous: last.end(),
            start: update.start(),
        }),
        _ => {
            queue.push_back(update);
            Ok(())
        }
    }
}

impl<L, R> ChainsCombinator<L, R> {
    pub fn new() -> Self {
        Self {
            left: VecDeque::new(),
            right: VecDeque::new(),
        }
    }

    pub fn push_left(&mut self, update: Update<L>) -> Result<(), OnlineError> {
        push(&mut self.left, update)
    }

    pub fn push_right(&mut self, update: Update<R>) -> Result<(), OnlineError> {
        push(&mut self.right, update)
    }

    /// Number of updates waiting on each side.
    pub fn pending(&self) -> (usize, usize) {
        (self.left.len(), self.right.len())
    }

    /// Combine both sides over the ranges where they overlap.
    ///
    /// Consecutive outputs holding equal values are merged.
    pub fn combine<V, F>(&mut self, f: F) -> Vec<Update<V>>
    where
        V: PartialEq,
        F: Fn(&L, &R) -> V,
    {
        let mut combined: Vec<Update<V>> = Vec::new();

        while let (Some(left), Some(right)) = (self.left.front(), self.right.front()) {
            let start = f64::max(left.start(), right.start());
            let end = f64::min(left.end(), right.end());

            if start < end {
                let value = f(left.value(), right.value());

                match combined.last_mut() {
                    Some(last) if last.end() == start && last.value() == &value => {
                        *last = Update::unchecked(last.start(), end, value);
                    }
                    _ => combined.push(Update::unchecked(start, end, value)),
                }
            }

            let (left_end, right_end) = (left.end(), right.end());

            if left_end <= right_end {
                self.left.pop_front();
            }

            if right_end <= left_end {
                self.right.pop_front();
            }
        }

        combined
    }
}

impl<L, R> Default for ChainsCombinator<L, R> {
    fn default() -> Self {
        Self::new()
    }
}
