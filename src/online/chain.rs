use nonempty::NonEmpty;

use crate::signal::{Segment, Signal};

use super::{OnlineError, Update};

/// Contiguous run of segments covering `[start, end)` without gaps.
///
/// Segment `i` holds from its own time until the time of segment `i + 1`, and the last segment
/// holds until the end of the chain. Adjacent segments never hold equal values. A chain always
/// contains at least one segment, so disjoint runs of knowledge are represented by separate
/// chains.
///
/// ```rust
/// use banquo_spatial::online::{TimeChain, Update};
///
/// let mut chain = TimeChain::from_update(Update::new(0.0, 2.0, 1).unwrap());
/// chain.push(Update::new(2.0, 3.0, 1).unwrap()).unwrap();
/// chain.push(Update::new(3.0, 5.0, 4).unwrap()).unwrap();
///
/// assert_eq!(chain.len(), 2);
/// assert_eq!(chain.value_at(2.5), Some(&1));
/// assert_eq!(chain.value_at(5.0), None);
/// assert!(chain.push(Update::new(6.0, 7.0, 0).unwrap()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TimeChain<V> {
    segments: NonEmpty<Segment<V>>,
    end: f64,
}

impl<V> TimeChain<V> {
    /// Create a chain holding a single value over the range of the update.
    pub fn from_update(update: Update<V>) -> Self {
        let (start, end) = (update.start(), update.end());

        Self {
            segments: NonEmpty::new(Segment::new(start, update.into_value())),
            end,
        }
    }

    pub fn start(&self) -> f64 {
        self.segments.head.time()
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment<V>> + '_ {
        self.segments.iter()
    }

    /// Iterate over the segments as `(start, end, value)` triples.
    pub fn spans(&self) -> impl Iterator<Item = (f64, f64, &V)> + '_ {
        let ends = self
            .segments
            .iter()
            .skip(1)
            .map(Segment::time)
            .chain(std::iter::once(self.end));

        self.segments
            .iter()
            .zip(ends)
            .map(|(segment, end)| (segment.time(), end, segment.value()))
    }

    /// The value holding at `time`, or `None` outside of `[start, end)`.
    pub fn value_at(&self, time: f64) -> Option<&V> {
        if !(self.start() <= time && time < self.end) {
            return None;
        }

        let tail = &self.segments.tail;
        let segment = match tail.partition_point(|segment| segment.time() <= time) {
            0 => &self.segments.head,
            index => &tail[index - 1],
        };

        Some(segment.value())
    }
}

impl<V: PartialEq> TimeChain<V> {
    /// Extend the chain with an update starting exactly where the chain ends.
    pub fn push(&mut self, update: Update<V>) -> Result<(), OnlineError> {
        if update.start() != self.end {
            return Err(OnlineError::Gap {
                end: self.end,
                start: update.start(),
            });
        }

        let (start, end) = (update.start(), update.end());
        let value = update.into_value();

        if self.segments.last().value() != &value {
            self.segments.push(Segment::new(start, value));
        }

        self.end = end;
        Ok(())
    }

    /// Create a chain from contiguous updates, failing on an empty sequence or on a gap.
    pub fn from_updates<I>(updates: I) -> Result<Self, OnlineError>
    where
        I: IntoIterator<Item = Update<V>>,
    {
        let mut updates = updates.into_iter();
        let mut chain = updates.next().map(Self::from_update).ok_or(OnlineError::EmptyChain)?;

        for update in updates {
            chain.push(update)?;
        }

        Ok(chain)
    }
}

impl<V: Clone> TimeChain<V> {
    /// Split the chain into one update per segment.
    pub fn to_updates(&self) -> Vec<Update<V>> {
        self.between(self.start(), self.end)
    }

    /// The updates describing the chain inside of `[from, to)`.
    pub fn between(&self, from: f64, to: f64) -> Vec<Update<V>> {
        self.spans()
            .filter_map(|(start, end, value)| {
                Update::unchecked(start, end, value.clone()).clip(from, to)
            })
            .collect()
    }
}

impl<V: Clone + PartialEq> TimeChain<V> {
    /// Convert the portion of the chain inside of `[from, to]` into an offline signal ending at
    /// `to`.
    pub fn to_signal(&self, from: f64, to: f64) -> Signal<V> {
        let mut signal = Signal::new();
        let to = f64::min(to, self.end);

        if from > to {
            return signal;
        }

        for (start, end, value) in self.spans() {
            if end > from && start <= to {
                signal.push(f64::max(start, from), value.clone());
            }
        }

        signal.close(to);
        signal
    }
}

impl<V> From<TimeChain<V>> for Vec<Segment<V>> {
    fn from(chain: TimeChain<V>) -> Self {
        Vec::from(chain.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::TimeChain;
    use crate::online::{OnlineError, Update};
    use crate::signal::Segment;

    fn chain() -> Result<TimeChain<i32>, OnlineError> {
        TimeChain::from_updates([
            Update::new(0.0, 1.0, 1)?,
            Update::new(1.0, 3.0, 2)?,
            Update::new(3.0, 4.0, 2)?,
            Update::new(4.0, 6.0, 5)?,
        ])
    }

    #[test]
    fn construction() -> Result<(), OnlineError> {
        let chain = chain()?;

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.start(), 0.0);
        assert_eq!(chain.end(), 6.0);
        assert_eq!(chain.value_at(3.5), Some(&2));
        assert_eq!(chain.value_at(-1.0), None);
        assert_eq!(chain.value_at(f64::NAN), None);
        assert_eq!(
            TimeChain::<i32>::from_updates([]),
            Err(OnlineError::EmptyChain)
        );
        assert_eq!(
            TimeChain::from_updates([Update::new(0.0, 1.0, 1)?, Update::new(2.0, 3.0, 1)?]),
            Err(OnlineError::Gap { end: 1.0, start: 2.0 })
        );

        let segments: Vec<Segment<i32>> = chain.into();
        assert_eq!(segments.iter().map(Segment::time).collect::<Vec<_>>(), vec![0.0, 1.0, 4.0]);

        Ok(())
    }

    #[test]
    fn lookup_at_boundaries() -> Result<(), OnlineError> {
        let chain = chain()?;

        assert_eq!(chain.value_at(0.0), Some(&1));
        assert_eq!(chain.value_at(0.999), Some(&1));
        assert_eq!(chain.value_at(1.0), Some(&2));
        assert_eq!(chain.value_at(3.0), Some(&2));
        assert_eq!(chain.value_at(4.0), Some(&5));
        assert_eq!(chain.value_at(5.999), Some(&5));
        assert_eq!(chain.value_at(6.0), None);

        let single = TimeChain::from_update(Update::new(2.0, 3.0, 7)?);
        assert_eq!(single.value_at(2.5), Some(&7));
        assert_eq!(single.value_at(1.5), None);

        Ok(())
    }

    #[test]
    fn updates() -> Result<(), OnlineError> {
        let chain = chain()?;

        assert_eq!(
            chain.to_updates(),
            vec![
                Update::new(0.0, 1.0, 1)?,
                Update::new(1.0, 4.0, 2)?,
                Update::new(4.0, 6.0, 5)?,
            ]
        );
        assert_eq!(
            chain.between(0.5, 4.5),
            vec![
                Update::new(0.5, 1.0, 1)?,
                Update::new(1.0, 4.0, 2)?,
                Update::new(4.0, 4.5, 5)?,
            ]
        );
        assert_eq!(TimeChain::from_updates(chain.to_updates())?, chain);

        Ok(())
    }

    #[test]
    fn signal_conversion() -> Result<(), OnlineError> {
        let signal = chain()?.to_signal(2.0, 10.0);

        assert_eq!(signal.start(), Some(2.0));
        assert_eq!(signal.end(), Some(6.0));
        assert_eq!(signal.value_at(2.0), Some(&2));
        assert_eq!(signal.value_at(4.0), Some(&5));
        assert_eq!(signal.len(), 2);

        Ok(())
    }
}
