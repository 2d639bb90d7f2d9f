use std::fmt::{Debug, Formatter};

use crate::domain::{AbstractInterval, IntervalDomain, SignalDomain};
use crate::signal::Signal;

use super::{OnlineError, TimeChain, Update};

/// Interval-valued signal that is refined as knowledge arrives.
///
/// The signal covers `[0, +inf)` and starts out holding `[min, max]` of the inner domain, meaning
/// that nothing is known. Each call to [`OnlineSignal::refine`] narrows the value over the range
/// of an update, so the interval known for any time only ever shrinks.
///
/// ```rust
/// use banquo_spatial::domain::{AbstractInterval, DoubleDomain};
/// use banquo_spatial::online::{OnlineSignal, Update};
///
/// let mut signal = OnlineSignal::new(DoubleDomain);
/// let update = Update::new(2.0, 3.0, AbstractInterval::new(4.0, 6.0).unwrap()).unwrap();
/// let changes = signal.refine(&update).unwrap();
///
/// assert_eq!(changes, vec![update]);
/// assert_eq!(signal.chain().len(), 3);
///
/// let weaker = Update::new(2.5, 3.0, AbstractInterval::new(0.0, 9.0).unwrap()).unwrap();
/// assert!(signal.refine(&weaker).unwrap().is_empty());
/// ```
pub struct OnlineSignal<D: SignalDomain> {
    domain: IntervalDomain<D>,
    chain: TimeChain<AbstractInterval<D::Value>>,
}

type Interval<D> = AbstractInterval<<D as SignalDomain>::Value>;

impl<D> OnlineSignal<D>
where
    D: SignalDomain,
    D::Value: PartialOrd,
{
    pub fn new(domain: D) -> Self {
        let domain = IntervalDomain::new(domain);
        let unknown = Update::unchecked(0.0, f64::INFINITY, domain.unknown());

        Self {
            domain,
            chain: TimeChain::from_update(unknown),
        }
    }

    pub fn domain(&self) -> &IntervalDomain<D> {
        &self.domain
    }

    pub fn chain(&self) -> &TimeChain<Interval<D>> {
        &self.chain
    }

    pub fn value_at(&self, time: f64) -> Option<&Interval<D>> {
        self.chain.value_at(time)
    }

    /// Convert the whole signal into an offline signal.
    pub fn to_signal(&self) -> Signal<Interval<D>> {
        self.chain.to_signal(self.chain.start(), self.chain.end())
    }

    /// Narrow the signal over the range of `update` and return the ranges whose value changed.
    ///
    /// Each overlapping segment takes the intersection of its value with the value of the update.
    /// When the two values are disjoint the update is inconsistent with what is already known and
    /// a warning is logged. A point update then replaces the known value, while any other update
    /// is ignored over that segment, so refining never widens a value.
    pub fn refine(
        &mut self,
        update: &Update<Interval<D>>,
    ) -> Result<Vec<Update<Interval<D>>>, OnlineError> {
        let mut refined: Vec<Update<Interval<D>>> = Vec::with_capacity(self.chain.len() + 2);
        let mut changes: Vec<Update<Interval<D>>> = Vec::new();

        for (start, end, value) in self.chain.spans() {
            let from = f64::max(start, update.start());
            let to = f64::min(end, update.end());

            if from >= to {
                refined.push(Update::unchecked(start, end, value.clone()));
                continue;
            }

            if start < from {
                refined.push(Update::unchecked(start, from, value.clone()));
            }

            let narrowed = match value.intersect(update.value()) {
                Some(narrowed) => narrowed,
                None if update.value().is_point() => {
                    tracing::warn!(
                        start = from,
                        end = to,
                        known = ?value,
                        update = ?update.value(),
                        "Inconsistent update, replacing known value"
                    );
                    update.value().clone()
                }
                None => {
                    tracing::warn!(
                        start = from,
                        end = to,
                        known = ?value,
                        update = ?update.value(),
                        "Inconsistent update, keeping known value"
                    );
                    value.clone()
                }
            };

            if !self.domain.equal_to(&narrowed, value) {
                match changes.last_mut() {
                    Some(last) if last.end() == from && last.value() == &narrowed => {
                        *last = Update::unchecked(last.start(), to, narrowed.clone());
                    }
                    _ => changes.push(Update::unchecked(from, to, narrowed.clone())),
                }
            }

            refined.push(Update::unchecked(from, to, narrowed));

            if to < end {
                refined.push(Update::unchecked(to, end, value.clone()));
            }
        }

        if !changes.is_empty() {
            tracing::trace!(changes = changes.len(), "Refined online signal");
            self.chain = TimeChain::from_updates(refined)?;
        }

        Ok(changes)
    }
}

impl<D> Debug for OnlineSignal<D>
where
    D: SignalDomain,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnlineSignal").field("chain", &self.chain).finish()
    }
}

impl<D> Clone for OnlineSignal<D>
where
    D: SignalDomain,
{
    fn clone(&self) -> Self {
        Self {
            domain: self.domain,
            chain: self.chain.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::OnlineSignal;
    use crate::domain::{AbstractInterval, BooleanDomain, DoubleDomain};
    use crate::online::Update;

    type Knowledge = Update<AbstractInterval<f64>>;

    fn update(start: f64, end: f64, lower: f64, upper: f64) -> Result<Knowledge, Box<dyn Error>> {
        Ok(Update::new(start, end, AbstractInterval::new(lower, upper)?)?)
    }

    #[test]
    fn starts_unknown() -> Result<(), Box<dyn Error>> {
        let signal = OnlineSignal::new(BooleanDomain);

        assert_eq!(signal.value_at(0.0), Some(&AbstractInterval::new(false, true)?));
        assert_eq!(signal.chain().end(), f64::INFINITY);
        assert_eq!(signal.value_at(-1.0), None);

        Ok(())
    }

    #[test]
    fn refinement_splits_and_merges() -> Result<(), Box<dyn Error>> {
        let mut signal = OnlineSignal::new(DoubleDomain);

        signal.refine(&update(2.0, 3.0, 4.0, 6.0)?)?;
        let changes = signal.refine(&update(2.0, 5.0, 4.0, 6.0)?)?;

        assert_eq!(changes, vec![update(3.0, 5.0, 4.0, 6.0)?]);
        assert_eq!(signal.chain().len(), 3);
        assert_eq!(signal.value_at(4.5), Some(&AbstractInterval::new(4.0, 6.0)?));
        assert_eq!(signal.value_at(5.0), Some(&signal.domain().unknown()));

        Ok(())
    }

    #[test]
    fn inconsistent_point_wins() -> Result<(), Box<dyn Error>> {
        let mut signal = OnlineSignal::new(DoubleDomain);

        signal.refine(&update(2.0, 3.0, 4.0, 6.0)?)?;
        let changes = signal.refine(&update(2.0, 5.0, 8.0, 8.0)?)?;

        assert_eq!(changes, vec![update(2.0, 5.0, 8.0, 8.0)?]);
        assert_eq!(signal.value_at(2.0), Some(&AbstractInterval::point(8.0)));
        assert_eq!(signal.value_at(4.9), Some(&AbstractInterval::point(8.0)));
        assert_eq!(signal.chain().len(), 3);

        Ok(())
    }

    #[test]
    fn inconsistent_interval_is_ignored() -> Result<(), Box<dyn Error>> {
        let mut signal = OnlineSignal::new(DoubleDomain);

        signal.refine(&update(0.0, 1.0, 4.0, 4.0)?)?;
        let before = signal.chain().clone();

        assert!(signal.refine(&update(0.0, 1.0, 5.0, 9.0)?)?.is_empty());
        assert_eq!(signal.chain(), &before);
        assert_eq!(signal.value_at(0.5), Some(&AbstractInterval::point(4.0)));

        // Only the part of the update overlapping unknown values is kept.
        let changes = signal.refine(&update(0.0, 2.0, 5.0, 9.0)?)?;

        assert_eq!(changes, vec![update(1.0, 2.0, 5.0, 9.0)?]);
        assert_eq!(signal.value_at(0.5), Some(&AbstractInterval::point(4.0)));
        assert_eq!(signal.value_at(1.5), Some(&AbstractInterval::new(5.0, 9.0)?));

        Ok(())
    }

    #[test]
    fn redundant_updates_are_ignored() -> Result<(), Box<dyn Error>> {
        let mut signal = OnlineSignal::new(DoubleDomain);

        signal.refine(&update(0.0, 4.0, 1.0, 2.0)?)?;
        let before = signal.chain().clone();

        assert!(signal.refine(&update(1.0, 3.0, 0.0, 5.0)?)?.is_empty());
        assert!(signal.refine(&update(0.0, 4.0, 1.0, 2.0)?)?.is_empty());
        assert_eq!(signal.chain(), &before);

        Ok(())
    }
}
