use crate::interval::Interval;
use crate::signal::Signal;

use super::Update;

/// Times of the input that the output of an operator depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Horizon {
    /// The output at `t` depends on the input at `t`.
    Pointwise,

    /// The output at `t` depends on the input over `[t + a, t + b]`.
    Future(Interval),

    /// The output at `t` depends on the input over `[t - b, t - a]`.
    Past(Interval),
}

impl Horizon {
    /// Range of the output that must be recomputed after the input changed over `[start, end)`.
    pub(crate) fn affected(&self, start: f64, end: f64) -> Option<(f64, f64)> {
        let (from, to) = match self {
            Self::Pointwise => (start, end),
            Self::Future(interval) => {
                (f64::max(0.0, start - interval.end()), end - interval.start())
            }
            Self::Past(interval) => (start + interval.start(), end + interval.end()),
        };

        (from < to).then_some((from, to))
    }

    /// Portion of the input needed to compute the output over `[from, to)`.
    pub(crate) fn inputs(&self, from: f64, to: f64) -> (f64, f64) {
        match self {
            Self::Pointwise => (from, to),
            Self::Future(interval) => (from, to + interval.end()),
            Self::Past(interval) => (f64::max(0.0, from - interval.end()), to),
        }
    }
}

/// Split the part of `signal` inside of `[from, to)` into one update per segment.
pub(crate) fn updates<V: Clone>(signal: &Signal<V>, from: f64, to: f64) -> Vec<Update<V>> {
    signal
        .iter()
        .enumerate()
        .filter(|(index, segment)| segment.time() < signal.segment_end(*index))
        .filter_map(|(index, segment)| {
            Update::unchecked(segment.time(), signal.segment_end(index), segment.value().clone())
                .clip(from, to)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{updates, Horizon};
    use crate::interval::Interval;
    use crate::online::Update;
    use crate::signal::Signal;

    #[test]
    fn affected_ranges() -> Result<(), Box<dyn Error>> {
        let interval = Interval::new(1.0, 3.0)?;

        assert_eq!(Horizon::Pointwise.affected(2.0, 4.0), Some((2.0, 4.0)));
        assert_eq!(Horizon::Future(interval).affected(5.0, 6.0), Some((2.0, 5.0)));
        assert_eq!(Horizon::Future(interval).affected(1.0, 2.0), Some((0.0, 1.0)));
        assert_eq!(Horizon::Future(interval).affected(0.0, 1.0), None);
        assert_eq!(Horizon::Past(interval).affected(0.0, 1.0), Some((1.0, 4.0)));
        assert_eq!(
            Horizon::Past(Interval::unbounded()).affected(2.0, 3.0),
            Some((2.0, f64::INFINITY))
        );
        assert_eq!(Horizon::Future(Interval::unbounded()).affected(2.0, 3.0), Some((0.0, 3.0)));

        Ok(())
    }

    #[test]
    fn input_ranges() -> Result<(), Box<dyn Error>> {
        let interval = Interval::new(1.0, 3.0)?;

        assert_eq!(Horizon::Future(interval).inputs(2.0, 5.0), (2.0, 8.0));
        assert_eq!(Horizon::Past(interval).inputs(1.0, 4.0), (0.0, 4.0));
        assert_eq!(Horizon::Past(interval).inputs(5.0, 6.0), (2.0, 6.0));

        Ok(())
    }

    #[test]
    fn signal_updates() -> Result<(), Box<dyn Error>> {
        let signal = Signal::from_samples([(0.0, 1), (2.0, 2), (4.0, 3)])?;

        assert_eq!(
            updates(&signal, 1.0, 10.0),
            vec![Update::new(1.0, 2.0, 1)?, Update::new(2.0, 4.0, 2)?]
        );
        assert!(updates(&signal, 4.0, 10.0).is_empty());

        Ok(())
    }
}
