use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

use ordered_float::NotNan;
use thiserror::Error;

/// Errors produced when constructing an [`Interval`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IntervalError {
    #[error("Interval bound cannot be NaN")]
    NanBound,

    #[error("Interval start {0} cannot be negative")]
    NegativeStart(f64),

    #[error("Interval end {end} is less than interval start {start}")]
    Empty { start: f64, end: f64 },
}

/// Closed time bound `[start, end]` for temporal operators.
///
/// Both endpoints are always included. A bounded future operator evaluated at time `t` considers
/// every time in `[t + start, t + end]`, while a bounded past operator considers every time in
/// `[t - end, t - start]`. The end of the interval may be infinite.
///
/// Intervals are validated when they are created, so an operator holding an `Interval` never fails
/// because of its bounds.
///
/// ```rust
/// use banquo_spatial::Interval;
///
/// let interval = Interval::new(0.0, 2.5).unwrap();
/// assert_eq!(interval.to_string(), "[0, 2.5]");
///
/// assert!(Interval::new(2.0, 1.0).is_err());
/// assert!(Interval::new(-1.0, 1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    start: f64,
    end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Result<Self, IntervalError> {
        let start = NotNan::new(start).map_err(|_| IntervalError::NanBound)?;
        let end = NotNan::new(end).map_err(|_| IntervalError::NanBound)?;

        if *start < 0.0 {
            return Err(IntervalError::NegativeStart(start.into_inner()));
        }

        if end < start {
            return Err(IntervalError::Empty {
                start: start.into_inner(),
                end: end.into_inner(),
            });
        }

        Ok(Self {
            start: start.into_inner(),
            end: end.into_inner(),
        })
    }

    /// Interval `[0, +inf]` covering the whole future or past.
    pub fn unbounded() -> Self {
        Self {
            start: 0.0,
            end: f64::INFINITY,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

impl TryFrom<RangeInclusive<f64>> for Interval {
    type Error = IntervalError;

    fn try_from(range: RangeInclusive<f64>) -> Result<Self, Self::Error> {
        let (start, end) = range.into_inner();
        Self::new(start, end)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
