//! Piecewise-constant signals.
//!
//! A [`Signal`] is a sequence of [`Segment`]s, each holding a value starting at a given time, along
//! with an end time for the whole signal. Segment `i` holds from its own time until the time of
//! segment `i + 1`, and the last segment holds until the end of the signal inclusive. Signals are
//! always kept in canonical form: segment times are strictly increasing and no two consecutive
//! segments hold the same value.
//!
//! ```rust
//! use banquo_spatial::Signal;
//!
//! let mut signal = Signal::new();
//! signal.add(0.0, 1.0).unwrap();
//! signal.add(1.0, 1.0).unwrap();  // Same value, extends the first segment
//! signal.add(2.0, 3.0).unwrap();
//!
//! assert_eq!(signal.len(), 2);
//! assert_eq!(signal.value_at(1.5), Some(&1.0));
//! assert_eq!(signal.value_at(2.0), Some(&3.0));
//! assert_eq!(signal.value_at(2.5), None);
//! ```
//!
//! Signals can be combined pointwise using [`Signal::apply`] and [`Signal::apply_binary`]. The
//! binary version merges the change points of both signals and is defined over the intersection
//! of their time domains.
//!
//! Multi-location signals are represented using a [`SpatialTemporalSignal`], which holds one
//! signal per location of a spatial model.

use std::iter::Rev;
use std::slice::Iter;

use ordered_float::NotNan;
use thiserror::Error;

/// Errors produced while building signals from samples.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SignalError {
    #[error("Signal time cannot be NaN")]
    NanTime,

    #[error("Time {time} does not come after previous time {previous}")]
    NonMonotonic { previous: f64, time: f64 },

    #[error("Signal end {end} precedes the start of the last segment {last}")]
    EndBeforeLastSegment { last: f64, end: f64 },

    #[error("Expected values for {expected} locations, found {found}")]
    LocationMismatch { expected: usize, found: usize },
}

fn checked(time: f64) -> Result<f64, SignalError> {
    NotNan::new(time)
        .map(NotNan::into_inner)
        .map_err(|_| SignalError::NanTime)
}

/// A single change point of a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<T> {
    time: f64,
    value: T,
}

impl<T> Segment<T> {
    pub fn new(time: f64, value: T) -> Self {
        Self { time, value }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Piecewise-constant function of time stored as compressed change points.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal<T> {
    segments: Vec<Segment<T>>,
    end: f64,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    /// Create a new empty signal.
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            end: f64::NEG_INFINITY,
        }
    }

    /// The number of segments in the signal.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The time of the first segment, or `None` if the signal is empty.
    pub fn start(&self) -> Option<f64> {
        self.segments.first().map(Segment::time)
    }

    /// The last time the signal is defined at, or `None` if the signal is empty.
    pub fn end(&self) -> Option<f64> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.end)
        }
    }

    pub fn segments(&self) -> &[Segment<T>] {
        &self.segments
    }

    pub fn iter(&self) -> Iter<'_, Segment<T>> {
        self.segments.iter()
    }

    /// Iterate over the segments from the latest to the earliest.
    pub fn iter_backward(&self) -> Rev<Iter<'_, Segment<T>>> {
        self.segments.iter().rev()
    }

    pub fn times(&self) -> impl DoubleEndedIterator<Item = f64> + '_ {
        self.segments.iter().map(Segment::time)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.segments.iter().map(Segment::value)
    }

    /// The time at which the segment with the given index stops holding.
    pub fn segment_end(&self, index: usize) -> f64 {
        self.segments
            .get(index + 1)
            .map(Segment::time)
            .unwrap_or(self.end)
    }

    /// Return the value of the last segment starting at or before `time`.
    ///
    /// Returns `None` if `time` is outside of the domain of the signal.
    pub fn value_at(&self, time: f64) -> Option<&T> {
        if self.segments.is_empty() || time > self.end {
            return None;
        }

        let index = self.segments.partition_point(|segment| segment.time <= time);
        index.checked_sub(1).map(|index| &self.segments[index].value)
    }

    /// Create a cursor positioned on the first segment, or `None` if the signal is empty.
    pub fn cursor(&self) -> Option<SignalCursor<'_, T>> {
        if self.segments.is_empty() {
            None
        } else {
            Some(SignalCursor {
                signal: self,
                index: 0,
            })
        }
    }

    /// Set the end of the signal, which cannot come before the start of the last segment.
    pub fn end_at(&mut self, end: f64) -> Result<(), SignalError> {
        let end = checked(end)?;

        if let Some(last) = self.segments.last() {
            if end < last.time {
                return Err(SignalError::EndBeforeLastSegment {
                    last: last.time,
                    end,
                });
            }
        }

        self.end = end;
        Ok(())
    }

    pub(crate) fn close(&mut self, end: f64) {
        if let Some(last) = self.segments.last() {
            self.end = f64::max(end, last.time);
        }
    }

    /// Create a new signal by applying `f` to the value of every segment.
    pub fn apply<U, F>(&self, f: F) -> Signal<U>
    where
        U: PartialEq,
        F: Fn(&T) -> U,
    {
        self.apply_timed(|_, value| f(value))
    }

    /// Create a new signal by applying `f` to the start time and the value of every segment.
    ///
    /// The value of each segment is computed once, at the time the segment starts.
    pub fn apply_timed<U, F>(&self, f: F) -> Signal<U>
    where
        U: PartialEq,
        F: Fn(f64, &T) -> U,
    {
        let mut output = Signal::new();

        for segment in &self.segments {
            output.push(segment.time, f(segment.time, &segment.value));
        }

        output.close(self.end);
        output
    }

    /// Combine two signals pointwise.
    ///
    /// The output is defined over the intersection of the two time domains and has a change point
    /// wherever either input has one. An empty signal is returned when the domains are disjoint.
    pub fn apply_binary<U, V, F>(&self, other: &Signal<U>, f: F) -> Signal<V>
    where
        V: PartialEq,
        F: Fn(&T, &U) -> V,
    {
        let mut output = Signal::new();

        let (mut left, mut right) = match (self.cursor(), other.cursor()) {
            (Some(left), Some(right)) => (left, right),
            _ => return output,
        };

        let start = f64::max(left.time(), right.time());
        let end = f64::min(self.end, other.end);

        if start > end {
            return output;
        }

        let mut time = start;

        loop {
            left.move_to(time);
            right.move_to(time);
            output.push(time, f(left.value(), right.value()));

            let next = match (left.next_time(), right.next_time()) {
                (Some(l), Some(r)) => f64::min(l, r),
                (Some(l), None) => l,
                (None, Some(r)) => r,
                (None, None) => break,
            };

            if next > end {
                break;
            }

            time = next;
        }

        output.close(end);
        output
    }
}

impl<T: PartialEq> Signal<T> {
    /// Create a signal from `(time, value)` samples with strictly increasing times.
    ///
    /// The end of the resulting signal is the time of the last sample.
    pub fn from_samples<I>(samples: I) -> Result<Self, SignalError>
    where
        I: IntoIterator<Item = (f64, T)>,
    {
        let mut signal = Self::new();

        for (time, value) in samples {
            signal.add(time, value)?;
        }

        Ok(signal)
    }

    /// Append a sample to the end of the signal.
    ///
    /// A new segment is only created if the value differs from the value of the last segment,
    /// otherwise the last segment is extended. In both cases the end of the signal moves to `time`,
    /// which must come after the current end.
    pub fn add(&mut self, time: f64, value: T) -> Result<(), SignalError> {
        let time = checked(time)?;

        if !self.segments.is_empty() && time <= self.end {
            return Err(SignalError::NonMonotonic {
                previous: self.end,
                time,
            });
        }

        self.push(time, value);
        self.end = time;
        Ok(())
    }

    // Callers guarantee that times are increasing.
    pub(crate) fn push(&mut self, time: f64, value: T) {
        match self.segments.last() {
            Some(last) if last.value == value => {}
            _ => self.segments.push(Segment { time, value }),
        }

        self.end = f64::max(self.end, time);
    }
}

impl<T: Clone + PartialEq> Signal<T> {
    /// Create a new signal containing only the portion of this signal over `[from, to]`.
    pub fn restrict(&self, from: f64, to: f64) -> Signal<T> {
        let mut output = Signal::new();

        let (start, end) = match (self.start(), self.end()) {
            (Some(start), Some(end)) => (f64::max(start, from), f64::min(end, to)),
            _ => return output,
        };

        if start > end {
            return output;
        }

        if let Some(value) = self.value_at(start) {
            output.push(start, value.clone());
        }

        for segment in &self.segments {
            if segment.time > start && segment.time <= end {
                output.push(segment.time, segment.value.clone());
            }
        }

        output.close(end);
        output
    }
}

impl<'a, T> IntoIterator for &'a Signal<T> {
    type Item = &'a Segment<T>;
    type IntoIter = Iter<'a, Segment<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// Forward-only position within a non-empty [`Signal`].
#[derive(Debug, Clone)]
pub struct SignalCursor<'a, T> {
    signal: &'a Signal<T>,
    index: usize,
}

impl<'a, T> SignalCursor<'a, T> {
    /// The start time of the current segment.
    pub fn time(&self) -> f64 {
        self.signal.segments[self.index].time
    }

    pub fn value(&self) -> &'a T {
        &self.signal.segments[self.index].value
    }

    /// The time of the next change point, if any.
    pub fn next_time(&self) -> Option<f64> {
        self.signal.segments.get(self.index + 1).map(Segment::time)
    }

    /// The end time of the underlying signal.
    pub fn end(&self) -> f64 {
        self.signal.end
    }

    /// Move to the next segment, returning false if the cursor is already on the last one.
    pub fn forward(&mut self) -> bool {
        if self.index + 1 < self.signal.segments.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Move forward to the segment holding at `time`. Cursors never move backward.
    pub fn move_to(&mut self, time: f64) {
        while matches!(self.next_time(), Some(next) if next <= time) {
            self.index += 1;
        }
    }

    /// True when the cursor is positioned on the last segment of the signal.
    pub fn is_completed(&self) -> bool {
        self.index + 1 >= self.signal.segments.len()
    }
}

/// A collection of signals, one for each location of a spatial model.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialTemporalSignal<T> {
    signals: Vec<Signal<T>>,
}

impl<T> SpatialTemporalSignal<T> {
    /// Create a signal with the given number of locations, all of them empty.
    pub fn new(locations: usize) -> Self {
        Self {
            signals: (0..locations).map(|_| Signal::new()).collect(),
        }
    }

    pub fn from_signals(signals: Vec<Signal<T>>) -> Self {
        Self { signals }
    }

    pub fn locations(&self) -> usize {
        self.signals.len()
    }

    pub fn signal(&self, location: usize) -> Option<&Signal<T>> {
        self.signals.get(location)
    }

    pub fn signals(&self) -> &[Signal<T>] {
        &self.signals
    }

    pub fn into_signals(self) -> Vec<Signal<T>> {
        self.signals
    }

    pub fn value_at(&self, location: usize, time: f64) -> Option<&T> {
        self.signals.get(location)?.value_at(time)
    }

    /// The earliest end time among the location signals.
    pub fn end(&self) -> Option<f64> {
        let mut ends = self.signals.iter().map(Signal::end);
        let first = ends.next()??;

        ends.try_fold(first, |end, other| other.map(|other| f64::min(end, other)))
    }

    pub fn apply<U, F>(&self, f: F) -> SpatialTemporalSignal<U>
    where
        U: PartialEq,
        F: Fn(&T) -> U,
    {
        SpatialTemporalSignal {
            signals: self.signals.iter().map(|signal| signal.apply(&f)).collect(),
        }
    }

    pub fn apply_binary<U, V, F>(
        &self,
        other: &SpatialTemporalSignal<U>,
        f: F,
    ) -> Result<SpatialTemporalSignal<V>, SignalError>
    where
        V: PartialEq,
        F: Fn(&T, &U) -> V,
    {
        if self.locations() != other.locations() {
            return Err(SignalError::LocationMismatch {
                expected: self.locations(),
                found: other.locations(),
            });
        }

        let signals = self
            .signals
            .iter()
            .zip(&other.signals)
            .map(|(left, right)| left.apply_binary(right, &f))
            .collect();

        Ok(SpatialTemporalSignal { signals })
    }
}

impl<T: PartialEq> SpatialTemporalSignal<T> {
    /// Create a signal from rows of `(time, values)`, where each row holds one value per location.
    ///
    /// Fails if any row does not hold exactly `locations` values or if the times are not strictly
    /// increasing.
    pub fn from_samples<I>(locations: usize, rows: I) -> Result<Self, SignalError>
    where
        I: IntoIterator<Item = (f64, Vec<T>)>,
    {
        let mut signal = Self::new(locations);

        for (time, values) in rows {
            signal.add(time, values)?;
        }

        Ok(signal)
    }

    /// Append one value per location at the given time.
    pub fn add(&mut self, time: f64, values: Vec<T>) -> Result<(), SignalError> {
        if values.len() != self.signals.len() {
            return Err(SignalError::LocationMismatch {
                expected: self.signals.len(),
                found: values.len(),
            });
        }

        for (signal, value) in self.signals.iter_mut().zip(values) {
            signal.add(time, value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{Signal, SignalError, SpatialTemporalSignal};

    #[test]
    fn compression() -> Result<(), SignalError> {
        let mut signal = Signal::new();

        signal.add(0.0, 1)?;
        signal.add(1.0, 1)?;
        signal.add(2.0, 1)?;

        assert_eq!(signal.len(), 1);
        assert_eq!(signal.end(), Some(2.0));

        signal.add(3.0, 2)?;

        assert_eq!(signal.len(), 2);
        assert_eq!(signal.times().collect::<Vec<_>>(), vec![0.0, 3.0]);

        Ok(())
    }

    #[test]
    fn invalid_times() -> Result<(), SignalError> {
        let mut signal = Signal::new();
        signal.add(1.0, 'a')?;

        assert_eq!(signal.add(f64::NAN, 'b'), Err(SignalError::NanTime));
        assert_eq!(
            signal.add(1.0, 'b'),
            Err(SignalError::NonMonotonic { previous: 1.0, time: 1.0 })
        );
        assert_eq!(
            signal.add(0.5, 'b'),
            Err(SignalError::NonMonotonic { previous: 1.0, time: 0.5 })
        );

        signal.add(2.0, 'b')?;
        assert_eq!(
            signal.end_at(1.5),
            Err(SignalError::EndBeforeLastSegment { last: 2.0, end: 1.5 })
        );

        Ok(())
    }

    #[test]
    fn value_at() -> Result<(), SignalError> {
        let signal = Signal::from_samples([(1.0, 'a'), (2.0, 'b'), (4.0, 'c')])?;

        assert_eq!(signal.value_at(0.5), None);
        assert_eq!(signal.value_at(1.0), Some(&'a'));
        assert_eq!(signal.value_at(1.9), Some(&'a'));
        assert_eq!(signal.value_at(2.0), Some(&'b'));
        assert_eq!(signal.value_at(3.5), Some(&'b'));
        assert_eq!(signal.value_at(4.0), Some(&'c'));
        assert_eq!(signal.value_at(4.1), None);

        Ok(())
    }

    #[test]
    fn apply_binary_merges_change_points() -> Result<(), SignalError> {
        let left = Signal::from_samples([(0.0, 1.0), (2.0, 3.0), (5.0, 3.0)])?;
        let right = Signal::from_samples([(1.0, 10.0), (3.0, 20.0), (4.0, 20.0), (6.0, 30.0)])?;
        let sum = left.apply_binary(&right, |l, r| l + r);

        assert_eq!(sum.start(), Some(1.0));
        assert_eq!(sum.end(), Some(5.0));
        assert_eq!(
            sum.iter().map(|s| (s.time(), *s.value())).collect::<Vec<_>>(),
            vec![(1.0, 11.0), (2.0, 13.0), (3.0, 23.0)]
        );

        let disjoint = Signal::from_samples([(7.0, 1.0), (8.0, 1.0)])?;
        assert!(left.apply_binary(&disjoint, |l, r| l + r).is_empty());

        Ok(())
    }

    #[test]
    fn apply_recompresses() -> Result<(), SignalError> {
        let signal = Signal::from_samples([(0.0, -1.0), (1.0, -2.0), (2.0, 3.0)])?;
        let positive = signal.apply(|value| *value >= 0.0);

        assert_eq!(positive.len(), 2);
        assert_eq!(positive.value_at(1.5), Some(&false));
        assert_eq!(positive.value_at(2.0), Some(&true));
        assert_eq!(positive.end(), Some(2.0));

        Ok(())
    }

    #[test]
    fn restrict() -> Result<(), SignalError> {
        let signal = Signal::from_samples([(0.0, 'a'), (2.0, 'b'), (4.0, 'c'), (6.0, 'd')])?;
        let restricted = signal.restrict(1.0, 4.5);

        assert_eq!(restricted.start(), Some(1.0));
        assert_eq!(restricted.end(), Some(4.5));
        assert_eq!(restricted.values().copied().collect::<Vec<_>>(), vec!['a', 'b', 'c']);
        assert!(signal.restrict(7.0, 8.0).is_empty());

        Ok(())
    }

    #[test]
    fn cursor() -> Result<(), Box<dyn Error>> {
        let signal = Signal::from_samples([(0.0, 'a'), (2.0, 'b'), (4.0, 'c')])?;
        let mut cursor = signal.cursor().ok_or("empty signal")?;

        assert_eq!(cursor.next_time(), Some(2.0));
        cursor.move_to(3.0);
        assert_eq!(cursor.value(), &'b');
        assert!(cursor.forward());
        assert!(cursor.is_completed());
        assert!(!cursor.forward());
        assert!(Signal::<char>::new().cursor().is_none());

        Ok(())
    }

    #[test]
    fn spatial_signal_dimensions() -> Result<(), Box<dyn Error>> {
        let signal = SpatialTemporalSignal::from_samples(
            2,
            [(0.0, vec![1.0, 2.0]), (1.0, vec![1.0, 3.0])],
        )?;

        assert_eq!(signal.locations(), 2);
        assert_eq!(signal.value_at(1, 1.0), Some(&3.0));
        assert_eq!(signal.signal(0).map(Signal::len), Some(1));

        let mismatch = SpatialTemporalSignal::from_samples(2, [(0.0, vec![1.0])]);
        assert_eq!(
            mismatch,
            Err(SignalError::LocationMismatch { expected: 2, found: 1 })
        );

        Ok(())
    }
}
