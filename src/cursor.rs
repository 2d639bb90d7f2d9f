use crate::signal::{Signal, SignalCursor};

/// Synchronized iteration over several signals with different change points.
///
/// The cursor visits every time at which at least one of the signals changes value, within the
/// intersection of the signal domains. At each stop the current value of every signal can be
/// queried, which is what N-ary operators such as the spatial reductions need.
///
/// ```rust
/// use banquo_spatial::{ParallelCursor, Signal};
///
/// let a = Signal::from_samples([(0.0, 1), (2.0, 2), (4.0, 2)]).unwrap();
/// let b = Signal::from_samples([(1.0, 10), (3.0, 20), (5.0, 20)]).unwrap();
/// let mut cursor = ParallelCursor::new([&a, &b]).unwrap();
///
/// let mut stops = vec![cursor.time()];
/// while cursor.synchronize() {
///     stops.push(cursor.time());
/// }
///
/// assert_eq!(stops, vec![1.0, 2.0, 3.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ParallelCursor<'a, T> {
    cursors: Vec<SignalCursor<'a, T>>,
    time: f64,
    end: f64,
}

impl<'a, T> ParallelCursor<'a, T> {
    /// Create a cursor positioned at the latest start time of the signals.
    ///
    /// Returns `None` if there are no signals, if any of them is empty, or if their domains do not
    /// overlap.
    pub fn new<I>(signals: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Signal<T>>,
    {
        let mut cursors = signals
            .into_iter()
            .map(Signal::cursor)
            .collect::<Option<Vec<_>>>()?;

        let time = cursors.iter().map(SignalCursor::time).reduce(f64::max)?;
        let end = cursors.iter().map(SignalCursor::end).reduce(f64::min)?;

        if time > end {
            return None;
        }

        for cursor in &mut cursors {
            cursor.move_to(time);
        }

        Some(Self { cursors, time, end })
    }

    /// The current time of the cursor.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The last time shared by all the signals.
    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// The current value of the `index`-th signal.
    pub fn value(&self, index: usize) -> Option<&'a T> {
        self.cursors.get(index).map(SignalCursor::value)
    }

    /// The current values of all the signals, in the order they were provided.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &'a T> + '_ {
        self.cursors.iter().map(SignalCursor::value)
    }

    /// The earliest change point after the current time that is still inside the common domain.
    pub fn next_time(&self) -> Option<f64> {
        self.cursors
            .iter()
            .filter_map(SignalCursor::next_time)
            .reduce(f64::min)
            .filter(|next| *next <= self.end)
    }

    /// Advance every cursor to the earliest next change time.
    ///
    /// Returns `false` without moving when no signal changes again inside the common domain.
    pub fn synchronize(&mut self) -> bool {
        match self.next_time() {
            Some(next) => self.move_to(next),
            None => false,
        }
    }

    /// Advance every cursor to an arbitrary time between the current time and the common end.
    ///
    /// This is used to stop at times where something other than the signals changes, such as the
    /// topology of a spatial model.
    pub fn move_to(&mut self, time: f64) -> bool {
        if time <= self.time || time > self.end {
            return false;
        }

        for cursor in &mut self.cursors {
            cursor.move_to(time);
        }

        self.time = time;
        true
    }

    /// True when no signal changes again inside the common domain.
    pub fn is_completed(&self) -> bool {
        self.next_time().is_none()
    }

    /// True when the `index`-th signal has no more change points inside the common domain.
    pub fn is_cursor_completed(&self, index: usize) -> bool {
        self.cursors
            .get(index)
            .map_or(true, |cursor| !matches!(cursor.next_time(), Some(next) if next <= self.end))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::ParallelCursor;
    use crate::signal::Signal;

    #[test]
    fn synchronization() -> Result<(), Box<dyn Error>> {
        let a = Signal::from_samples([(0.0, 'a'), (1.0, 'b'), (3.0, 'c'), (6.0, 'c')])?;
        let b = Signal::from_samples([(0.5, 'x'), (3.0, 'y'), (4.0, 'z'), (5.0, 'z')])?;
        let mut cursor = ParallelCursor::new([&a, &b]).ok_or("disjoint signals")?;

        assert_eq!(cursor.time(), 0.5);
        assert_eq!(cursor.end(), 5.0);
        assert_eq!(cursor.values().copied().collect::<Vec<_>>(), vec!['a', 'x']);

        assert!(cursor.synchronize());
        assert_eq!(cursor.time(), 1.0);
        assert_eq!(cursor.values().copied().collect::<Vec<_>>(), vec!['b', 'x']);

        assert!(cursor.synchronize());
        assert_eq!(cursor.time(), 3.0);
        assert_eq!(cursor.values().copied().collect::<Vec<_>>(), vec!['c', 'y']);
        assert!(cursor.is_cursor_completed(0));
        assert!(!cursor.is_cursor_completed(1));

        assert!(cursor.synchronize());
        assert_eq!(cursor.time(), 4.0);
        assert_eq!(cursor.value(1), Some(&'z'));
        assert!(cursor.is_completed());
        assert!(!cursor.synchronize());

        Ok(())
    }

    #[test]
    fn invalid_inputs() -> Result<(), Box<dyn Error>> {
        let a = Signal::from_samples([(0.0, 1), (1.0, 1)])?;
        let b = Signal::from_samples([(2.0, 1), (3.0, 1)])?;
        let empty = Signal::new();

        assert!(ParallelCursor::new([&a, &b]).is_none());
        assert!(ParallelCursor::new([&a, &empty]).is_none());
        assert!(ParallelCursor::<i32>::new([]).is_none());

        Ok(())
    }

    #[test]
    fn move_to_intermediate_time() -> Result<(), Box<dyn Error>> {
        let a = Signal::from_samples([(0.0, 1), (4.0, 2)])?;
        let mut cursor = ParallelCursor::new([&a]).ok_or("empty signal")?;

        assert!(cursor.move_to(2.0));
        assert_eq!(cursor.value(0), Some(&1));
        assert!(!cursor.move_to(1.0));
        assert!(!cursor.move_to(5.0));
        assert_eq!(cursor.next_time(), Some(4.0));

        Ok(())
    }
}
