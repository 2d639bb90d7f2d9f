//! Temporal operators over signals.
//!
//! Temporal operators are not time-invariant: the value of the output signal at time `t` depends
//! on the values of the input signal at other times. Operators in this module come in two
//! flavors.
//!
//! # Future Operators
//!
//! Future operators consider the values of the input later than the current time. [`eventually`]
//! requires its input to hold at some instant in the future, [`globally`] requires its input to
//! hold at every instant in the future, and [`until`] requires its right input to hold at some
//! instant while the left input holds up to that instant.
//!
//! # Past Operators
//!
//! Past operators mirror the future operators by considering the values of the input earlier than
//! the current time. [`once`] mirrors `eventually`, [`historically`] mirrors `globally`, and
//! [`since`] mirrors `until`.
//!
//! # Bounds
//!
//! Every operator accepts an optional [`Interval`](crate::Interval). An unbounded operator is
//! computed by accumulating the input from one end of the signal to the other in a single pass. A
//! bounded operator only considers the values inside of a window of the interval around the
//! current time:
//!
//! ```text
//! t0 t1 t2 t3 t4 t5
//! v0 v1 v2 v3 v4 v5
//!     |-----|         eventually[0, 2] evaluated at t1
//!        |-----|      eventually[0, 2] evaluated at t2
//! ```
//!
//! Windows are computed with a single sweep over the input that maintains a deque of partial
//! aggregates, so the total work is linear in the number of segments regardless of the width of
//! the interval. Bounded future operators are defined over `[start, end - a]` and bounded past
//! operators over `[start + a, end]` for an interval `[a, b]`.
//!
//! ```rust
//! use banquo_spatial::domain::BooleanDomain;
//! use banquo_spatial::operators::eventually;
//! use banquo_spatial::{Interval, Signal};
//!
//! let signal = Signal::from_samples([(0.0, false), (1.0, true), (2.0, false)]).unwrap();
//! let interval = Interval::new(0.0, 1.0).unwrap();
//! let output = eventually(&BooleanDomain, &signal, Some(&interval));
//!
//! assert_eq!(output.value_at(0.0), Some(&true));
//! assert_eq!(output.value_at(1.0), Some(&true));
//! assert_eq!(output.value_at(2.0), Some(&false));
//! ```

use std::collections::VecDeque;

use crate::signal::Signal;

mod backward;
mod forward;

pub use backward::{historically, once, since};
pub use forward::{eventually, globally, until};

#[derive(Debug, Clone)]
struct Entry<T> {
    first: usize,
    value: T,
}

/// Deque of partial aggregates for a window over the segments of a signal.
///
/// Each entry covers a run of consecutive segment indices and holds the aggregate of every segment
/// from the start of its run to the newest segment in the window. The front entry therefore always
/// holds the aggregate of the whole window. Adjacent entries holding the same aggregate are merged,
/// so an entry stays in the window until its most recent member leaves.
#[derive(Debug, Clone)]
struct SlidingWindow<T> {
    entries: VecDeque<Entry<T>>,
    newest: Option<usize>,
}

impl<T> SlidingWindow<T>
where
    T: Clone + PartialEq,
{
    fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            newest: None,
        }
    }

    fn push<F>(&mut self, index: usize, value: T, op: &F)
    where
        F: Fn(&T, &T) -> T,
    {
        let mut updated = vec![Entry { first: index, value: value.clone() }];

        // Once an entry absorbs the new value every older entry does as well.
        while let Some(mut entry) = self.entries.pop_back() {
            let combined = op(&entry.value, &value);

            if combined == entry.value {
                self.entries.push_back(entry);
                break;
            }

            entry.value = combined;
            updated.push(entry);
        }

        for entry in updated.into_iter().rev() {
            match self.entries.back() {
                Some(last) if last.value == entry.value => {}
                _ => self.entries.push_back(entry),
            }
        }

        self.newest = Some(index);
    }

    /// Remove every segment with an index less than or equal to `index`.
    fn expire(&mut self, index: usize) {
        loop {
            let run_end = match (self.entries.get(1), self.newest) {
                (Some(next), _) => next.first - 1,
                (None, Some(newest)) => newest,
                (None, None) => return,
            };

            let Some(front) = self.entries.front_mut() else {
                return;
            };

            if run_end <= index {
                self.entries.pop_front();
            } else {
                front.first = usize::max(front.first, index + 1);
                return;
            }
        }
    }

    fn value(&self) -> Option<&T> {
        self.entries.front().map(|entry| &entry.value)
    }
}

/// Slide a window over the segments of `signal`, emitting the window aggregate from `start` to
/// `end`.
///
/// Segment `i` enters the window at time `enter(i)` and leaves it at time `leave(i)`. The last
/// segment never leaves. Both functions must be non-decreasing in `i`, and `leave(i) >= enter(i)`.
fn sweep<T, F, In, Out>(
    signal: &Signal<T>,
    start: f64,
    end: f64,
    enter: In,
    leave: Out,
    op: F,
) -> Signal<T>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> T,
    In: Fn(usize) -> f64,
    Out: Fn(usize) -> f64,
{
    let segments = signal.segments();
    let count = segments.len();
    let mut output = Signal::new();

    if count == 0 || start > end {
        return output;
    }

    let mut window = SlidingWindow::new();
    let mut entered = 0;
    let mut left = 0;
    let mut time = start;

    loop {
        while entered < count && enter(entered) <= time {
            window.push(entered, segments[entered].value().clone(), &op);
            entered += 1;
        }

        while left + 1 < count && leave(left) <= time {
            window.expire(left);
            left += 1;
        }

        if let Some(value) = window.value() {
            output.push(time, value.clone());
        }

        let next_enter = (entered < count).then(|| enter(entered));
        let next_leave = (left + 1 < count).then(|| leave(left));

        let next = match (next_enter, next_leave) {
            (Some(enter), Some(leave)) => f64::min(enter, leave),
            (Some(enter), None) => enter,
            (None, Some(leave)) => leave,
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

/// Combine every segment of `signal` with all of the segments after it.
fn accumulate_backward<T, F>(signal: &Signal<T>, identity: T, op: F) -> Signal<T>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> T,
{
    let mut accumulated = identity;
    let mut reversed = Vec::with_capacity(signal.len());

    for segment in signal.iter_backward() {
        accumulated = op(segment.value(), &accumulated);
        reversed.push((segment.time(), accumulated.clone()));
    }

    let mut output = Signal::new();

    for (time, value) in reversed.into_iter().rev() {
        output.push(time, value);
    }

    if let Some(end) = signal.end() {
        output.close(end);
    }

    output
}

/// Combine every segment of `signal` with all of the segments before it.
fn accumulate_forward<T, F>(signal: &Signal<T>, identity: T, op: F) -> Signal<T>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> T,
{
    let mut accumulated = identity;
    let mut output = Signal::new();

    for segment in signal {
        accumulated = op(&accumulated, segment.value());
        output.push(segment.time(), accumulated.clone());
    }

    if let Some(end) = signal.end() {
        output.close(end);
    }

    output
}
