use crate::domain::SignalDomain;
use crate::interval::Interval;
use crate::signal::Signal;

use super::{accumulate_forward, sweep};

/// Aggregate the values of `signal` inside of `[t - b, t - a]` for every time `t`.
///
/// The output is defined over `[start + a, end]`.
fn past_window<T, F>(signal: &Signal<T>, interval: &Interval, op: F) -> Signal<T>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> T,
{
    let (start, end) = match (signal.start(), signal.end()) {
        (Some(start), Some(end)) => (start + interval.start(), end),
        _ => return Signal::new(),
    };

    let segments = signal.segments();
    let enter = |index: usize| segments[index].time() + interval.start();
    let leave = |index: usize| signal.segment_end(index) + interval.end();

    sweep(signal, start, end, enter, leave, op)
}

/// Past operator requiring its input to have held at some instant.
pub fn once<D>(
    domain: &D,
    signal: &Signal<D::Value>,
    interval: Option<&Interval>,
) -> Signal<D::Value>
where
    D: SignalDomain,
{
    let op = |left: &D::Value, right: &D::Value| domain.disjunction(left, right);

    match interval {
        Some(interval) => past_window(signal, interval, op),
        None => accumulate_forward(signal, domain.min(), op),
    }
}

/// Past operator requiring its input to have held at every instant.
pub fn historically<D>(
    domain: &D,
    signal: &Signal<D::Value>,
    interval: Option<&Interval>,
) -> Signal<D::Value>
where
    D: SignalDomain,
{
    let op = |left: &D::Value, right: &D::Value| domain.conjunction(left, right);

    match interval {
        Some(interval) => past_window(signal, interval, op),
        None => accumulate_forward(signal, domain.max(), op),
    }
}

/// Binary past operator requiring `right` to have held at some instant and `left` to have held
/// ever since.
///
/// Mirrors [`until`](super::until): the unbounded value is the forward recurrence
/// `s(t) = right(t) or (left(t) and s(t''))` where `t''` is the previous change point, and the
/// bounded value is conjoined with the bounded [`once`] of `right`.
pub fn since<D>(
    domain: &D,
    left: &Signal<D::Value>,
    right: &Signal<D::Value>,
    interval: Option<&Interval>,
) -> Signal<D::Value>
where
    D: SignalDomain,
{
    let pairs = left.apply_binary(right, |l, r| (l.clone(), r.clone()));
    let mut accumulated = domain.min();
    let mut unbounded = Signal::new();

    for segment in &pairs {
        let (l, r) = segment.value();
        accumulated = domain.disjunction(r, &domain.conjunction(l, &accumulated));
        unbounded.push(segment.time(), accumulated.clone());
    }

    if let Some(end) = pairs.end() {
        unbounded.close(end);
    }

    match interval {
        Some(interval) => {
            let window = once(domain, right, Some(interval));
            unbounded.apply_binary(&window, |s, w| domain.conjunction(s, w))
        }
        None => unbounded,
    }
}
