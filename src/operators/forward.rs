use crate::domain::SignalDomain;
use crate::interval::Interval;
use crate::signal::Signal;

use super::{accumulate_backward, sweep};

/// Aggregate the values of `signal` inside of `[t + a, t + b]` for every time `t`.
///
/// The output is defined over `[start, end - a]`.
fn future_window<T, F>(signal: &Signal<T>, interval: &Interval, op: F) -> Signal<T>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> T,
{
    let (start, end) = match (signal.start(), signal.end()) {
        (Some(start), Some(end)) => (start, end - interval.start()),
        _ => return Signal::new(),
    };

    let segments = signal.segments();
    let enter = |index: usize| segments[index].time() - interval.end();
    let leave = |index: usize| signal.segment_end(index) - interval.start();

    sweep(signal, start, end, enter, leave, op)
}

/// Future operator requiring its input to hold at some instant.
///
/// Without an interval the value at time `t` is the disjunction of every value from `t` to the end
/// of the signal. With an interval `[a, b]` only the values in `[t + a, t + b]` are considered.
pub fn eventually<D>(
    domain: &D,
    signal: &Signal<D::Value>,
    interval: Option<&Interval>,
) -> Signal<D::Value>
where
    D: SignalDomain,
{
    let op = |left: &D::Value, right: &D::Value| domain.disjunction(left, right);

    match interval {
        Some(interval) => future_window(signal, interval, op),
        None => accumulate_backward(signal, domain.min(), op),
    }
}

/// Future operator requiring its input to hold at every instant.
///
/// Without an interval the value at time `t` is the conjunction of every value from `t` to the end
/// of the signal. With an interval `[a, b]` only the values in `[t + a, t + b]` are considered.
pub fn globally<D>(
    domain: &D,
    signal: &Signal<D::Value>,
    interval: Option<&Interval>,
) -> Signal<D::Value>
where
    D: SignalDomain,
{
    let op = |left: &D::Value, right: &D::Value| domain.conjunction(left, right);

    match interval {
        Some(interval) => future_window(signal, interval, op),
        None => accumulate_backward(signal, domain.max(), op),
    }
}

fn unbounded_until<D>(
    domain: &D,
    left: &Signal<D::Value>,
    right: &Signal<D::Value>,
) -> Signal<D::Value>
where
    D: SignalDomain,
{
    let pairs = left.apply_binary(right, |l, r| (l.clone(), r.clone()));
    let mut accumulated = domain.min();
    let mut reversed = Vec::with_capacity(pairs.len());

    for segment in pairs.iter_backward() {
        let (l, r) = segment.value();
        accumulated = domain.disjunction(r, &domain.conjunction(l, &accumulated));
        reversed.push((segment.time(), accumulated.clone()));
    }

    let mut output = Signal::new();

    for (time, value) in reversed.into_iter().rev() {
        output.push(time, value);
    }

    if let Some(end) = pairs.end() {
        output.close(end);
    }

    output
}

/// Binary future operator requiring `right` to hold at some instant and `left` to hold until then.
///
/// The unbounded value is computed with the backward recurrence
/// `u(t) = right(t) or (left(t) and u(t'))` where `t'` is the next change point. The bounded
/// version conjoins the unbounded value with the bounded [`eventually`] of `right`, so its domain
/// is the domain of the window.
pub fn until<D>(
    domain: &D,
    left: &Signal<D::Value>,
    right: &Signal<D::Value>,
    interval: Option<&Interval>,
) -> Signal<D::Value>
where
    D: SignalDomain,
{
    let unbounded = unbounded_until(domain, left, right);

    match interval {
        Some(interval) => {
            let window = eventually(domain, right, Some(interval));
            unbounded.apply_binary(&window, |u, w| domain.conjunction(u, w))
        }
        None => unbounded,
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::domain::{BooleanDomain, DoubleDomain};
    use crate::interval::Interval;
    use crate::signal::Signal;

    use super::{eventually, globally, until};

    fn samples(signal: &Signal<f64>) -> Vec<(f64, f64)> {
        signal.iter().map(|s| (s.time(), *s.value())).collect()
    }

    #[test]
    fn unbounded_eventually() -> Result<(), Box<dyn Error>> {
        let signal =
            Signal::from_samples([(0.0, 1.0), (1.0, 4.0), (2.0, 2.0), (3.0, 3.0), (4.0, 0.0)])?;
        let output = eventually(&DoubleDomain, &signal, None);

        assert_eq!(samples(&output), vec![(0.0, 4.0), (2.0, 3.0), (4.0, 0.0)]);
        assert_eq!(output.end(), Some(4.0));

        Ok(())
    }

    #[test]
    fn unbounded_globally() -> Result<(), Box<dyn Error>> {
        let signal = Signal::from_samples([(0.0, 1.0), (1.0, 4.0), (2.0, 2.0), (3.0, 3.0)])?;
        let output = globally(&DoubleDomain, &signal, None);

        assert_eq!(samples(&output), vec![(0.0, 1.0), (1.0, 2.0), (3.0, 3.0)]);

        Ok(())
    }

    #[test]
    fn bounded_eventually() -> Result<(), Box<dyn Error>> {
        let signal =
            Signal::from_samples([(0.0, 1.0), (1.0, 4.0), (2.0, 2.0), (3.0, 3.0), (4.0, 0.0)])?;
        let interval = Interval::new(0.0, 1.0)?;
        let output = eventually(&DoubleDomain, &signal, Some(&interval));

        assert_eq!(samples(&output), vec![(0.0, 4.0), (2.0, 3.0), (4.0, 0.0)]);
        assert_eq!(output.value_at(1.5), Some(&4.0));
        assert_eq!(output.end(), Some(4.0));

        Ok(())
    }

    #[test]
    fn bounded_globally_with_offset() -> Result<(), Box<dyn Error>> {
        let signal =
            Signal::from_samples([(0.0, 1.0), (1.0, 4.0), (2.0, 2.0), (3.0, 3.0), (4.0, 0.0)])?;
        let interval = Interval::new(1.0, 2.0)?;
        let output = globally(&DoubleDomain, &signal, Some(&interval));

        // Value at t is the minimum over [t + 1, t + 2], defined up to t = 3
        assert_eq!(output.value_at(0.0), Some(&2.0));
        assert_eq!(output.value_at(1.0), Some(&2.0));
        assert_eq!(output.value_at(2.0), Some(&0.0));
        assert_eq!(output.value_at(3.0), Some(&0.0));
        assert_eq!(output.end(), Some(3.0));

        Ok(())
    }

    #[test]
    fn interval_longer_than_signal() -> Result<(), Box<dyn Error>> {
        let signal = Signal::from_samples([(0.0, 1.0), (1.0, 4.0)])?;
        let interval = Interval::new(2.0, 3.0)?;

        assert!(eventually(&DoubleDomain, &signal, Some(&interval)).is_empty());

        Ok(())
    }

    #[test]
    fn unbounded_until() -> Result<(), Box<dyn Error>> {
        let left = Signal::from_samples([(0.0, true), (2.0, false), (3.0, true), (5.0, true)])?;
        let right = Signal::from_samples([(0.0, false), (4.0, true), (5.0, true)])?;
        let output = until(&BooleanDomain, &left, &right, None);

        assert_eq!(output.value_at(0.0), Some(&false));
        assert_eq!(output.value_at(2.5), Some(&false));
        assert_eq!(output.value_at(3.0), Some(&true));
        assert_eq!(output.value_at(4.5), Some(&true));

        Ok(())
    }

    #[test]
    fn bounded_until() -> Result<(), Box<dyn Error>> {
        let left = Signal::from_samples([(0.0, true), (6.0, true)])?;
        let right = Signal::from_samples([(0.0, false), (4.0, true), (5.0, false), (6.0, false)])?;
        let interval = Interval::new(0.0, 2.0)?;
        let output = until(&BooleanDomain, &left, &right, Some(&interval));

        assert_eq!(output.value_at(0.0), Some(&false));
        assert_eq!(output.value_at(2.0), Some(&true));
        assert_eq!(output.value_at(4.5), Some(&true));
        assert_eq!(output.value_at(5.0), Some(&false));

        Ok(())
    }
}
