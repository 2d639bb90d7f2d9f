use std::collections::{HashMap, VecDeque};

use crate::cursor::ParallelCursor;
use crate::domain::SignalDomain;
use crate::signal::Signal;

use super::{DistanceDomain, DistanceFactory, DistanceStructure, LocationService, SpaceError};

fn fold_neighbourhood<D, E, M, F>(
    domain: &D,
    values: &[D::Value],
    structure: &dyn DistanceStructure<E, M>,
    location: usize,
    identity: D::Value,
    absorbing: D::Value,
    op: F,
) -> D::Value
where
    D: SignalDomain,
    F: Fn(&D::Value, &D::Value) -> D::Value,
{
    let own = structure.are_within_bounds(location, location).then_some(location);
    let mut accumulated = identity;

    let neighbourhood = structure.neighbourhood(location);
    let reachable = own.into_iter().chain(neighbourhood).filter_map(|other| values.get(other));

    for value in reachable {
        accumulated = op(&accumulated, value);

        if domain.equal_to(&accumulated, &absorbing) {
            break;
        }
    }

    accumulated
}

/// Spatial operator requiring its input to hold at every location within bounds.
///
/// A location without any location within bounds, itself included, evaluates to the maximum of the
/// domain.
pub fn everywhere<D, E, M>(
    domain: &D,
    values: &[D::Value],
    structure: &dyn DistanceStructure<E, M>,
) -> Vec<D::Value>
where
    D: SignalDomain,
{
    let op = |left: &D::Value, right: &D::Value| domain.conjunction(left, right);

    (0..values.len())
        .map(|l| fold_neighbourhood(domain, values, structure, l, domain.max(), domain.min(), op))
        .collect()
}

/// Spatial operator requiring its input to hold at some location within bounds.
pub fn somewhere<D, E, M>(
    domain: &D,
    values: &[D::Value],
    structure: &dyn DistanceStructure<E, M>,
) -> Vec<D::Value>
where
    D: SignalDomain,
{
    let op = |left: &D::Value, right: &D::Value| domain.disjunction(left, right);

    (0..values.len())
        .map(|l| fold_neighbourhood(domain, values, structure, l, domain.min(), domain.max(), op))
        .collect()
}

/// Spatial operator requiring `right` to hold at a location within bounds that can be reached
/// through a path along which `left` holds.
///
/// The path starts at the evaluated location, where `left` must hold, and ends at the target,
/// where only `right` must hold. Every location keeps the best value found for each distance from
/// a target. Values are propagated backwards along the edges of the model until no label
/// improves, and the result is the disjunction of the labels whose distance is within bounds.
pub fn reach<D, E, M>(
    domain: &D,
    left: &[D::Value],
    right: &[D::Value],
    structure: &dyn DistanceStructure<E, M>,
) -> Vec<D::Value>
where
    D: SignalDomain,
    M: DistanceDomain,
{
    let model = structure.model();
    let mut labels: Vec<Vec<(M, D::Value)>> = right
        .iter()
        .map(|value| vec![(M::zero(), value.clone())])
        .collect();

    let mut queue = right
        .iter()
        .enumerate()
        .map(|(location, value)| (location, M::zero(), value.clone()))
        .collect::<VecDeque<_>>();

    while let Some((location, distance, value)) = queue.pop_front() {
        for (previous, edge) in model.previous(location) {
            if previous >= labels.len() {
                continue;
            }

            let next_distance = distance + structure.distance_of(edge);

            if !structure.is_within_upper(&next_distance) {
                continue;
            }

            let next_value = domain.conjunction(&value, &left[previous]);
            let existing = labels[previous]
                .iter_mut()
                .find(|(known, _)| *known == next_distance);

            match existing {
                Some((_, known)) => {
                    let merged = domain.disjunction(known, &next_value);

                    if !domain.equal_to(&merged, known) {
                        *known = merged.clone();
                        queue.push_back((previous, next_distance, merged));
                    }
                }
                None => {
                    labels[previous].push((next_distance, next_value.clone()));
                    queue.push_back((previous, next_distance, next_value));
                }
            }
        }
    }

    labels
        .iter()
        .map(|labels| {
            labels
                .iter()
                .filter(|(distance, _)| structure.is_within_bounds(distance))
                .fold(domain.min(), |result, (_, value)| domain.disjunction(&result, value))
        })
        .collect()
}

/// Spatial operator requiring a route starting from the evaluated location, along which the input
/// holds, that ends at a location within bounds.
///
/// For every pair of locations the best route value is computed by propagating routes backwards
/// along the edges of the model. The result for a location is the disjunction of the route values
/// towards the targets within bounds of it.
pub fn escape<D, E, M>(
    domain: &D,
    values: &[D::Value],
    structure: &dyn DistanceStructure<E, M>,
) -> Vec<D::Value>
where
    D: SignalDomain,
{
    let model = structure.model();
    let mut routes: Vec<HashMap<usize, D::Value>> = values
        .iter()
        .enumerate()
        .map(|(location, value)| HashMap::from([(location, value.clone())]))
        .collect();

    let mut queue = (0..values.len())
        .map(|location| (location, location))
        .collect::<VecDeque<_>>();

    while let Some((location, target)) = queue.pop_front() {
        let Some(current) = routes[location].get(&target).cloned() else {
            continue;
        };

        for (previous, _) in model.previous(location) {
            if previous >= values.len() {
                continue;
            }

            let candidate = domain.conjunction(&values[previous], &current);
            let improved = match routes[previous].get(&target) {
                Some(known) => {
                    let merged = domain.disjunction(known, &candidate);
                    (!domain.equal_to(&merged, known)).then_some(merged)
                }
                None => Some(candidate),
            };

            if let Some(value) = improved {
                routes[previous].insert(target, value);
                queue.push_back((previous, target));
            }
        }
    }

    routes
        .iter()
        .enumerate()
        .map(|(location, routes)| {
            routes
                .iter()
                .filter(|(target, _)| structure.are_within_bounds(location, **target))
                .fold(domain.min(), |result, (_, value)| domain.disjunction(&result, value))
        })
        .collect()
}

/// Evaluate a spatial operator at every time the inputs or the model change.
///
/// `signals` holds the per-location inputs of the operator, possibly several groups of `size`
/// signals laid end to end. `op` receives the values of every signal at the current time and
/// returns `size` values. The distance structure is only rebuilt when the model changes.
pub(crate) fn over_time<V, E, M, F>(
    signals: &[&Signal<V>],
    size: usize,
    locations: &LocationService<E>,
    factory: &DistanceFactory<E, M>,
    op: F,
) -> Result<Vec<Signal<V>>, SpaceError>
where
    V: Clone + PartialEq,
    F: Fn(&[V], &dyn DistanceStructure<E, M>) -> Vec<V>,
{
    let mut outputs = (0..size).map(|_| Signal::new()).collect::<Vec<_>>();

    let Some(mut cursor) = ParallelCursor::new(signals.iter().copied()) else {
        return Ok(outputs);
    };

    let mut current: Option<(f64, Box<dyn DistanceStructure<E, M>>)> = None;

    loop {
        let time = cursor.time();
        let (start, model) = locations.entry_at(time).ok_or(SpaceError::NoModel(time))?;

        if model.size() != size {
            return Err(SpaceError::SizeMismatch {
                expected: size,
                found: model.size(),
            });
        }

        let structure = match current.take() {
            Some((known, structure)) if known == start => structure,
            _ => {
                tracing::debug!(time, "Building distance structure");
                factory(model)?
            }
        };

        let values = cursor.values().cloned().collect::<Vec<_>>();

        for (output, value) in outputs.iter_mut().zip(op(&values, structure.as_ref())) {
            output.push(time, value);
        }

        current = Some((start, structure));

        let next_change = locations.next_change(time).filter(|next| *next <= cursor.end());
        let next = match (cursor.next_time(), next_change) {
            (Some(signal), Some(model)) => f64::min(signal, model),
            (Some(signal), None) => signal,
            (None, Some(model)) => model,
            (None, None) => break,
        };

        if !cursor.move_to(next) {
            break;
        }
    }

    for output in &mut outputs {
        output.close(cursor.end());
    }

    Ok(outputs)
}
