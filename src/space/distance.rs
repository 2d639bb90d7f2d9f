use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::{Debug, Formatter};
use std::ops::Add;
use std::sync::{Arc, OnceLock};

use super::{RegularGridModel, SharedModel, SpaceError, SpatialModel};

/// Values usable as distances between locations.
///
/// Distances must be non-negative, and adding a distance to another must never make it smaller.
pub trait DistanceDomain: Copy + PartialOrd + Debug + Add<Output = Self> {
    /// The distance of a location from itself.
    fn zero() -> Self;
}

impl DistanceDomain for f64 {
    fn zero() -> Self {
        0.0
    }
}

impl DistanceDomain for i64 {
    fn zero() -> Self {
        0
    }
}

impl DistanceDomain for usize {
    fn zero() -> Self {
        0
    }
}

/// A spatial model paired with a distance function and a range of accepted distances.
///
/// The distance between two locations is the length of the shortest path between them, where the
/// length of each edge is given by [`DistanceStructure::distance_of`]. Two locations are within
/// bounds when their distance lies inside of the accepted range.
pub trait DistanceStructure<E, M> {
    /// The model the distances are computed over.
    fn model(&self) -> &dyn SpatialModel<E>;

    /// The length of a single edge.
    fn distance_of(&self, edge: &E) -> M;

    /// True if the distance lies inside of the accepted range.
    fn is_within_bounds(&self, distance: &M) -> bool;

    /// True if the distance does not exceed the upper bound of the accepted range.
    fn is_within_upper(&self, distance: &M) -> bool;

    /// The shortest distance between two locations, if it does not exceed the upper bound.
    fn distance(&self, from: usize, to: usize) -> Option<M>;

    /// The locations other than `location` that are within bounds of it, in increasing order.
    fn neighbourhood(&self, location: usize) -> Vec<usize>;

    fn are_within_bounds(&self, from: usize, to: usize) -> bool {
        self.distance(from, to)
            .map_or(false, |distance| self.is_within_bounds(&distance))
    }
}

/// Function building the distance structure of a model.
///
/// Formulas refer to distance structures by identifier, and the monitor builds a new structure
/// every time the model provided by the location service changes.
pub type DistanceFactory<E, M> = Arc<
    dyn Fn(&SharedModel<E>) -> Result<Box<dyn DistanceStructure<E, M>>, SpaceError> + Send + Sync,
>;

fn check_bounds<M: DistanceDomain>(lower: M, upper: M) -> Result<(), SpaceError> {
    if M::zero() <= lower && lower <= upper {
        Ok(())
    } else {
        Err(SpaceError::InvalidBounds {
            lower: format!("{:?}", lower),
            upper: format!("{:?}", upper),
        })
    }
}

fn check_edges<E, M, F>(model: &dyn SpatialModel<E>, distance: F) -> Result<(), SpaceError>
where
    M: DistanceDomain,
    F: Fn(&E) -> M,
{
    for from in 0..model.size() {
        for (to, edge) in model.next(from) {
            let length = distance(edge);

            if !(M::zero() <= length) {
                return Err(SpaceError::NegativeDistance {
                    from,
                    to,
                    distance: format!("{:?}", length),
                });
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Candidate<M> {
    distance: M,
    location: usize,
}

impl<M: PartialOrd> PartialEq for Candidate<M> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<M: PartialOrd> Eq for Candidate<M> {}

impl<M: PartialOrd> PartialOrd for Candidate<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the binary heap pops the closest candidate first.
impl<M: PartialOrd> Ord for Candidate<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.location.cmp(&self.location))
    }
}

/// Distance structure over an arbitrary model.
///
/// Distances are computed on demand with a shortest path search from each source location that
/// stops exploring once the upper bound is exceeded. The distances from a source are computed at
/// most once and then cached.
///
/// ```rust
/// use std::sync::Arc;
/// use banquo_spatial::space::{
///     DefaultDistanceStructure, DistanceStructure, GraphModel, SharedModel,
/// };
///
/// let model: SharedModel<f64> =
///     Arc::new(GraphModel::from_edges(3, [(0, 1, 1.5), (1, 2, 1.0), (0, 2, 4.0)]).unwrap());
/// let structure = DefaultDistanceStructure::new(model, |edge: &f64| *edge, 0.0, 3.0).unwrap();
///
/// assert_eq!(structure.distance(0, 2), Some(2.5));
/// assert_eq!(structure.distance(2, 0), None);
/// assert_eq!(structure.neighbourhood(0), vec![1, 2]);
/// ```
pub struct DefaultDistanceStructure<E, M> {
    model: SharedModel<E>,
    distance: Arc<dyn Fn(&E) -> M + Send + Sync>,
    lower: M,
    upper: M,
    cache: Vec<OnceLock<HashMap<usize, M>>>,
}

impl<E, M> DefaultDistanceStructure<E, M>
where
    M: DistanceDomain,
{
    pub fn new<F>(
        model: SharedModel<E>,
        distance: F,
        lower: M,
        upper: M,
    ) -> Result<Self, SpaceError>
    where
        F: Fn(&E) -> M + Send + Sync + 'static,
    {
        check_bounds(lower, upper)?;
        check_edges(model.as_ref(), &distance)?;

        let cache = (0..model.size()).map(|_| OnceLock::new()).collect();

        Ok(Self {
            model,
            distance: Arc::new(distance),
            lower,
            upper,
            cache,
        })
    }

    /// Create a factory building a structure with the given distance function and bounds for any
    /// model it receives.
    ///
    /// Building fails when the bounds are invalid or when an edge of the model has a negative
    /// distance.
    pub fn factory<F>(distance: F, lower: M, upper: M) -> DistanceFactory<E, M>
    where
        E: 'static,
        M: Send + Sync + 'static,
        F: Fn(&E) -> M + Send + Sync + 'static,
    {
        let distance: Arc<dyn Fn(&E) -> M + Send + Sync> = Arc::new(distance);

        Arc::new(move |model: &SharedModel<E>| {
            check_bounds(lower, upper)?;
            check_edges(model.as_ref(), distance.as_ref())?;

            let structure = Self {
                model: Arc::clone(model),
                distance: Arc::clone(&distance),
                lower,
                upper,
                cache: (0..model.size()).map(|_| OnceLock::new()).collect(),
            };

            Ok(Box::new(structure) as Box<dyn DistanceStructure<E, M>>)
        })
    }

    fn distances_from(&self, source: usize) -> Option<&HashMap<usize, M>> {
        self.cache
            .get(source)
            .map(|cell| cell.get_or_init(|| self.shortest_paths(source)))
    }

    fn shortest_paths(&self, source: usize) -> HashMap<usize, M> {
        let mut best = HashMap::from([(source, M::zero())]);
        let mut heap = BinaryHeap::from([Candidate {
            distance: M::zero(),
            location: source,
        }]);

        while let Some(Candidate { distance, location }) = heap.pop() {
            if best.get(&location).map_or(false, |known| *known < distance) {
                continue;
            }

            for (next, edge) in self.model.next(location) {
                let candidate = distance + (self.distance)(edge);

                if !self.is_within_upper(&candidate) {
                    continue;
                }

                if best.get(&next).map_or(true, |known| candidate < *known) {
                    best.insert(next, candidate);
                    heap.push(Candidate {
                        distance: candidate,
                        location: next,
                    });
                }
            }
        }

        tracing::trace!(source, reachable = best.len(), "Computed bounded distances");
        best
    }
}

impl<E, M> DistanceStructure<E, M> for DefaultDistanceStructure<E, M>
where
    M: DistanceDomain,
{
    fn model(&self) -> &dyn SpatialModel<E> {
        self.model.as_ref()
    }

    fn distance_of(&self, edge: &E) -> M {
        (self.distance)(edge)
    }

    fn is_within_bounds(&self, distance: &M) -> bool {
        self.lower <= *distance && *distance <= self.upper
    }

    fn is_within_upper(&self, distance: &M) -> bool {
        *distance <= self.upper
    }

    fn distance(&self, from: usize, to: usize) -> Option<M> {
        self.distances_from(from)?.get(&to).copied()
    }

    fn neighbourhood(&self, location: usize) -> Vec<usize> {
        let Some(distances) = self.distances_from(location) else {
            return Vec::new();
        };

        let mut neighbourhood = distances
            .iter()
            .filter(|(other, distance)| **other != location && self.is_within_bounds(distance))
            .map(|(other, _)| *other)
            .collect::<Vec<_>>();

        neighbourhood.sort_unstable();
        neighbourhood
    }
}

impl<E, M: Debug> Debug for DefaultDistanceStructure<E, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultDistanceStructure")
            .field("size", &self.model.size())
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .finish()
    }
}

/// Distance structure over a [`RegularGridModel`] using the number of horizontal and vertical
/// steps between two cells.
///
/// The neighbourhood of every location is computed once on construction by enumerating the cells
/// inside of the accepted range, without exploring the graph.
#[derive(Debug, Clone)]
pub struct IntManhattanDistanceStructure<E> {
    grid: Arc<RegularGridModel<E>>,
    lower: i64,
    upper: i64,
    neighbourhoods: Vec<Vec<usize>>,
}

impl<E> IntManhattanDistanceStructure<E> {
    pub fn new(
        lower: i64,
        upper: i64,
        grid: Arc<RegularGridModel<E>>,
    ) -> Result<Self, SpaceError> {
        check_bounds(lower, upper)?;

        let rows = grid.rows() as i64;
        let columns = grid.columns() as i64;
        let reach = upper.min(rows + columns);
        let mut neighbourhoods = Vec::with_capacity(grid.size());

        for location in 0..grid.size() {
            let (row, column) = grid.coordinates(location);
            let (row, column) = (row as i64, column as i64);
            let mut neighbourhood = Vec::new();

            for other_row in (row - reach).max(0)..=(row + reach).min(rows - 1) {
                let vertical = (other_row - row).abs();
                let horizontal = reach - vertical;
                let first = (column - horizontal).max(0);
                let last = (column + horizontal).min(columns - 1);

                for other_column in first..=last {
                    let steps = vertical + (other_column - column).abs();

                    if steps != 0 && lower <= steps {
                        let other = grid.location(other_row as usize, other_column as usize);
                        neighbourhood.push(other);
                    }
                }
            }

            neighbourhoods.push(neighbourhood);
        }

        Ok(Self {
            grid,
            lower,
            upper,
            neighbourhoods,
        })
    }

    /// Create a factory that always builds a structure over `grid`.
    ///
    /// The model it receives only has to agree with the grid on the number of locations.
    pub fn factory(
        lower: i64,
        upper: i64,
        grid: Arc<RegularGridModel<E>>,
    ) -> DistanceFactory<E, i64>
    where
        E: Send + Sync + 'static,
    {
        Arc::new(move |model: &SharedModel<E>| {
            if model.size() != grid.size() {
                return Err(SpaceError::SizeMismatch {
                    expected: grid.size(),
                    found: model.size(),
                });
            }

            let structure = Self::new(lower, upper, Arc::clone(&grid))?;
            Ok(Box::new(structure) as Box<dyn DistanceStructure<E, i64>>)
        })
    }

    fn steps(&self, from: usize, to: usize) -> i64 {
        let (from_row, from_column) = self.grid.coordinates(from);
        let (to_row, to_column) = self.grid.coordinates(to);

        (from_row.abs_diff(to_row) + from_column.abs_diff(to_column)) as i64
    }
}

impl<E> DistanceStructure<E, i64> for IntManhattanDistanceStructure<E> {
    fn model(&self) -> &dyn SpatialModel<E> {
        self.grid.as_ref()
    }

    fn distance_of(&self, _edge: &E) -> i64 {
        1
    }

    fn is_within_bounds(&self, distance: &i64) -> bool {
        self.lower <= *distance && *distance <= self.upper
    }

    fn is_within_upper(&self, distance: &i64) -> bool {
        *distance <= self.upper
    }

    fn distance(&self, from: usize, to: usize) -> Option<i64> {
        let size = self.grid.size();

        if from >= size || to >= size {
            return None;
        }

        Some(self.steps(from, to)).filter(|steps| self.is_within_upper(steps))
    }

    fn neighbourhood(&self, location: usize) -> Vec<usize> {
        self.neighbourhoods.get(location).cloned().unwrap_or_default()
    }
}
