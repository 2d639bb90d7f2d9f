//! Spatial models and spatial operators.
//!
//! A spatial model is a directed graph over the locations `0..size`, whose edges carry a value of
//! an arbitrary type `E` such as a weight or a length. Two models are provided:
//!
//!   - [`GraphModel`] stores an arbitrary graph using a `petgraph` [`DiGraphMap`]
//!   - [`RegularGridModel`] computes the neighbours of a location of a rectangular grid
//!     arithmetically, with every edge carrying the same value
//!
//! Spatial operators do not consume models directly. Instead they consume a
//! [`DistanceStructure`], which pairs a model with a function turning edges into distances and a
//! range of accepted distances. When the topology changes over time, a [`LocationService`]
//! provides the model holding at each instant.

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use thiserror::Error;

mod algorithms;
mod distance;
mod location;

pub use algorithms::{escape, everywhere, reach, somewhere};
pub use distance::{
    DefaultDistanceStructure, DistanceDomain, DistanceFactory, DistanceStructure,
    IntManhattanDistanceStructure,
};
pub use location::{LocationService, SharedModel};

pub(crate) use algorithms::over_time;

/// Errors produced while building spatial models and distance structures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpaceError {
    #[error("Location {location} is out of range for a model with {size} locations")]
    LocationOutOfRange { location: usize, size: usize },

    #[error("Distance bounds [{lower}, {upper}] are invalid")]
    InvalidBounds { lower: String, upper: String },

    #[error("Location service time cannot be NaN")]
    NanTime,

    #[error("Location service time {time} does not come after previous time {previous}")]
    NonMonotonic { previous: f64, time: f64 },

    #[error("Model with {found} locations does not match the expected {expected} locations")]
    SizeMismatch { expected: usize, found: usize },

    #[error("No spatial model is defined at time {0}")]
    NoModel(f64),

    #[error("Edge from {from} to {to} has negative distance {distance}")]
    NegativeDistance { from: usize, to: usize, distance: String },
}

/// Directed graph over the locations `0..size()`.
pub trait SpatialModel<E> {
    /// The number of locations in the model.
    fn size(&self) -> usize;

    /// The outgoing edges of a location as `(target, edge)` pairs.
    fn next(&self, location: usize) -> Vec<(usize, &E)>;

    /// The incoming edges of a location as `(source, edge)` pairs.
    fn previous(&self, location: usize) -> Vec<(usize, &E)>;

    /// The edge between two locations, if there is one.
    fn edge(&self, from: usize, to: usize) -> Option<&E>;
}

/// Spatial model backed by an arbitrary directed graph.
///
/// ```rust
/// use banquo_spatial::space::{GraphModel, SpatialModel};
///
/// let mut model = GraphModel::new(3);
/// model.add_edge(0, 1, 2.0).unwrap();
/// model.add_undirected_edge(1, 2, 1.0).unwrap();
///
/// assert_eq!(model.next(1), vec![(2, &1.0)]);
/// assert_eq!(model.previous(1).len(), 2);
/// assert!(model.add_edge(0, 3, 1.0).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct GraphModel<E> {
    graph: DiGraphMap<usize, E>,
    size: usize,
}

impl<E> GraphModel<E> {
    /// Create a model with `size` locations and no edges.
    pub fn new(size: usize) -> Self {
        let mut graph = DiGraphMap::new();

        for location in 0..size {
            graph.add_node(location);
        }

        Self { graph, size }
    }

    /// Create a model from a list of `(from, to, edge)` triples.
    pub fn from_edges<I>(size: usize, edges: I) -> Result<Self, SpaceError>
    where
        I: IntoIterator<Item = (usize, usize, E)>,
    {
        let mut model = Self::new(size);

        for (from, to, edge) in edges {
            model.add_edge(from, to, edge)?;
        }

        Ok(model)
    }

    fn check(&self, location: usize) -> Result<(), SpaceError> {
        if location < self.size {
            Ok(())
        } else {
            Err(SpaceError::LocationOutOfRange {
                location,
                size: self.size,
            })
        }
    }

    /// Add a directed edge, replacing any existing edge between the two locations.
    pub fn add_edge(&mut self, from: usize, to: usize, edge: E) -> Result<(), SpaceError> {
        self.check(from)?;
        self.check(to)?;
        self.graph.add_edge(from, to, edge);
        Ok(())
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl<E: Clone> GraphModel<E> {
    /// Add an edge in both directions.
    pub fn add_undirected_edge(
        &mut self,
        from: usize,
        to: usize,
        edge: E,
    ) -> Result<(), SpaceError> {
        self.add_edge(from, to, edge.clone())?;
        self.add_edge(to, from, edge)
    }
}

impl<E> SpatialModel<E> for GraphModel<E> {
    fn size(&self) -> usize {
        self.size
    }

    fn next(&self, location: usize) -> Vec<(usize, &E)> {
        if location >= self.size {
            return Vec::new();
        }

        self.graph
            .edges(location)
            .map(|(_, to, edge)| (to, edge))
            .collect()
    }

    fn previous(&self, location: usize) -> Vec<(usize, &E)> {
        if location >= self.size {
            return Vec::new();
        }

        self.graph
            .neighbors_directed(location, Direction::Incoming)
            .filter_map(|from| self.graph.edge_weight(from, location).map(|edge| (from, edge)))
            .collect()
    }

    fn edge(&self, from: usize, to: usize) -> Option<&E> {
        self.graph.edge_weight(from, to)
    }
}

/// Rectangular grid where every location is connected to its horizontal and vertical neighbours.
///
/// Locations are numbered row by row, so location `l` sits at row `l / columns` and column
/// `l % columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularGridModel<E> {
    rows: usize,
    columns: usize,
    edge: E,
}

impl<E> RegularGridModel<E> {
    pub fn new(rows: usize, columns: usize, edge: E) -> Self {
        Self {
            rows,
            columns,
            edge,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// The `(row, column)` coordinates of a location.
    pub fn coordinates(&self, location: usize) -> (usize, usize) {
        (location / self.columns, location % self.columns)
    }

    pub fn location(&self, row: usize, column: usize) -> usize {
        row * self.columns + column
    }

    fn neighbours(&self, location: usize) -> Vec<(usize, &E)> {
        if location >= self.rows * self.columns {
            return Vec::new();
        }

        let (row, column) = self.coordinates(location);
        let mut neighbours = Vec::with_capacity(4);

        if row > 0 {
            neighbours.push((location - self.columns, &self.edge));
        }

        if column > 0 {
            neighbours.push((location - 1, &self.edge));
        }

        if column + 1 < self.columns {
            neighbours.push((location + 1, &self.edge));
        }

        if row + 1 < self.rows {
            neighbours.push((location + self.columns, &self.edge));
        }

        neighbours
    }
}

impl<E> SpatialModel<E> for RegularGridModel<E> {
    fn size(&self) -> usize {
        self.rows * self.columns
    }

    fn next(&self, location: usize) -> Vec<(usize, &E)> {
        self.neighbours(location)
    }

    fn previous(&self, location: usize) -> Vec<(usize, &E)> {
        self.neighbours(location)
    }

    fn edge(&self, from: usize, to: usize) -> Option<&E> {
        self.neighbours(from)
            .into_iter()
            .find(|(neighbour, _)| *neighbour == to)
            .map(|(_, edge)| edge)
    }
}

#[cfg(test)]
mod tests {
    use super::{GraphModel, RegularGridModel, SpaceError, SpatialModel};

    #[test]
    fn graph_model() -> Result<(), SpaceError> {
        let model = GraphModel::from_edges(4, [(0, 1, 1.0), (1, 2, 2.0), (3, 2, 0.5)])?;
        let mut incoming = model.previous(2);
        incoming.sort_by_key(|(from, _)| *from);

        assert_eq!(model.size(), 4);
        assert_eq!(model.edge_count(), 3);
        assert_eq!(model.next(0), vec![(1, &1.0)]);
        assert_eq!(incoming, vec![(1, &2.0), (3, &0.5)]);
        assert_eq!(model.edge(3, 2), Some(&0.5));
        assert_eq!(model.edge(2, 3), None);
        assert!(model.next(7).is_empty());

        Ok(())
    }

    #[test]
    fn graph_model_out_of_range() {
        let result = GraphModel::from_edges(2, [(0, 2, ())]);
        assert_eq!(
            result.map(|model| model.size()),
            Err(SpaceError::LocationOutOfRange { location: 2, size: 2 })
        );
    }

    #[test]
    fn grid_model() {
        let grid = RegularGridModel::new(3, 4, 1);
        let mut corner = grid.next(0).into_iter().map(|(l, _)| l).collect::<Vec<_>>();
        corner.sort_unstable();

        assert_eq!(grid.size(), 12);
        assert_eq!(corner, vec![1, 4]);
        assert_eq!(grid.coordinates(6), (1, 2));
        assert_eq!(grid.location(1, 2), 6);
        assert_eq!(grid.previous(5).len(), 4);
        assert_eq!(grid.edge(5, 9), Some(&1));
        assert_eq!(grid.edge(5, 10), None);
        assert_eq!(grid.next(3).into_iter().map(|(l, _)| l).collect::<Vec<_>>(), vec![2, 7]);
    }
}
