use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use super::{SpaceError, SpatialModel};

/// Spatial model shared between the location service and the distance structures built from it.
pub type SharedModel<E> = Arc<dyn SpatialModel<E> + Send + Sync>;

/// Sequence of spatial models indexed by time.
///
/// Each model holds from its time until the time of the next model. A service built with
/// [`LocationService::constant`] provides the same model at every time.
///
/// ```rust
/// use banquo_spatial::space::{GraphModel, LocationService};
///
/// let mut service = LocationService::new();
/// service.add(0.0, GraphModel::<f64>::new(2)).unwrap();
/// service.add(5.0, GraphModel::<f64>::new(2)).unwrap();
///
/// assert!(service.model_at(-1.0).is_none());
/// assert_eq!(service.next_change(1.0), Some(5.0));
/// assert_eq!(service.next_change(5.0), None);
/// ```
pub struct LocationService<E> {
    models: Vec<(f64, SharedModel<E>)>,
}

impl<E> LocationService<E> {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Create a service providing the same model at every time.
    pub fn constant<M>(model: M) -> Self
    where
        M: SpatialModel<E> + Send + Sync + 'static,
    {
        Self::constant_shared(Arc::new(model))
    }

    pub fn constant_shared(model: SharedModel<E>) -> Self {
        Self {
            models: vec![(f64::NEG_INFINITY, model)],
        }
    }

    /// Add a model holding from `time` onward.
    ///
    /// Times must be strictly increasing and every model must have the same number of locations.
    pub fn add<M>(&mut self, time: f64, model: M) -> Result<(), SpaceError>
    where
        M: SpatialModel<E> + Send + Sync + 'static,
    {
        self.add_shared(time, Arc::new(model))
    }

    pub fn add_shared(&mut self, time: f64, model: SharedModel<E>) -> Result<(), SpaceError> {
        if time.is_nan() {
            return Err(SpaceError::NanTime);
        }

        if let Some((previous, last)) = self.models.last() {
            if time <= *previous {
                return Err(SpaceError::NonMonotonic {
                    previous: *previous,
                    time,
                });
            }

            if last.size() != model.size() {
                return Err(SpaceError::SizeMismatch {
                    expected: last.size(),
                    found: model.size(),
                });
            }
        }

        self.models.push((time, model));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The number of locations of the models, if any model has been added.
    pub fn size(&self) -> Option<usize> {
        self.models.first().map(|(_, model)| model.size())
    }

    /// The times at which the model changes.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.models.iter().map(|(time, _)| *time)
    }

    fn index_at(&self, time: f64) -> Option<usize> {
        self.models
            .partition_point(|(start, _)| *start <= time)
            .checked_sub(1)
    }

    /// The model holding at `time`, if any.
    pub fn model_at(&self, time: f64) -> Option<&SharedModel<E>> {
        self.index_at(time).map(|index| &self.models[index].1)
    }

    /// The model holding at `time` together with the time it started holding.
    pub(crate) fn entry_at(&self, time: f64) -> Option<(f64, &SharedModel<E>)> {
        self.index_at(time)
            .map(|index| (self.models[index].0, &self.models[index].1))
    }

    /// The first time after `time` at which the model changes.
    pub fn next_change(&self, time: f64) -> Option<f64> {
        let index = self.models.partition_point(|(start, _)| *start <= time);
        self.models.get(index).map(|(start, _)| *start)
    }
}

impl<E> Default for LocationService<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for LocationService<E> {
    fn clone(&self) -> Self {
        Self {
            models: self.models.clone(),
        }
    }
}

impl<E> Debug for LocationService<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationService")
            .field("times", &self.times().collect::<Vec<_>>())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::LocationService;
    use crate::space::{GraphModel, RegularGridModel, SpaceError, SpatialModel};

    #[test]
    fn constant_service() {
        let service = LocationService::constant(RegularGridModel::new(2, 2, 1.0));

        assert_eq!(service.len(), 1);
        assert_eq!(service.size(), Some(4));
        assert_eq!(service.model_at(-1e9).map(|model| model.size()), Some(4));
        assert_eq!(service.next_change(0.0), None);
    }

    #[test]
    fn time_varying_service() -> Result<(), SpaceError> {
        let mut service = LocationService::new();
        service.add(0.0, GraphModel::from_edges(3, [(0, 1, 1.0)])?)?;
        service.add(2.0, GraphModel::from_edges(3, [(1, 2, 1.0)])?)?;

        let edges_at = |time: f64| service.model_at(time).map(|model| model.next(1).len());

        assert_eq!(edges_at(-0.5), None);
        assert_eq!(edges_at(0.0), Some(0));
        assert_eq!(edges_at(1.9), Some(0));
        assert_eq!(edges_at(2.0), Some(1));
        assert_eq!(service.next_change(-1.0), Some(0.0));
        assert_eq!(service.next_change(0.0), Some(2.0));
        assert_eq!(service.entry_at(3.0).map(|(time, _)| time), Some(2.0));

        Ok(())
    }

    #[test]
    fn invalid_additions() {
        let mut service = LocationService::new();

        assert_eq!(service.add(1.0, GraphModel::<()>::new(2)), Ok(()));
        assert_eq!(
            service.add(1.0, GraphModel::new(2)),
            Err(SpaceError::NonMonotonic { previous: 1.0, time: 1.0 })
        );
        assert_eq!(service.add(f64::NAN, GraphModel::new(2)), Err(SpaceError::NanTime));
        assert_eq!(
            service.add(2.0, GraphModel::new(3)),
            Err(SpaceError::SizeMismatch { expected: 2, found: 3 })
        );
    }
}
