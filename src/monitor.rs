//! Offline monitoring of complete signals.
//!
//! A [`Monitor`] pairs a [`Formula`] with a [`SignalDomain`], the atomic propositions the formula
//! refers to, and for spatial formulas the distance structures its spatial operators use. Monitors
//! are created using a [`MonitorBuilder`], which checks that every identifier used by the formula
//! has been registered.
//!
//! ```rust
//! use banquo_spatial::domain::BooleanDomain;
//! use banquo_spatial::{Formula, Interval, Monitor, Signal};
//!
//! let interval = Interval::new(0.0, 1.0).unwrap();
//! let formula = Formula::eventually_within(interval, Formula::atomic("x"));
//! let monitor = Monitor::builder(BooleanDomain)
//!     .atom("x", |x: &f64| *x >= 0.0)
//!     .build(formula)
//!     .unwrap();
//!
//! let signal = Signal::from_samples([(0.0, -1.0), (1.0, 1.0), (2.0, -1.0)]).unwrap();
//! let output = monitor.monitor(&signal).unwrap();
//!
//! assert_eq!(output.value_at(0.0), Some(&true));
//! assert_eq!(output.value_at(1.0), Some(&true));
//! assert_eq!(output.value_at(2.0), Some(&false));
//! ```
//!
//! The formula is evaluated bottom-up: each node produces one output signal per location, which
//! is then consumed by its parent. Temporal operators are applied to each location independently,
//! while spatial operators combine the values of every location at each time.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

use thiserror::Error;

use crate::domain::SignalDomain;
use crate::formula::Formula;
use crate::online::{OnlineError, OnlineMonitor};
use crate::operators::{eventually, globally, historically, once, since, until};
use crate::predicate::Atoms;
use crate::signal::{Signal, SignalError, SpatialTemporalSignal};
use crate::space::{
    escape, everywhere, over_time, reach, somewhere, DistanceDomain, DistanceFactory,
    DistanceStructure, LocationService, SpaceError,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MonitorError {
    #[error("Unknown atomic proposition \"{0}\"")]
    UnknownAtom(String),

    #[error("Unknown distance function \"{0}\"")]
    UnknownDistance(String),

    #[error("Spatial operators require a location service")]
    MissingLocationService,

    #[error(transparent)]
    Space(#[from] SpaceError),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Builder for [`Monitor`] instances.
pub struct MonitorBuilder<S, D: SignalDomain, E = f64, M = f64> {
    domain: D,
    atoms: Atoms<S, D::Value>,
    distances: HashMap<String, DistanceFactory<E, M>>,
}

impl<S, D, E, M> MonitorBuilder<S, D, E, M>
where
    D: SignalDomain,
{
    pub fn new(domain: D) -> Self {
        Self {
            domain,
            atoms: Atoms::new(),
            distances: HashMap::new(),
        }
    }

    /// Register an atomic proposition.
    pub fn atom<F>(mut self, id: impl Into<String>, atom: F) -> Self
    where
        F: Fn(&S) -> D::Value + Send + Sync + 'static,
    {
        self.atoms.insert(id, atom);
        self
    }

    /// Register an atomic proposition that also depends on the time a state starts holding at.
    pub fn timed_atom<F>(mut self, id: impl Into<String>, atom: F) -> Self
    where
        F: Fn(f64, &S) -> D::Value + Send + Sync + 'static,
    {
        self.atoms.insert_timed(id, atom);
        self
    }

    /// Replace the registered atomic propositions with a complete table.
    pub fn atoms(mut self, atoms: Atoms<S, D::Value>) -> Self {
        self.atoms = atoms;
        self
    }

    /// Register a distance structure factory used by spatial operators.
    pub fn distance(mut self, id: impl Into<String>, factory: DistanceFactory<E, M>) -> Self {
        self.distances.insert(id.into(), factory);
        self
    }

    fn validate(&self, formula: &Formula) -> Result<(), MonitorError> {
        if let Some(id) = formula.atoms().into_iter().find(|id| !self.atoms.contains(id)) {
            return Err(MonitorError::UnknownAtom(id.to_string()));
        }

        let distances = formula.distances();

        if let Some(id) = distances.into_iter().find(|id| !self.distances.contains_key(*id)) {
            return Err(MonitorError::UnknownDistance(id.to_string()));
        }

        Ok(())
    }

    /// Create a monitor for the given formula.
    ///
    /// Fails if the formula refers to an atomic proposition or a distance function that has not
    /// been registered.
    pub fn build(self, formula: Formula) -> Result<Monitor<S, D, E, M>, MonitorError> {
        self.validate(&formula)?;

        tracing::debug!(
            formula = %formula,
            atoms = self.atoms.len(),
            distances = self.distances.len(),
            "Built monitor"
        );

        Ok(Monitor {
            formula,
            domain: self.domain,
            atoms: self.atoms,
            distances: self.distances,
        })
    }
}

impl<S, D, E, M> MonitorBuilder<S, D, E, M>
where
    D: SignalDomain,
    D::Value: PartialOrd,
    M: DistanceDomain,
{
    /// Create an online monitor for a single location.
    ///
    /// Fails with [`MonitorError::MissingLocationService`] if the formula contains spatial
    /// operators.
    pub fn build_online(self, formula: Formula) -> Result<OnlineMonitor<S, D, E, M>, OnlineError> {
        self.validate(&formula)?;
        OnlineMonitor::new(formula, self.domain, self.atoms, self.distances, None)
    }

    /// Create an online monitor for every location of the models of `locations`.
    pub fn build_online_spatial(
        self,
        formula: Formula,
        locations: LocationService<E>,
    ) -> Result<OnlineMonitor<S, D, E, M>, OnlineError> {
        self.validate(&formula)?;
        OnlineMonitor::new(formula, self.domain, self.atoms, self.distances, Some(locations))
    }
}

/// Offline monitor for a formula.
///
/// `S` is the type of the states of the input signal, `D` the interpretation domain, `E` the type
/// of the edges of the spatial models and `M` the type of the distances between locations.
pub struct Monitor<S, D: SignalDomain, E = f64, M = f64> {
    formula: Formula,
    domain: D,
    atoms: Atoms<S, D::Value>,
    distances: HashMap<String, DistanceFactory<E, M>>,
}

impl<S, D> Monitor<S, D>
where
    D: SignalDomain,
{
    /// Start building a monitor using `f64` edges and distances.
    ///
    /// Monitors with other edge or distance types are built using [`MonitorBuilder::new`].
    pub fn builder(domain: D) -> MonitorBuilder<S, D> {
        MonitorBuilder::new(domain)
    }
}

type Locations<V> = Vec<Signal<V>>;

impl<S, D, E, M> Monitor<S, D, E, M>
where
    D: SignalDomain,
    M: DistanceDomain,
{
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Evaluate the formula over a single-location signal.
    ///
    /// Fails with [`MonitorError::MissingLocationService`] if the formula contains spatial
    /// operators.
    pub fn monitor(&self, signal: &Signal<S>) -> Result<Signal<D::Value>, MonitorError> {
        tracing::debug!(segments = signal.len(), "Monitoring signal");

        let mut output = self.evaluate(&self.formula, &[signal], None)?;
        Ok(output.pop().unwrap_or_default())
    }

    /// Evaluate the formula at every location of a spatio-temporal signal.
    pub fn monitor_spatial(
        &self,
        signal: &SpatialTemporalSignal<S>,
        locations: &LocationService<E>,
    ) -> Result<SpatialTemporalSignal<D::Value>, MonitorError> {
        if let Some(size) = locations.size() {
            if size != signal.locations() {
                return Err(SignalError::LocationMismatch {
                    expected: size,
                    found: signal.locations(),
                }
                .into());
            }
        }

        tracing::debug!(locations = signal.locations(), "Monitoring spatio-temporal signal");

        let input = signal.signals().iter().collect::<Vec<_>>();
        let output = self.evaluate(&self.formula, &input, Some(locations))?;

        Ok(SpatialTemporalSignal::from_signals(output))
    }

    fn evaluate(
        &self,
        formula: &Formula,
        input: &[&Signal<S>],
        locations: Option<&LocationService<E>>,
    ) -> Result<Locations<D::Value>, MonitorError> {
        let domain = &self.domain;
        let size = input.len();

        let output = match formula {
            Formula::Atomic(id) => {
                let atom = self
                    .atoms
                    .get(id)
                    .ok_or_else(|| MonitorError::UnknownAtom(id.clone()))?;

                input
                    .iter()
                    .map(|signal| signal.apply_timed(|time, state| atom(time, state)))
                    .collect()
            }
            Formula::Not(arg) => self.unary(arg, input, locations, |signal| {
                signal.apply(|value| domain.negation(value))
            })?,
            Formula::And(left, right) => self.binary(left, right, input, locations, |l, r| {
                l.apply_binary(r, |a, b| domain.conjunction(a, b))
            })?,
            Formula::Or(left, right) => self.binary(left, right, input, locations, |l, r| {
                l.apply_binary(r, |a, b| domain.disjunction(a, b))
            })?,
            Formula::Implies(left, right) => self.binary(left, right, input, locations, |l, r| {
                l.apply_binary(r, |a, b| domain.disjunction(&domain.negation(a), b))
            })?,
            Formula::Eventually { interval, arg } => self.unary(arg, input, locations, |signal| {
                eventually(domain, signal, interval.as_ref())
            })?,
            Formula::Globally { interval, arg } => self.unary(arg, input, locations, |signal| {
                globally(domain, signal, interval.as_ref())
            })?,
            Formula::Once { interval, arg } => self.unary(arg, input, locations, |signal| {
                once(domain, signal, interval.as_ref())
            })?,
            Formula::Historically { interval, arg } => {
                self.unary(arg, input, locations, |signal| {
                    historically(domain, signal, interval.as_ref())
                })?
            }
            Formula::Until {
                interval,
                left,
                right,
            } => self.binary(left, right, input, locations, |l, r| {
                until(domain, l, r, interval.as_ref())
            })?,
            Formula::Since {
                interval,
                left,
                right,
            } => self.binary(left, right, input, locations, |l, r| {
                since(domain, l, r, interval.as_ref())
            })?,
            Formula::Everywhere { distance, arg } => {
                let values = self.evaluate(arg, input, locations)?;
                self.spatial(distance, &values, size, locations, |values, structure| {
                    everywhere(domain, values, structure)
                })?
            }
            Formula::Somewhere { distance, arg } => {
                let values = self.evaluate(arg, input, locations)?;
                self.spatial(distance, &values, size, locations, |values, structure| {
                    somewhere(domain, values, structure)
                })?
            }
            Formula::Escape { distance, arg } => {
                let values = self.evaluate(arg, input, locations)?;
                self.spatial(distance, &values, size, locations, |values, structure| {
                    escape(domain, values, structure)
                })?
            }
            Formula::Reach {
                distance,
                left,
                right,
            } => {
                // Both operands are laid end to end and split again at each time.
                let mut values = self.evaluate(left, input, locations)?;
                values.extend(self.evaluate(right, input, locations)?);

                self.spatial(distance, &values, size, locations, |values, structure| {
                    let (left, right) = values.split_at(size);
                    reach(domain, left, right, structure)
                })?
            }
        };

        tracing::trace!(formula = %formula, "Evaluated formula");
        Ok(output)
    }

    fn unary<F>(
        &self,
        arg: &Formula,
        input: &[&Signal<S>],
        locations: Option<&LocationService<E>>,
        op: F,
    ) -> Result<Locations<D::Value>, MonitorError>
    where
        F: Fn(&Signal<D::Value>) -> Signal<D::Value>,
    {
        let values = self.evaluate(arg, input, locations)?;
        Ok(values.iter().map(op).collect())
    }

    fn binary<F>(
        &self,
        left: &Formula,
        right: &Formula,
        input: &[&Signal<S>],
        locations: Option<&LocationService<E>>,
        op: F,
    ) -> Result<Locations<D::Value>, MonitorError>
    where
        F: Fn(&Signal<D::Value>, &Signal<D::Value>) -> Signal<D::Value>,
    {
        let left = self.evaluate(left, input, locations)?;
        let right = self.evaluate(right, input, locations)?;

        Ok(left.iter().zip(&right).map(|(l, r)| op(l, r)).collect())
    }

    fn spatial<F>(
        &self,
        distance: &str,
        values: &[Signal<D::Value>],
        size: usize,
        locations: Option<&LocationService<E>>,
        op: F,
    ) -> Result<Locations<D::Value>, MonitorError>
    where
        F: Fn(&[D::Value], &dyn DistanceStructure<E, M>) -> Vec<D::Value>,
    {
        let locations = locations.ok_or(MonitorError::MissingLocationService)?;
        let factory = self
            .distances
            .get(distance)
            .ok_or_else(|| MonitorError::UnknownDistance(distance.to_string()))?;

        let signals = values.iter().collect::<Vec<_>>();
        Ok(over_time(&signals, size, locations, factory, op)?)
    }
}

impl<S, D: SignalDomain, E, M> Debug for Monitor<S, D, E, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut distances = self.distances.keys().collect::<Vec<_>>();
        distances.sort_unstable();

        f.debug_struct("Monitor")
            .field("formula", &self.formula.to_string())
            .field("domain", &self.domain)
            .field("atoms", &self.atoms)
            .field("distances", &distances)
            .finish()
    }
}
