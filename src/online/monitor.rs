use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

use crate::domain::{AbstractInterval, IntervalDomain, SignalDomain};
use crate::formula::Formula;
use crate::interval::Interval;
use crate::monitor::MonitorError;
#[cfg(doc)]
use crate::monitor::MonitorBuilder;
use crate::operators::{eventually, globally, historically, once, since, until};
use crate::predicate::Atoms;
use crate::signal::{Signal, SpatialTemporalSignal};
use crate::space::{
    escape, everywhere, over_time, reach, somewhere, DistanceDomain, DistanceFactory,
    DistanceStructure, LocationService,
};

use super::window::{updates, Horizon};
use super::{ChainsCombinator, OnlineError, OnlineSignal, Update};

type Knowledge<D> = AbstractInterval<<D as SignalDomain>::Value>;

/// Updates of the output of a node, paired with the location they apply to.
type Changes<D> = Vec<(usize, Update<Knowledge<D>>)>;

#[derive(Debug, Clone, PartialEq)]
enum Operator {
    Atomic(String),
    Not,
    And,
    Or,
    Implies,
    Eventually(Option<Interval>),
    Globally(Option<Interval>),
    Once(Option<Interval>),
    Historically(Option<Interval>),
    Until(Option<Interval>),
    Since(Option<Interval>),
    Everywhere(String),
    Somewhere(String),
    Escape(String),
    Reach(String),
}

impl Operator {
    fn from_formula(formula: &Formula) -> Self {
        match formula {
            Formula::Atomic(id) => Self::Atomic(id.clone()),
            Formula::Not(_) => Self::Not,
            Formula::And(..) => Self::And,
            Formula::Or(..) => Self::Or,
            Formula::Implies(..) => Self::Implies,
            Formula::Eventually { interval, .. } => Self::Eventually(*interval),
            Formula::Globally { interval, .. } => Self::Globally(*interval),
            Formula::Once { interval, .. } => Self::Once(*interval),
            Formula::Historically { interval, .. } => Self::Historically(*interval),
            Formula::Until { interval, .. } => Self::Until(*interval),
            Formula::Since { interval, .. } => Self::Since(*interval),
            Formula::Everywhere { distance, .. } => Self::Everywhere(distance.clone()),
            Formula::Somewhere { distance, .. } => Self::Somewhere(distance.clone()),
            Formula::Escape { distance, .. } => Self::Escape(distance.clone()),
            Formula::Reach { distance, .. } => Self::Reach(distance.clone()),
        }
    }

    // Until and since accumulate over the whole signal even when bounded.
    fn horizon(&self) -> Horizon {
        match self {
            Self::Eventually(Some(interval)) | Self::Globally(Some(interval)) => {
                Horizon::Future(*interval)
            }
            Self::Once(Some(interval)) | Self::Historically(Some(interval)) => {
                Horizon::Past(*interval)
            }
            Self::Eventually(None) | Self::Globally(None) | Self::Until(_) => {
                Horizon::Future(Interval::unbounded())
            }
            Self::Once(None) | Self::Historically(None) | Self::Since(_) => {
                Horizon::Past(Interval::unbounded())
            }
            _ => Horizon::Pointwise,
        }
    }
}

struct Context<'a, S, D: SignalDomain, E, M> {
    domain: IntervalDomain<D>,
    atoms: &'a Atoms<S, D::Value>,
    distances: &'a HashMap<String, DistanceFactory<E, M>>,
    locations: Option<&'a LocationService<E>>,
}

struct Node<D: SignalDomain> {
    operator: Operator,
    children: Vec<Node<D>>,
    signals: Vec<OnlineSignal<D>>,
}

impl<D> Node<D>
where
    D: SignalDomain,
    D::Value: PartialOrd,
{
    fn new(formula: &Formula, domain: D, size: usize) -> Self {
        Self {
            operator: Operator::from_formula(formula),
            children: formula
                .children()
                .into_iter()
                .map(|child| Self::new(child, domain, size))
                .collect(),
            signals: (0..size).map(|_| OnlineSignal::new(domain)).collect(),
        }
    }

    fn initialize<S, E, M>(
        &mut self,
        ctx: &Context<'_, S, D, E, M>,
    ) -> Result<Changes<D>, OnlineError>
    where
        M: DistanceDomain,
    {
        let mut changed = Vec::new();

        for child in &mut self.children {
            changed.extend(child.initialize(ctx)?);
        }

        let mut changes = self.prefill(&ctx.domain)?;
        changes.extend(self.react(ctx, ranges(changed))?);

        Ok(changes)
    }

    /// Bounded past operators have no window before the lower bound of their interval, where they
    /// hold the value of an empty aggregate.
    fn prefill(&mut self, domain: &IntervalDomain<D>) -> Result<Changes<D>, OnlineError> {
        let (interval, value) = match &self.operator {
            Operator::Once(Some(interval)) | Operator::Since(Some(interval)) => {
                (*interval, domain.min())
            }
            Operator::Historically(Some(interval)) => (*interval, domain.max()),
            _ => return Ok(Vec::new()),
        };

        if interval.start() <= 0.0 {
            return Ok(Vec::new());
        }

        let update = Update::unchecked(0.0, interval.start(), value);
        let evaluated = (0..self.signals.len())
            .map(|location| (location, vec![update.clone()]))
            .collect();

        refine_all(&mut self.signals, evaluated)
    }

    fn input<S, E, M>(
        &mut self,
        ctx: &Context<'_, S, D, E, M>,
        location: usize,
        update: &Update<S>,
    ) -> Result<Changes<D>, OnlineError>
    where
        M: DistanceDomain,
    {
        if let Operator::Atomic(id) = &self.operator {
            let atom = ctx
                .atoms
                .get(id)
                .ok_or_else(|| MonitorError::UnknownAtom(id.clone()))?;

            let value = ctx.domain.lift(atom(update.start(), update.value()));
            let knowledge = Update::unchecked(update.start(), update.end(), value);

            return refine_all(&mut self.signals, vec![(location, vec![knowledge])]);
        }

        let mut changed = Vec::new();

        for child in &mut self.children {
            changed.extend(child.input(ctx, location, update)?);
        }

        self.react(ctx, ranges(changed))
    }

    /// Recompute the output affected by changes of the children over `(location, start, end)`.
    fn react<S, E, M>(
        &mut self,
        ctx: &Context<'_, S, D, E, M>,
        changed: Vec<(usize, f64, f64)>,
    ) -> Result<Changes<D>, OnlineError>
    where
        M: DistanceDomain,
    {
        let horizon = self.operator.horizon();
        let spatial = matches!(
            self.operator,
            Operator::Everywhere(_)
                | Operator::Somewhere(_)
                | Operator::Escape(_)
                | Operator::Reach(_)
        );

        let mut recomputed: Vec<(usize, f64, f64)> = Vec::new();
        let mut changes = Vec::new();

        for (location, start, end) in changed {
            let Some((from, to)) = horizon.affected(start, end) else {
                continue;
            };

            // Spatial operators recompute every location, so the location is not part of the key.
            let key = (if spatial { 0 } else { location }, from, to);

            if recomputed.contains(&key) {
                continue;
            }

            recomputed.push(key);

            let evaluated = self.evaluate(ctx, location, from, to)?;
            changes.extend(refine_all(&mut self.signals, evaluated)?);
        }

        if !changes.is_empty() {
            tracing::trace!(operator = ?self.operator, changes = changes.len(), "Updated node");
        }

        Ok(changes)
    }

    fn evaluate<S, E, M>(
        &self,
        ctx: &Context<'_, S, D, E, M>,
        location: usize,
        from: f64,
        to: f64,
    ) -> Result<Vec<(usize, Vec<Update<Knowledge<D>>>)>, OnlineError>
    where
        M: DistanceDomain,
    {
        let domain = &ctx.domain;
        let (lower, upper) = self.operator.horizon().inputs(from, to);
        let input = |index: usize| {
            self.children[index].signals[location]
                .chain()
                .to_signal(lower, upper)
        };

        let signal = match &self.operator {
            Operator::Atomic(_) => return Ok(Vec::new()),
            Operator::Not => {
                let negated = self.children[0].signals[location]
                    .chain()
                    .between(from, to)
                    .into_iter()
                    .map(|update| update.map(|value| domain.negation(&value)))
                    .collect();

                return Ok(vec![(location, negated)]);
            }
            Operator::And => {
                let combined = self.pointwise(location, from, to, |l, r| {
                    domain.conjunction(l, r)
                })?;
                return Ok(vec![(location, combined)]);
            }
            Operator::Or => {
                let combined = self.pointwise(location, from, to, |l, r| {
                    domain.disjunction(l, r)
                })?;
                return Ok(vec![(location, combined)]);
            }
            Operator::Implies => {
                let combined = self.pointwise(location, from, to, |l, r| {
                    domain.disjunction(&domain.negation(l), r)
                })?;
                return Ok(vec![(location, combined)]);
            }
            Operator::Eventually(interval) => eventually(domain, &input(0), interval.as_ref()),
            Operator::Globally(interval) => globally(domain, &input(0), interval.as_ref()),
            Operator::Once(interval) => once(domain, &input(0), interval.as_ref()),
            Operator::Historically(interval) => historically(domain, &input(0), interval.as_ref()),
            Operator::Until(interval) => until(domain, &input(0), &input(1), interval.as_ref()),
            Operator::Since(interval) => since(domain, &input(0), &input(1), interval.as_ref()),
            Operator::Everywhere(distance) => {
                return self.spatial(ctx, distance, from, to, |values, structure| {
                    everywhere(domain, values, structure)
                });
            }
            Operator::Somewhere(distance) => {
                return self.spatial(ctx, distance, from, to, |values, structure| {
                    somewhere(domain, values, structure)
                });
            }
            Operator::Escape(distance) => {
                return self.spatial(ctx, distance, from, to, |values, structure| {
                    escape(domain, values, structure)
                });
            }
            Operator::Reach(distance) => {
                let size = self.signals.len();

                return self.spatial(ctx, distance, from, to, |values, structure| {
                    let (left, right) = values.split_at(size);
                    reach(domain, left, right, structure)
                });
            }
        };

        Ok(vec![(location, updates(&signal, from, to))])
    }

    fn pointwise<F>(
        &self,
        location: usize,
        from: f64,
        to: f64,
        op: F,
    ) -> Result<Vec<Update<Knowledge<D>>>, OnlineError>
    where
        F: Fn(&Knowledge<D>, &Knowledge<D>) -> Knowledge<D>,
    {
        let mut combinator = ChainsCombinator::new();

        for update in self.children[0].signals[location].chain().between(from, to) {
            combinator.push_left(update)?;
        }

        for update in self.children[1].signals[location].chain().between(from, to) {
            combinator.push_right(update)?;
        }

        Ok(combinator.combine(op))
    }

    fn spatial<S, E, M, F>(
        &self,
        ctx: &Context<'_, S, D, E, M>,
        distance: &str,
        from: f64,
        to: f64,
        op: F,
    ) -> Result<Vec<(usize, Vec<Update<Knowledge<D>>>)>, OnlineError>
    where
        F: Fn(&[Knowledge<D>], &dyn DistanceStructure<E, M>) -> Vec<Knowledge<D>>,
    {
        let locations = ctx.locations.ok_or(MonitorError::MissingLocationService)?;
        let factory = ctx
            .distances
            .get(distance)
            .ok_or_else(|| MonitorError::UnknownDistance(distance.to_string()))?;

        // Operands are laid end to end, one signal per location each.
        let inputs = self
            .children
            .iter()
            .flat_map(|child| child.signals.iter())
            .map(|signal| signal.chain().to_signal(from, to))
            .collect::<Vec<_>>();

        let signals = inputs.iter().collect::<Vec<_>>();
        let outputs = over_time(&signals, self.signals.len(), locations, factory, op)?;

        Ok(outputs
            .iter()
            .map(|signal| updates(signal, from, to))
            .enumerate()
            .collect())
    }
}

fn ranges<V>(changes: Vec<(usize, Update<V>)>) -> Vec<(usize, f64, f64)> {
    changes
        .into_iter()
        .map(|(location, update)| (location, update.start(), update.end()))
        .collect()
}

type Evaluated<D> = Vec<(usize, Vec<Update<Knowledge<D>>>)>;

/// Refine the signal of each location with its updates and collect the changes.
fn refine_all<D>(
    signals: &mut [OnlineSignal<D>],
    evaluated: Evaluated<D>,
) -> Result<Changes<D>, OnlineError>
where
    D: SignalDomain,
    D::Value: PartialOrd,
{
    let mut changes = Vec::new();

    for (location, updates) in evaluated {
        let Some(signal) = signals.get_mut(location) else {
            continue;
        };

        for update in &updates {
            changes.extend(signal.refine(update)?.into_iter().map(|change| (location, change)));
        }
    }

    Ok(changes)
}

/// Incremental monitor for a formula.
///
/// Created using [`MonitorBuilder::build_online`] for a single location or
/// [`MonitorBuilder::build_online_spatial`] for every location of a spatial model. Outputs are
/// interval-valued: the true value of the formula at a time and location always lies within the
/// reported interval, and the interval narrows as more of the input becomes known.
pub struct OnlineMonitor<S, D: SignalDomain, E = f64, M = f64> {
    formula: Formula,
    domain: IntervalDomain<D>,
    atoms: Atoms<S, D::Value>,
    distances: HashMap<String, DistanceFactory<E, M>>,
    locations: Option<LocationService<E>>,
    root: Node<D>,
}

impl<S, D, E, M> OnlineMonitor<S, D, E, M>
where
    D: SignalDomain,
    D::Value: PartialOrd,
    M: DistanceDomain,
{
    pub(crate) fn new(
        formula: Formula,
        domain: D,
        atoms: Atoms<S, D::Value>,
        distances: HashMap<String, DistanceFactory<E, M>>,
        locations: Option<LocationService<E>>,
    ) -> Result<Self, OnlineError> {
        let size = match &locations {
            Some(locations) => locations.size().ok_or(MonitorError::MissingLocationService)?,
            None if formula.is_spatial() => return Err(MonitorError::MissingLocationService.into()),
            None => 1,
        };

        let domain = IntervalDomain::new(domain);
        let mut root = Node::new(&formula, *domain.inner(), size);

        let ctx = Context {
            domain,
            atoms: &atoms,
            distances: &distances,
            locations: locations.as_ref(),
        };

        let initial = root.initialize(&ctx)?;
        tracing::debug!(
            formula = %formula,
            locations = size,
            initial = initial.len(),
            "Built online monitor"
        );

        Ok(Self {
            formula,
            domain,
            atoms,
            distances,
            locations,
            root,
        })
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn domain(&self) -> &IntervalDomain<D> {
        &self.domain
    }

    /// Number of locations the monitor tracks.
    pub fn locations(&self) -> usize {
        self.root.signals.len()
    }

    /// Deliver an input update for a location and return the changes of the output.
    ///
    /// Updates may arrive in any order and may overlap previous updates. Every returned update
    /// covers a range where the knowledge of the output at the paired location became narrower.
    pub fn monitor(
        &mut self,
        location: usize,
        update: Update<S>,
    ) -> Result<Changes<D>, OnlineError> {
        let size = self.locations();

        if location >= size {
            return Err(OnlineError::LocationOutOfRange { location, size });
        }

        let ctx = Context {
            domain: self.domain,
            atoms: &self.atoms,
            distances: &self.distances,
            locations: self.locations.as_ref(),
        };

        let changes = self.root.input(&ctx, location, &update)?;

        tracing::trace!(
            location,
            start = update.start(),
            end = update.end(),
            changes = changes.len(),
            "Processed update"
        );

        Ok(changes)
    }

    /// Current knowledge of the output at a location and time.
    pub fn value_at(&self, location: usize, time: f64) -> Option<&Knowledge<D>> {
        self.root.signals.get(location)?.value_at(time)
    }

    /// Current knowledge of the output at a location.
    pub fn signal(&self, location: usize) -> Option<&OnlineSignal<D>> {
        self.root.signals.get(location)
    }

    /// Current knowledge of the output at every location as an offline signal.
    pub fn output(&self) -> SpatialTemporalSignal<Knowledge<D>> {
        let signals: Vec<Signal<_>> =
            self.root.signals.iter().map(OnlineSignal::to_signal).collect();

        SpatialTemporalSignal::from_signals(signals)
    }
}

impl<S, D: SignalDomain, E, M> Debug for OnlineMonitor<S, D, E, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnlineMonitor")
            .field("formula", &self.formula.to_string())
            .field("domain", &self.domain)
            .field("atoms", &self.atoms)
            .field("locations", &self.root.signals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::domain::{AbstractInterval, BooleanDomain, DoubleDomain};
    use crate::formula::Formula;
    use crate::interval::Interval;
    use crate::monitor::{Monitor, MonitorError};
    use crate::online::{OnlineError, Update};
    use crate::space::{DefaultDistanceStructure, GraphModel, LocationService};

    #[test]
    fn out_of_order_updates() -> Result<(), Box<dyn Error>> {
        let formula = Formula::globally_within(Interval::new(0.0, 1.0)?, Formula::atomic("p"));
        let mut monitor = Monitor::builder(DoubleDomain)
            .atom("p", |x: &f64| *x)
            .build_online(formula)?;

        monitor.monitor(0, Update::new(2.0, 4.0, 1.0)?)?;

        assert_eq!(monitor.value_at(0, 2.5), Some(&AbstractInterval::point(1.0)));
        let bounded = AbstractInterval::new(f64::NEG_INFINITY, 1.0)?;
        assert_eq!(monitor.value_at(0, 1.5), Some(&bounded));

        monitor.monitor(0, Update::new(1.0, 2.0, -1.0)?)?;
        monitor.monitor(0, Update::new(0.0, 1.0, 1.0)?)?;

        assert_eq!(monitor.value_at(0, 0.0), Some(&AbstractInterval::point(-1.0)));
        assert_eq!(monitor.value_at(0, 1.9), Some(&AbstractInterval::point(-1.0)));
        assert_eq!(monitor.value_at(0, 2.0), Some(&AbstractInterval::point(1.0)));
        assert_eq!(monitor.value_at(0, 3.5), Some(&bounded));
        assert_eq!(monitor.value_at(0, 4.0), Some(&monitor.domain().unknown()));

        Ok(())
    }

    #[test]
    fn bounded_past_starts_known() -> Result<(), Box<dyn Error>> {
        let formula = Formula::once_within(Interval::new(1.0, 2.0)?, Formula::atomic("p"));
        let mut monitor = Monitor::builder(BooleanDomain)
            .atom("p", |x: &f64| *x > 0.0)
            .build_online(formula)?;

        assert_eq!(monitor.value_at(0, 0.5), Some(&AbstractInterval::point(false)));
        assert_eq!(monitor.value_at(0, 1.0), Some(&AbstractInterval::new(false, true)?));

        let changes = monitor.monitor(0, Update::new(0.0, 3.0, 1.0)?)?;

        assert_eq!(changes, vec![(0, Update::new(1.0, 5.0, AbstractInterval::point(true))?)]);
        assert_eq!(monitor.value_at(0, 5.0), Some(&AbstractInterval::new(false, true)?));

        Ok(())
    }

    #[test]
    fn spatial_updates() -> Result<(), Box<dyn Error>> {
        let mut model = GraphModel::new(3);
        model.add_undirected_edge(0, 1, 1.0)?;
        model.add_undirected_edge(1, 2, 1.0)?;

        let mut monitor = Monitor::builder(BooleanDomain)
            .atom("p", |x: &f64| *x > 0.0)
            .distance("near", DefaultDistanceStructure::factory(|e: &f64| *e, 0.0, 1.0))
            .build_online_spatial(
                Formula::somewhere("near", Formula::atomic("p")),
                LocationService::constant(model),
            )?;

        let changes = monitor.monitor(0, Update::new(0.0, 2.0, 1.0)?)?;
        let locations = changes.iter().map(|(location, _)| *location).collect::<Vec<_>>();

        assert_eq!(locations, vec![0, 1]);
        assert_eq!(monitor.value_at(1, 1.0), Some(&AbstractInterval::point(true)));
        assert_eq!(monitor.value_at(2, 1.0), Some(&AbstractInterval::new(false, true)?));
        assert_eq!(
            monitor.monitor(5, Update::new(0.0, 1.0, 1.0)?).err(),
            Some(OnlineError::LocationOutOfRange { location: 5, size: 3 })
        );

        Ok(())
    }

    #[test]
    fn spatial_formula_requires_locations() -> Result<(), Box<dyn Error>> {
        let result = Monitor::builder(BooleanDomain)
            .atom("p", |x: &f64| *x > 0.0)
            .distance("near", DefaultDistanceStructure::factory(|e: &f64| *e, 0.0, 1.0))
            .build_online(Formula::everywhere("near", Formula::atomic("p")));

        assert_eq!(
            result.err(),
            Some(OnlineError::Monitor(MonitorError::MissingLocationService))
        );

        Ok(())
    }
}
