use std::error::Error;
use std::sync::Arc;

use banquo_spatial::domain::{BooleanDomain, DoubleDomain};
use banquo_spatial::space::{
    DefaultDistanceStructure, DistanceStructure, GraphModel, IntManhattanDistanceStructure,
    LocationService, RegularGridModel, SharedModel, SpaceError,
};
use banquo_spatial::{Formula, Monitor, MonitorBuilder, MonitorError, SpatialTemporalSignal};

type TestResult = Result<(), Box<dyn Error>>;

fn line(size: usize) -> Result<GraphModel<f64>, Box<dyn Error>> {
    let mut model = GraphModel::new(size);

    for location in 1..size {
        model.add_undirected_edge(location - 1, location, 1.0)?;
    }

    Ok(model)
}

#[test]
fn manhattan_neighbourhood_of_grid_center() -> TestResult {
    let grid = Arc::new(RegularGridModel::new(3, 3, 1.0));
    let structure = IntManhattanDistanceStructure::new(0, 1, grid)?;

    assert_eq!(structure.neighbourhood(4), vec![1, 3, 5, 7]);
    assert_eq!(structure.neighbourhood(0), vec![1, 3]);
    assert!(structure.are_within_bounds(4, 4));
    assert!(!structure.are_within_bounds(0, 8));

    Ok(())
}

#[test]
fn everywhere_over_a_grid() -> TestResult {
    let grid = Arc::new(RegularGridModel::new(3, 3, 1.0));
    let shared: SharedModel<f64> = grid.clone();
    let locations = LocationService::constant_shared(shared);

    let monitor = MonitorBuilder::new(DoubleDomain)
        .atom("x", |x: &f64| *x)
        .distance("adjacent", IntManhattanDistanceStructure::factory(0, 1, grid))
        .build(Formula::everywhere("adjacent", Formula::atomic("x")))?;

    let values = (0..9).map(|location| location as f64).collect::<Vec<_>>();
    let signal = SpatialTemporalSignal::from_samples(9, [(0.0, values.clone()), (1.0, values)])?;
    let output = monitor.monitor_spatial(&signal, &locations)?;

    assert_eq!(output.value_at(4, 0.0), Some(&1.0));
    assert_eq!(output.value_at(0, 0.5), Some(&0.0));
    assert_eq!(output.value_at(8, 1.0), Some(&5.0));

    Ok(())
}

#[test]
fn reach_is_bounded_by_distance() -> TestResult {
    let locations = LocationService::constant(line(4)?);
    let signal = SpatialTemporalSignal::from_samples(
        4,
        [
            (0.0, vec![(1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]),
            (1.0, vec![(1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]),
        ],
    )?;

    let monitor = |upper: f64| {
        Monitor::builder(BooleanDomain)
            .atom("safe", |state: &(f64, f64)| state.0 > 0.0)
            .atom("goal", |state: &(f64, f64)| state.1 > 0.0)
            .distance("hops", DefaultDistanceStructure::factory(|e: &f64| *e, 0.0, upper))
            .build(Formula::reach("hops", Formula::atomic("safe"), Formula::atomic("goal")))
    };

    let output = monitor(2.0)?.monitor_spatial(&signal, &locations)?;
    let values = (0..4).map(|l| output.value_at(l, 0.0).copied()).collect::<Vec<_>>();

    assert_eq!(values, vec![Some(true), Some(true), Some(true), Some(false)]);

    let output = monitor(1.0)?.monitor_spatial(&signal, &locations)?;

    assert_eq!(output.value_at(0, 0.0), Some(&false));
    assert_eq!(output.value_at(1, 0.0), Some(&true));

    Ok(())
}

#[test]
fn escape_from_a_line() -> TestResult {
    let locations = LocationService::constant(line(4)?);
    let values = vec![1.0, 1.0, 1.0, -1.0];
    let signal = SpatialTemporalSignal::from_samples(4, [(0.0, values.clone()), (2.0, values)])?;

    let monitor = Monitor::builder(BooleanDomain)
        .atom("free", |x: &f64| *x > 0.0)
        .distance("far", DefaultDistanceStructure::factory(|e: &f64| *e, 2.0, 10.0))
        .build(Formula::escape("far", Formula::atomic("free")))?;

    let output = monitor.monitor_spatial(&signal, &locations)?;
    let values = (0..4).map(|l| output.value_at(l, 1.0).copied()).collect::<Vec<_>>();

    assert_eq!(values, vec![Some(true), Some(false), Some(true), Some(false)]);

    Ok(())
}

#[test]
fn changing_topology() -> TestResult {
    let mut locations = LocationService::new();
    locations.add(0.0, line(2)?)?;
    locations.add(1.0, GraphModel::<f64>::new(2))?;

    let signal = SpatialTemporalSignal::from_samples(
        2,
        [(0.0, vec![1.0, -1.0]), (2.0, vec![1.0, -1.0])],
    )?;

    let monitor = Monitor::builder(BooleanDomain)
        .atom("p", |x: &f64| *x > 0.0)
        .distance("near", DefaultDistanceStructure::factory(|e: &f64| *e, 0.0, 1.0))
        .build(Formula::somewhere("near", Formula::atomic("p")))?;

    let output = monitor.monitor_spatial(&signal, &locations)?;

    assert_eq!(output.value_at(1, 0.5), Some(&true));
    assert_eq!(output.value_at(1, 1.5), Some(&false));
    assert_eq!(output.value_at(0, 1.5), Some(&true));
    assert_eq!(output.signal(1).and_then(|signal| signal.end()), Some(2.0));

    Ok(())
}

#[test]
fn spatio_temporal_nesting() -> TestResult {
    let locations = LocationService::constant(line(3)?);
    let signal = SpatialTemporalSignal::from_samples(
        3,
        [
            (0.0, vec![-1.0, -1.0, -1.0]),
            (1.0, vec![-1.0, -1.0, 2.0]),
            (2.0, vec![-1.0, -1.0, -1.0]),
            (3.0, vec![-1.0, -1.0, -1.0]),
        ],
    )?;

    let formula = Formula::eventually(Formula::somewhere("near", Formula::atomic("x")));
    let monitor = Monitor::builder(DoubleDomain)
        .atom("x", |x: &f64| *x)
        .distance("near", DefaultDistanceStructure::factory(|e: &f64| *e, 0.0, 1.0))
        .build(formula)?;

    let output = monitor.monitor_spatial(&signal, &locations)?;

    assert_eq!(output.value_at(1, 0.0), Some(&2.0));
    assert_eq!(output.value_at(0, 0.0), Some(&-1.0));
    assert_eq!(output.value_at(2, 2.0), Some(&-1.0));

    Ok(())
}

#[test]
fn grid_size_must_match_locations() -> TestResult {
    let locations = LocationService::constant(line(2)?);
    let grid = Arc::new(RegularGridModel::new(3, 3, 1.0));

    let monitor = MonitorBuilder::new(DoubleDomain)
        .atom("x", |x: &f64| *x)
        .distance("adjacent", IntManhattanDistanceStructure::factory(0, 1, grid))
        .build(Formula::everywhere("adjacent", Formula::atomic("x")))?;

    let signal = SpatialTemporalSignal::from_samples(2, [(0.0, vec![1.0, 2.0])])?;
    let result = monitor.monitor_spatial(&signal, &locations);

    assert!(matches!(
        result,
        Err(MonitorError::Space(SpaceError::SizeMismatch { expected: 9, found: 2 }))
    ));

    Ok(())
}

#[test]
fn reach_with_zero_length_self_loops() -> TestResult {
    let mut looped = line(4)?;

    for location in 0..4 {
        looped.add_edge(location, location, 0.0)?;
    }

    let signal = SpatialTemporalSignal::from_samples(
        4,
        [
            (0.0, vec![(2.0, -1.0), (1.0, -3.0), (-1.0, 4.0), (3.0, -1.0)]),
            (1.0, vec![(2.0, 5.0), (-2.0, -3.0), (1.0, -4.0), (3.0, -1.0)]),
            (2.0, vec![(2.0, 5.0), (-2.0, -3.0), (1.0, -4.0), (3.0, -1.0)]),
        ],
    )?;

    let monitor = Monitor::builder(DoubleDomain)
        .atom("safe", |state: &(f64, f64)| state.0)
        .atom("goal", |state: &(f64, f64)| state.1)
        .distance("near", DefaultDistanceStructure::factory(|e: &f64| *e, 0.0, 2.0))
        .build(Formula::reach("near", Formula::atomic("safe"), Formula::atomic("goal")))?;

    let plain = monitor.monitor_spatial(&signal, &LocationService::constant(line(4)?))?;
    let output = monitor.monitor_spatial(&signal, &LocationService::constant(looped))?;

    for location in 0..4 {
        for time in [0.0, 0.5, 1.0, 2.0] {
            assert_eq!(output.value_at(location, time), plain.value_at(location, time));
        }
    }

    assert_eq!(output.value_at(1, 0.0), Some(&1.0));

    Ok(())
}

#[test]
fn grid_weights_change_over_time() -> TestResult {
    let mut locations = LocationService::new();
    locations.add(0.0, RegularGridModel::new(2, 2, 1.0))?;
    locations.add(1.0, RegularGridModel::new(2, 2, 5.0))?;

    let values = vec![0.0, 0.0, 0.0, 1.0];
    let signal = SpatialTemporalSignal::from_samples(4, [(0.0, values.clone()), (2.0, values)])?;

    let monitor = Monitor::builder(BooleanDomain)
        .atom("hot", |x: &f64| *x > 0.0)
        .distance("near", DefaultDistanceStructure::factory(|e: &f64| *e, 0.0, 1.0))
        .build(Formula::somewhere("near", Formula::atomic("hot")))?;

    let output = monitor.monitor_spatial(&signal, &locations)?;

    assert_eq!(output.value_at(1, 0.5), Some(&true));
    assert_eq!(output.value_at(2, 0.5), Some(&true));
    assert_eq!(output.value_at(1, 1.5), Some(&false));
    assert_eq!(output.value_at(2, 1.0), Some(&false));
    assert_eq!(output.value_at(0, 0.5), Some(&false));
    assert_eq!(output.value_at(3, 0.0), Some(&true));
    assert_eq!(output.value_at(3, 1.5), Some(&true));
    assert_eq!(output.signal(1).and_then(|signal| signal.end()), Some(2.0));

    Ok(())
}
