//! Statistics of a monitor over many sample traces.
//!
//! [`run`] evaluates a monitoring function over every sample on a pool of scoped threads and
//! aggregates the outputs into per-location, per-time moments. A sample whose evaluation fails or
//! panics is logged and counted as a failure, and the remaining samples are still aggregated.
//!
//! ```rust
//! use banquo_spatial::batch::{run, BatchConfig};
//! use banquo_spatial::{Signal, SpatialTemporalSignal};
//!
//! let samples = vec![1.0, 2.0, 3.0];
//! let statistics = run(
//!     |scale: &f64| {
//!         let signal = Signal::from_samples([(0.0, *scale), (1.0, 2.0 * *scale)])?;
//!         Ok::<_, banquo_spatial::SignalError>(SpatialTemporalSignal::from_signals(vec![signal]))
//!     },
//!     &samples,
//!     &BatchConfig::new(2),
//! )
//! .unwrap();
//!
//! assert_eq!(statistics.successes(), 3);
//! assert_eq!(statistics.mean(0, 0.0), Some(2.0));
//! assert_eq!(statistics.mean(0, 1.0), Some(4.0));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use ordered_float::NotNan;
use thiserror::Error;

use crate::signal::SpatialTemporalSignal;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error("None of the {0} samples could be monitored")]
    NoSuccessfulSample(usize),

    #[error("Sample {sample} produced {found} locations, expected {expected}")]
    MisalignedResults {
        sample: usize,
        expected: usize,
        found: usize,
    },
}

/// Settings of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of threads evaluating samples, at least one.
    pub workers: usize,
}

impl BatchConfig {
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self { workers }
    }
}

/// Count, mean and variance of the values observed at a location and time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
}

impl Moments {
    fn from_values(values: &[f64]) -> Option<Self> {
        let mut count = 0;
        let mut mean = 0.0;
        let mut squares = 0.0;

        // Welford's online update.
        for value in values {
            count += 1;
            let delta = value - mean;
            mean += delta / count as f64;
            squares += delta * (value - mean);
        }

        (count > 0).then(|| Self {
            count,
            mean,
            variance: squares / count as f64,
        })
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Aggregated outputs of a batch run.
///
/// Moments are stored at every time where the output of any successful sample changes value, and
/// hold until the next stored time.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    moments: Vec<BTreeMap<NotNan<f64>, Moments>>,
    successes: usize,
    failures: usize,
    average_time: Duration,
}

impl Statistics {
    pub fn locations(&self) -> usize {
        self.moments.len()
    }

    pub fn successes(&self) -> usize {
        self.successes
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Average time spent monitoring a successful sample.
    pub fn average_time(&self) -> Duration {
        self.average_time
    }

    /// The times where moments are stored for a location.
    pub fn times(&self, location: usize) -> impl Iterator<Item = f64> + '_ {
        self.moments
            .get(location)
            .into_iter()
            .flat_map(|moments| moments.keys().map(|time| time.into_inner()))
    }

    /// Moments of the values at `location` holding at `time`.
    pub fn moments(&self, location: usize, time: f64) -> Option<&Moments> {
        let time = NotNan::new(time).ok()?;

        self.moments
            .get(location)?
            .range(..=time)
            .next_back()
            .map(|(_, moments)| moments)
    }

    pub fn mean(&self, location: usize, time: f64) -> Option<f64> {
        self.moments(location, time).map(|moments| moments.mean)
    }

    pub fn variance(&self, location: usize, time: f64) -> Option<f64> {
        self.moments(location, time).map(|moments| moments.variance)
    }

    pub fn std_dev(&self, location: usize, time: f64) -> Option<f64> {
        self.moments(location, time).map(Moments::std_dev)
    }
}

type Outcome = Result<(SpatialTemporalSignal<f64>, Duration), String>;

fn evaluate<T, E, F>(monitor: &F, sample: &T) -> Outcome
where
    E: Display,
    F: Fn(&T) -> Result<SpatialTemporalSignal<f64>, E>,
{
    let started = Instant::now();

    match catch_unwind(AssertUnwindSafe(|| monitor(sample))) {
        Ok(Ok(output)) => Ok((output, started.elapsed())),
        Ok(Err(error)) => Err(error.to_string()),
        Err(payload) => Err(payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "monitor panicked".to_string())),
    }
}

/// Monitor every sample and aggregate the outputs.
///
/// Samples are distributed over `config.workers` scoped threads. Failed samples are excluded from
/// the statistics; the run only fails when no sample succeeds or when the successful outputs do
/// not have the same number of locations.
pub fn run<T, E, F>(
    monitor: F,
    samples: &[T],
    config: &BatchConfig,
) -> Result<Statistics, BatchError>
where
    T: Sync,
    E: Display,
    F: Fn(&T) -> Result<SpatialTemporalSignal<f64>, E> + Sync,
{
    let workers = config.workers.clamp(1, samples.len().max(1));
    let next = AtomicUsize::new(0);
    let (next, monitor) = (&next, &monitor);

    tracing::debug!(samples = samples.len(), workers, "Starting batch run");

    let mut outcomes: Vec<(usize, Outcome)> = std::thread::scope(|scope| {
        let handles = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let mut outcomes = Vec::new();

                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(sample) = samples.get(index) else {
                            break;
                        };

                        outcomes.push((index, evaluate(monitor, sample)));
                    }

                    outcomes
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_default())
            .collect()
    });

    outcomes.sort_by_key(|(index, _)| *index);

    let mut outputs = Vec::new();
    let mut elapsed = Duration::ZERO;

    for (index, outcome) in outcomes {
        match outcome {
            Ok((output, duration)) => {
                elapsed += duration;
                outputs.push((index, output));
            }
            Err(message) => tracing::warn!(sample = index, error = %message, "Sample failed"),
        }
    }

    // Samples lost with a worker that could not be joined are failures as well.
    let failures = samples.len() - outputs.len();

    let statistics = aggregate(&outputs, failures, elapsed)?;

    tracing::debug!(
        successes = statistics.successes,
        failures = statistics.failures,
        "Finished batch run"
    );

    Ok(statistics)
}

fn aggregate(
    outputs: &[(usize, SpatialTemporalSignal<f64>)],
    failures: usize,
    elapsed: Duration,
) -> Result<Statistics, BatchError> {
    let Some((_, first)) = outputs.first() else {
        return Err(BatchError::NoSuccessfulSample(failures));
    };

    let locations = first.locations();

    let misaligned = outputs.iter().find(|(_, output)| output.locations() != locations);

    if let Some((sample, output)) = misaligned {
        return Err(BatchError::MisalignedResults {
            sample: *sample,
            expected: locations,
            found: output.locations(),
        });
    }

    let moments = (0..locations)
        .map(|location| {
            let signals = outputs
                .iter()
                .filter_map(|(_, output)| output.signal(location))
                .collect::<Vec<_>>();

            let times = signals
                .iter()
                .flat_map(|signal| signal.times())
                .filter_map(|time| NotNan::new(time).ok())
                .collect::<BTreeSet<_>>();

            times
                .into_iter()
                .filter_map(|time| {
                    let values = signals
                        .iter()
                        .filter_map(|signal| signal.value_at(time.into_inner()).copied())
                        .collect::<Vec<_>>();

                    Moments::from_values(&values).map(|moments| (time, moments))
                })
                .collect()
        })
        .collect();

    let successes = outputs.len();

    Ok(Statistics {
        moments,
        successes,
        failures,
        average_time: elapsed / successes as u32,
    })
}
