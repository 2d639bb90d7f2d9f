//! Incremental monitoring of signals that arrive in pieces.
//!
//! The online monitor receives the input as a stream of [`Update`]s, each claiming that a state
//! holds over a half-open time range, and reports the ranges where its knowledge of the output
//! changed. Updates may arrive in any order. Knowledge is represented with the
//! [`IntervalDomain`](crate::domain::IntervalDomain) of the monitor domain: every node of the
//! formula keeps an [`OnlineSignal`] per location which starts out as `[min, max]` over
//! `[0, +inf)` and is narrowed as updates arrive.
//!
//! ```rust
//! use banquo_spatial::domain::{AbstractInterval, BooleanDomain};
//! use banquo_spatial::online::Update;
//! use banquo_spatial::{Formula, Interval, Monitor};
//!
//! let interval = Interval::new(0.0, 1.0).unwrap();
//! let formula = Formula::eventually_within(interval, Formula::atomic("p"));
//! let mut monitor = Monitor::builder(BooleanDomain)
//!     .atom("p", |x: &f64| *x > 0.0)
//!     .build_online(formula)
//!     .unwrap();
//!
//! monitor.monitor(0, Update::new(0.0, 2.0, -1.0).unwrap()).unwrap();
//! assert_eq!(monitor.value_at(0, 0.5), Some(&AbstractInterval::point(false)));
//! assert_eq!(monitor.value_at(0, 1.5), Some(&AbstractInterval::new(false, true).unwrap()));
//! ```
//!
//! Each node recomputes only the part of its output that a change of its children can affect,
//! using the offline algorithms over the relevant portion of the child signals. Bounded future
//! operators with an interval `[a, b]` recompute `[s - b, e - a)` for a child change over
//! `[s, e)`, and bounded past operators recompute `[s + a, e + b)`.

use thiserror::Error;

use crate::monitor::MonitorError;
use crate::signal::SignalError;
use crate::space::SpaceError;

mod chain;
mod combinator;
mod monitor;
mod signal;
mod update;
mod window;

pub use chain::TimeChain;
pub use combinator::ChainsCombinator;
pub use monitor::OnlineMonitor;
pub use signal::OnlineSignal;
pub use update::Update;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OnlineError {
    #[error("Invalid update range [{start}, {end})")]
    InvalidUpdate { start: f64, end: f64 },

    #[error("Update starting at {start} does not continue chain ending at {end}")]
    Gap { end: f64, start: f64 },

    #[error("Cannot create a chain without updates")]
    EmptyChain,

    #[error("Update starting at {start} comes before the end {previous} of the previous update")]
    OutOfOrder { previous: f64, start: f64 },

    #[error("Location {location} is out of range for {size} locations")]
    LocationOutOfRange { location: usize, size: usize },

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Space(#[from] SpaceError),
}
