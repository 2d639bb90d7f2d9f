//! Monitors for temporal and spatio-temporal logic formulas over piecewise-constant signals.
//!
//! A [`Formula`] describes a property of a [`Signal`], or of a [`SpatialTemporalSignal`] holding
//! one signal for every location of a network. Monitoring a formula produces a new signal holding,
//! at every time and location, the degree to which the formula holds. The degree is a value of a
//! [`SignalDomain`](domain::SignalDomain): booleans for satisfaction, real or integer numbers for
//! robustness, or intervals of those for partial knowledge.
//!
//! Two kinds of monitors are provided:
//!
//!   - [`Monitor`] evaluates a formula over complete signals
//!   - [`OnlineMonitor`](online::OnlineMonitor) evaluates a formula incrementally as pieces of the
//!     input arrive, possibly out of order
//!
//! ```rust
//! use banquo_spatial::domain::DoubleDomain;
//! use banquo_spatial::{Formula, Monitor, Signal};
//!
//! let formula = Formula::globally(Formula::atomic("x"));
//! let monitor = Monitor::builder(DoubleDomain)
//!     .atom("x", |x: &f64| 10.0 - *x)
//!     .build(formula)
//!     .unwrap();
//!
//! let signal = Signal::from_samples([(0.0, 1.0), (1.0, 4.0), (2.0, 3.0)]).unwrap();
//! let robustness = monitor.monitor(&signal).unwrap();
//!
//! assert_eq!(robustness.value_at(0.0), Some(&6.0));
//! assert_eq!(robustness.value_at(2.0), Some(&7.0));
//! ```
//!
//! Spatial operators are evaluated against the models of a
//! [`LocationService`](space::LocationService) through the distance structures registered on the
//! [`MonitorBuilder`].

#![deny(clippy::all)]

pub mod batch;
pub mod cursor;
pub mod domain;
pub mod formula;
pub mod interval;
#[cfg(feature = "csv")]
pub mod io;
pub mod metrics;
pub mod monitor;
pub mod online;
pub mod operators;
pub mod predicate;
pub mod signal;
pub mod space;

pub use crate::cursor::ParallelCursor;
pub use crate::formula::Formula;
pub use crate::interval::{Interval, IntervalError};
pub use crate::metrics::{Bottom, Join, Meet, Top};
pub use crate::monitor::{Monitor, MonitorBuilder, MonitorError};
pub use crate::signal::{Segment, Signal, SignalError, SpatialTemporalSignal};
