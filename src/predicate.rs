//! Atomic propositions.
//!
//! Atomic propositions connect the states of a trace to the values of a [`SignalDomain`]. Each
//! proposition is registered in an [`Atoms`] table under the identifier used by
//! [`Formula::Atomic`](crate::Formula::Atomic) and is evaluated pointwise on every segment of the
//! input signal. A proposition receives the time a segment starts together with its state, and
//! the result holds until the next segment. Propositions that only depend on the state are
//! registered with [`Atoms::insert`], those that also depend on time with [`Atoms::insert_timed`].
//!
//! The most common form of proposition compares a quantity extracted from the state with a
//! constant, which can be expressed using a [`Comparison`]:
//!
//! ```rust
//! use banquo_spatial::domain::{BooleanDomain, DoubleDomain};
//! use banquo_spatial::predicate::{Atoms, Comparison};
//!
//! let mut atoms = Atoms::new();
//! atoms.insert_comparison("fast", DoubleDomain, |speed: &f64| *speed, Comparison::Greater, 10.0);
//!
//! atoms.insert_timed("late", |time: f64, _: &f64| time - 60.0);
//!
//! let fast = atoms.get("fast").unwrap();
//! assert_eq!(fast(0.0, &12.5), 2.5);
//!
//! let late = atoms.get("late").unwrap();
//! assert_eq!(late(90.0, &0.0), 30.0);
//!
//! let op: Comparison = ">=".parse().unwrap();
//! assert!(op.evaluate(&BooleanDomain, 3.0, 3.0));
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::{AtomicDomain, SignalDomain};

/// Comparison operators between a state quantity and a constant.
///
/// Operators that cannot be recognized are kept as [`Comparison::Unknown`] and conservatively
/// evaluate to the minimum of the domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Comparison {
    Less,
    #[default]
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
    Unknown(String),
}

impl FromStr for Comparison {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let comparison = match s.trim() {
            "<" => Self::Less,
            "<=" => Self::LessOrEqual,
            "=" | "==" => Self::Equal,
            ">=" => Self::GreaterOrEqual,
            ">" => Self::Greater,
            other => Self::Unknown(other.to_string()),
        };

        Ok(comparison)
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Less => write!(f, "<"),
            Self::LessOrEqual => write!(f, "<="),
            Self::Equal => write!(f, "=="),
            Self::GreaterOrEqual => write!(f, ">="),
            Self::Greater => write!(f, ">"),
            Self::Unknown(op) => write!(f, "{}", op),
        }
    }
}

impl Comparison {
    /// Evaluate `lhs <op> rhs` in the given domain.
    ///
    /// The signed margin of the comparison is converted into a domain value using
    /// [`AtomicDomain::from_margin`]. Equality uses the negated absolute difference, so it only
    /// holds when both sides are equal.
    pub fn evaluate<D>(&self, domain: &D, lhs: f64, rhs: f64) -> D::Value
    where
        D: AtomicDomain,
    {
        match self {
            Self::Less => domain.from_margin(rhs - lhs, true),
            Self::LessOrEqual => domain.from_margin(rhs - lhs, false),
            Self::Equal => domain.from_margin(-(lhs - rhs).abs(), false),
            Self::GreaterOrEqual => domain.from_margin(lhs - rhs, false),
            Self::Greater => domain.from_margin(lhs - rhs, true),
            Self::Unknown(op) => {
                tracing::debug!(operator = %op, "Unknown comparison, using domain minimum");
                domain.min()
            }
        }
    }
}

/// Function evaluating an atomic proposition on a state and the time it starts holding at.
pub type Atom<S, V> = Arc<dyn Fn(f64, &S) -> V + Send + Sync>;

/// Table of atomic propositions indexed by identifier.
pub struct Atoms<S, V> {
    atoms: HashMap<String, Atom<S, V>>,
}

impl<S, V> Atoms<S, V> {
    pub fn new() -> Self {
        Self {
            atoms: HashMap::new(),
        }
    }

    /// Register a proposition depending only on the state, replacing any proposition with the
    /// same identifier.
    pub fn insert<F>(&mut self, id: impl Into<String>, atom: F)
    where
        F: Fn(&S) -> V + Send + Sync + 'static,
    {
        self.insert_timed(id, move |_, state: &S| atom(state));
    }

    /// Register a proposition depending on the time and the state.
    pub fn insert_timed<F>(&mut self, id: impl Into<String>, atom: F)
    where
        F: Fn(f64, &S) -> V + Send + Sync + 'static,
    {
        self.atoms.insert(id.into(), Arc::new(atom));
    }

    /// Builder form of [`Atoms::insert`].
    pub fn with<F>(mut self, id: impl Into<String>, atom: F) -> Self
    where
        F: Fn(&S) -> V + Send + Sync + 'static,
    {
        self.insert(id, atom);
        self
    }

    /// Builder form of [`Atoms::insert_timed`].
    pub fn with_timed<F>(mut self, id: impl Into<String>, atom: F) -> Self
    where
        F: Fn(f64, &S) -> V + Send + Sync + 'static,
    {
        self.insert_timed(id, atom);
        self
    }

    /// Register a proposition comparing a quantity of the state against a constant.
    pub fn insert_comparison<D, F>(
        &mut self,
        id: impl Into<String>,
        domain: D,
        quantity: F,
        comparison: Comparison,
        constant: f64,
    ) where
        D: AtomicDomain<Value = V> + Send + Sync + 'static,
        F: Fn(&S) -> f64 + Send + Sync + 'static,
    {
        self.insert(id, move |state: &S| {
            comparison.evaluate(&domain, quantity(state), constant)
        });
    }

    /// Builder form of [`Atoms::insert_comparison`].
    pub fn compare<D, F>(
        mut self,
        id: impl Into<String>,
        domain: D,
        quantity: F,
        comparison: Comparison,
        constant: f64,
    ) -> Self
    where
        D: AtomicDomain<Value = V> + Send + Sync + 'static,
        F: Fn(&S) -> f64 + Send + Sync + 'static,
    {
        self.insert_comparison(id, domain, quantity, comparison, constant);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Atom<S, V>> {
        self.atoms.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.atoms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.atoms.keys().map(String::as_str)
    }
}

impl<S, V> Default for Atoms<S, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, V> Clone for Atoms<S, V> {
    fn clone(&self) -> Self {
        Self {
            atoms: self.atoms.clone(),
        }
    }
}

impl<S, V> Debug for Atoms<S, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut ids = self.ids().collect::<Vec<_>>();
        ids.sort_unstable();
        f.debug_struct("Atoms").field("ids", &ids).finish()
    }
}
