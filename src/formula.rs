//! Formula trees.
//!
//! A [`Formula`] is an immutable tree describing a temporal or spatio-temporal property. Atomic
//! propositions and distance functions are referenced by identifier and resolved when a monitor is
//! built, so the same formula can be monitored with different predicates or domains.
//!
//! ```rust
//! use banquo_spatial::{Formula, Interval};
//!
//! let formula = Formula::globally(Formula::implies(
//!     Formula::atomic("request"),
//!     Formula::eventually_within(Interval::new(0.0, 5.0).unwrap(), Formula::atomic("grant")),
//! ));
//!
//! assert_eq!(formula.to_string(), "G((request) -> (F[0, 5](grant)))");
//! ```

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::interval::Interval;

#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// Atomic proposition evaluated pointwise by a registered predicate.
    Atomic(String),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Eventually {
        interval: Option<Interval>,
        arg: Box<Formula>,
    },
    Globally {
        interval: Option<Interval>,
        arg: Box<Formula>,
    },
    Once {
        interval: Option<Interval>,
        arg: Box<Formula>,
    },
    Historically {
        interval: Option<Interval>,
        arg: Box<Formula>,
    },
    Until {
        interval: Option<Interval>,
        left: Box<Formula>,
        right: Box<Formula>,
    },
    Since {
        interval: Option<Interval>,
        left: Box<Formula>,
        right: Box<Formula>,
    },
    Everywhere {
        distance: String,
        arg: Box<Formula>,
    },
    Somewhere {
        distance: String,
        arg: Box<Formula>,
    },
    Escape {
        distance: String,
        arg: Box<Formula>,
    },
    Reach {
        distance: String,
        left: Box<Formula>,
        right: Box<Formula>,
    },
}

impl Formula {
    pub fn atomic(id: impl Into<String>) -> Self {
        Self::Atomic(id.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(arg: Formula) -> Self {
        Self::Not(Box::new(arg))
    }

    pub fn and(left: Formula, right: Formula) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Formula, right: Formula) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    pub fn implies(left: Formula, right: Formula) -> Self {
        Self::Implies(Box::new(left), Box::new(right))
    }

    pub fn eventually(arg: Formula) -> Self {
        Self::Eventually {
            interval: None,
            arg: Box::new(arg),
        }
    }

    pub fn eventually_within(interval: Interval, arg: Formula) -> Self {
        Self::Eventually {
            interval: Some(interval),
            arg: Box::new(arg),
        }
    }

    pub fn globally(arg: Formula) -> Self {
        Self::Globally {
            interval: None,
            arg: Box::new(arg),
        }
    }

    pub fn globally_within(interval: Interval, arg: Formula) -> Self {
        Self::Globally {
            interval: Some(interval),
            arg: Box::new(arg),
        }
    }

    pub fn once(arg: Formula) -> Self {
        Self::Once {
            interval: None,
            arg: Box::new(arg),
        }
    }

    pub fn once_within(interval: Interval, arg: Formula) -> Self {
        Self::Once {
            interval: Some(interval),
            arg: Box::new(arg),
        }
    }

    pub fn historically(arg: Formula) -> Self {
        Self::Historically {
            interval: None,
            arg: Box::new(arg),
        }
    }

    pub fn historically_within(interval: Interval, arg: Formula) -> Self {
        Self::Historically {
            interval: Some(interval),
            arg: Box::new(arg),
        }
    }

    pub fn until(left: Formula, right: Formula) -> Self {
        Self::Until {
            interval: None,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn until_within(interval: Interval, left: Formula, right: Formula) -> Self {
        Self::Until {
            interval: Some(interval),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn since(left: Formula, right: Formula) -> Self {
        Self::Since {
            interval: None,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn since_within(interval: Interval, left: Formula, right: Formula) -> Self {
        Self::Since {
            interval: Some(interval),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn everywhere(distance: impl Into<String>, arg: Formula) -> Self {
        Self::Everywhere {
            distance: distance.into(),
            arg: Box::new(arg),
        }
    }

    pub fn somewhere(distance: impl Into<String>, arg: Formula) -> Self {
        Self::Somewhere {
            distance: distance.into(),
            arg: Box::new(arg),
        }
    }

    pub fn escape(distance: impl Into<String>, arg: Formula) -> Self {
        Self::Escape {
            distance: distance.into(),
            arg: Box::new(arg),
        }
    }

    pub fn reach(distance: impl Into<String>, left: Formula, right: Formula) -> Self {
        Self::Reach {
            distance: distance.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The direct subformulas of this node.
    pub fn children(&self) -> Vec<&Formula> {
        match self {
            Self::Atomic(_) => Vec::new(),
            Self::Not(arg)
            | Self::Eventually { arg, .. }
            | Self::Globally { arg, .. }
            | Self::Once { arg, .. }
            | Self::Historically { arg, .. }
            | Self::Everywhere { arg, .. }
            | Self::Somewhere { arg, .. }
            | Self::Escape { arg, .. } => vec![&**arg],
            Self::And(left, right)
            | Self::Or(left, right)
            | Self::Implies(left, right)
            | Self::Until { left, right, .. }
            | Self::Since { left, right, .. }
            | Self::Reach { left, right, .. } => vec![&**left, &**right],
        }
    }

    /// True if the formula contains any spatial operator.
    pub fn is_spatial(&self) -> bool {
        match self {
            Self::Everywhere { .. }
            | Self::Somewhere { .. }
            | Self::Escape { .. }
            | Self::Reach { .. } => true,
            _ => self.children().into_iter().any(Formula::is_spatial),
        }
    }

    /// The identifiers of every atomic proposition in the formula.
    pub fn atoms(&self) -> BTreeSet<&str> {
        let mut atoms = BTreeSet::new();
        self.visit(&mut |formula| {
            if let Self::Atomic(id) = formula {
                atoms.insert(id.as_str());
            }
        });
        atoms
    }

    /// The identifiers of every distance function in the formula.
    pub fn distances(&self) -> BTreeSet<&str> {
        let mut distances = BTreeSet::new();
        self.visit(&mut |formula| match formula {
            Self::Everywhere { distance, .. }
            | Self::Somewhere { distance, .. }
            | Self::Escape { distance, .. }
            | Self::Reach { distance, .. } => {
                distances.insert(distance.as_str());
            }
            _ => {}
        });
        distances
    }

    fn visit<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Formula),
    {
        f(self);

        for child in self.children() {
            child.visit(f);
        }
    }
}

fn bound(interval: &Option<Interval>) -> String {
    interval.map(|i| i.to_string()).unwrap_or_default()
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atomic(id) => write!(f, "{}", id),
            Self::Not(arg) => write!(f, "!({})", arg),
            Self::And(left, right) => write!(f, "({}) & ({})", left, right),
            Self::Or(left, right) => write!(f, "({}) | ({})", left, right),
            Self::Implies(left, right) => write!(f, "({}) -> ({})", left, right),
            Self::Eventually { interval, arg } => write!(f, "F{}({})", bound(interval), arg),
            Self::Globally { interval, arg } => write!(f, "G{}({})", bound(interval), arg),
            Self::Once { interval, arg } => write!(f, "O{}({})", bound(interval), arg),
            Self::Historically { interval, arg } => write!(f, "H{}({})", bound(interval), arg),
            Self::Until { interval, left, right } => {
                write!(f, "({}) U{} ({})", left, bound(interval), right)
            }
            Self::Since { interval, left, right } => {
                write!(f, "({}) S{} ({})", left, bound(interval), right)
            }
            Self::Everywhere { distance, arg } => write!(f, "everywhere{{{}}}({})", distance, arg),
            Self::Somewhere { distance, arg } => write!(f, "somewhere{{{}}}({})", distance, arg),
            Self::Escape { distance, arg } => write!(f, "escape{{{}}}({})", distance, arg),
            Self::Reach { distance, left, right } => {
                write!(f, "({}) reach{{{}}} ({})", left, distance, right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Formula;
    use crate::interval::{Interval, IntervalError};

    #[test]
    fn identifiers() {
        let formula = Formula::reach(
            "hops",
            Formula::atomic("a"),
            Formula::somewhere("weight", Formula::and(Formula::atomic("b"), Formula::atomic("a"))),
        );

        assert_eq!(formula.atoms().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            formula.distances().into_iter().collect::<Vec<_>>(),
            vec!["hops", "weight"]
        );
        assert!(formula.is_spatial());
        assert!(!Formula::eventually(Formula::atomic("a")).is_spatial());
    }

    #[test]
    fn display() -> Result<(), IntervalError> {
        let formula = Formula::until_within(
            Interval::new(1.0, 2.0)?,
            Formula::not(Formula::atomic("p")),
            Formula::everywhere("d", Formula::atomic("q")),
        );

        assert_eq!(formula.to_string(), "(!(p)) U[1, 2] (everywhere{d}(q))");
        Ok(())
    }
}
