//! Interpretation domains for monitor output.
//!
//! Every algorithm in this crate is parameterized by a [`SignalDomain`], which provides the
//! operations used to combine values: conjunction, disjunction, negation, and the two bounds of
//! the domain. The following domains are provided:
//!
//!   - [`BooleanDomain`] for classical satisfaction
//!   - [`DoubleDomain`] for real-valued robustness
//!   - [`IntegerDomain`] for integer-valued robustness
//!   - [`IntervalDomain`] for interval-valued partial knowledge, used by the online monitor
//!
//! Domains are configuration values, not state. They are `Copy` and are passed explicitly to every
//! monitor that needs one.
//!
//! ```rust
//! use banquo_spatial::domain::{DoubleDomain, SignalDomain};
//!
//! let domain = DoubleDomain;
//! assert_eq!(domain.conjunction(&1.0, &-2.0), -2.0);
//! assert_eq!(domain.negation(&domain.max()), domain.min());
//! ```

use std::fmt::{self, Debug, Display};

use thiserror::Error;

use crate::metrics::{Bottom, Join, Meet, Top};

/// Algebraic structure used to interpret formulas.
///
/// Implementations must satisfy the following laws for all values `x`, `y`, and `z`:
///
///   - `conjunction` and `disjunction` are associative, commutative, and idempotent
///   - `max()` is the identity of `conjunction` and `min()` is the identity of `disjunction`
///   - `min()` absorbs `conjunction` and `max()` absorbs `disjunction`
///   - `negation(negation(x)) == x`
///   - `negation(conjunction(x, y)) == disjunction(negation(x), negation(y))`
pub trait SignalDomain: Copy + Debug {
    /// The type of the values in the domain.
    type Value: Clone + PartialEq + Debug;

    fn conjunction(&self, left: &Self::Value, right: &Self::Value) -> Self::Value;

    fn disjunction(&self, left: &Self::Value, right: &Self::Value) -> Self::Value;

    fn negation(&self, value: &Self::Value) -> Self::Value;

    /// The smallest element of the domain, representing complete violation.
    fn min(&self) -> Self::Value;

    /// The largest element of the domain, representing complete satisfaction.
    fn max(&self) -> Self::Value;

    fn equal_to(&self, left: &Self::Value, right: &Self::Value) -> bool {
        left == right
    }
}

/// Domains whose values can be produced from the signed margin of a comparison.
///
/// The margin is positive when the comparison holds, negative when it does not, and zero on the
/// boundary. Strict comparisons do not hold on the boundary.
pub trait AtomicDomain: SignalDomain {
    fn from_margin(&self, margin: f64, strict: bool) -> Self::Value;
}

/// Classical boolean satisfaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BooleanDomain;

impl SignalDomain for BooleanDomain {
    type Value = bool;

    fn conjunction(&self, left: &bool, right: &bool) -> bool {
        Meet::min(left, right)
    }

    fn disjunction(&self, left: &bool, right: &bool) -> bool {
        Join::max(left, right)
    }

    fn negation(&self, value: &bool) -> bool {
        !*value
    }

    fn min(&self) -> bool {
        bool::bottom()
    }

    fn max(&self) -> bool {
        bool::top()
    }
}

impl AtomicDomain for BooleanDomain {
    fn from_margin(&self, margin: f64, strict: bool) -> bool {
        if strict {
            margin > 0.0
        } else {
            margin >= 0.0
        }
    }
}

/// Real-valued robustness where conjunction is the minimum and disjunction the maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoubleDomain;

impl SignalDomain for DoubleDomain {
    type Value = f64;

    fn conjunction(&self, left: &f64, right: &f64) -> f64 {
        Meet::min(left, right)
    }

    fn disjunction(&self, left: &f64, right: &f64) -> f64 {
        Join::max(left, right)
    }

    fn negation(&self, value: &f64) -> f64 {
        -*value
    }

    fn min(&self) -> f64 {
        f64::bottom()
    }

    fn max(&self) -> f64 {
        f64::top()
    }
}

impl AtomicDomain for DoubleDomain {
    fn from_margin(&self, margin: f64, _strict: bool) -> f64 {
        margin
    }
}

/// Integer-valued robustness. Negation saturates so that the bounds map onto each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegerDomain;

impl SignalDomain for IntegerDomain {
    type Value = i64;

    fn conjunction(&self, left: &i64, right: &i64) -> i64 {
        Meet::min(left, right)
    }

    fn disjunction(&self, left: &i64, right: &i64) -> i64 {
        Join::max(left, right)
    }

    fn negation(&self, value: &i64) -> i64 {
        Ord::max(value.saturating_neg(), i64::bottom())
    }

    fn min(&self) -> i64 {
        i64::bottom()
    }

    fn max(&self) -> i64 {
        i64::top()
    }
}

impl AtomicDomain for IntegerDomain {
    fn from_margin(&self, margin: f64, _strict: bool) -> i64 {
        // `as` saturates at the type bounds, the clamp keeps the result inside the domain.
        (margin.round() as i64).clamp(i64::bottom(), i64::top())
    }
}

/// Error produced when constructing an [`AbstractInterval`] with reversed bounds.
#[derive(Debug, Clone, Error)]
#[error("Interval lower bound {lower} is greater than upper bound {upper}")]
pub struct DomainError {
    lower: String,
    upper: String,
}

/// A closed interval `[lower, upper]` over an ordered value type.
///
/// Abstract intervals represent partial knowledge about a value: the true value is known to lie
/// somewhere between the two bounds. A point interval represents complete knowledge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbstractInterval<V> {
    lower: V,
    upper: V,
}

impl<V> AbstractInterval<V>
where
    V: PartialOrd + Clone + Debug,
{
    /// Create a new interval, failing if `lower` is greater than `upper`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use banquo_spatial::domain::AbstractInterval;
    ///
    /// let interval = AbstractInterval::new(4.0, 6.0).unwrap();
    /// assert!(interval.contains(&AbstractInterval::point(5.0)));
    /// assert!(AbstractInterval::new(6.0, 4.0).is_err());
    /// ```
    pub fn new(lower: V, upper: V) -> Result<Self, DomainError> {
        if lower <= upper {
            Ok(Self { lower, upper })
        } else {
            Err(DomainError {
                lower: format!("{:?}", lower),
                upper: format!("{:?}", upper),
            })
        }
    }

    pub fn point(value: V) -> Self {
        Self {
            lower: value.clone(),
            upper: value,
        }
    }

    pub fn lower(&self) -> &V {
        &self.lower
    }

    pub fn upper(&self) -> &V {
        &self.upper
    }

    pub fn is_point(&self) -> bool {
        self.lower == self.upper
    }

    /// Returns true if `other` is a sub-interval of `self`.
    pub fn contains(&self, other: &Self) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }

    /// Returns true if `value` lies between the bounds of the interval.
    pub fn contains_value(&self, value: &V) -> bool {
        &self.lower <= value && value <= &self.upper
    }

    /// Compute the common sub-interval, or `None` if the intervals are disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let lower = if self.lower >= other.lower { &self.lower } else { &other.lower };
        let upper = if self.upper <= other.upper { &self.upper } else { &other.upper };

        if lower <= upper {
            Some(Self {
                lower: lower.clone(),
                upper: upper.clone(),
            })
        } else {
            None
        }
    }
}

impl AbstractInterval<f64> {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl<V: Display> Display for AbstractInterval<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Interval-valued lifting of another domain.
///
/// Operations are applied to each bound independently. Negation swaps the bounds, since negating
/// the smallest possible value produces the largest possible negated value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalDomain<D> {
    inner: D,
}

impl<D> IntervalDomain<D>
where
    D: SignalDomain,
    D::Value: PartialOrd,
{
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// The interval representing no knowledge at all, `[min, max]`.
    pub fn unknown(&self) -> AbstractInterval<D::Value> {
        AbstractInterval {
            lower: self.inner.min(),
            upper: self.inner.max(),
        }
    }

    /// Lift a single value of the inner domain into a point interval.
    pub fn lift(&self, value: D::Value) -> AbstractInterval<D::Value> {
        AbstractInterval::point(value)
    }
}

impl<D> SignalDomain for IntervalDomain<D>
where
    D: SignalDomain,
    D::Value: PartialOrd,
{
    type Value = AbstractInterval<D::Value>;

    fn conjunction(&self, left: &Self::Value, right: &Self::Value) -> Self::Value {
        AbstractInterval {
            lower: self.inner.conjunction(&left.lower, &right.lower),
            upper: self.inner.conjunction(&left.upper, &right.upper),
        }
    }

    fn disjunction(&self, left: &Self::Value, right: &Self::Value) -> Self::Value {
        AbstractInterval {
            lower: self.inner.disjunction(&left.lower, &right.lower),
            upper: self.inner.disjunction(&left.upper, &right.upper),
        }
    }

    fn negation(&self, value: &Self::Value) -> Self::Value {
        AbstractInterval {
            lower: self.inner.negation(&value.upper),
            upper: self.inner.negation(&value.lower),
        }
    }

    fn min(&self) -> Self::Value {
        AbstractInterval::point(self.inner.min())
    }

    fn max(&self) -> Self::Value {
        AbstractInterval::point(self.inner.max())
    }
}

impl<D> AtomicDomain for IntervalDomain<D>
where
    D: AtomicDomain,
    D::Value: PartialOrd,
{
    fn from_margin(&self, margin: f64, strict: bool) -> Self::Value {
        AbstractInterval::point(self.inner.from_margin(margin, strict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_domain() {
        let domain = BooleanDomain;

        assert!(domain.conjunction(&true, &true));
        assert!(!domain.conjunction(&true, &false));
        assert!(domain.disjunction(&false, &true));
        assert!(!domain.negation(&domain.max()));
        assert!(domain.from_margin(0.0, false));
        assert!(!domain.from_margin(0.0, true));
    }

    #[test]
    fn integer_negation_saturates() {
        let domain = IntegerDomain;

        assert_eq!(domain.negation(&domain.max()), domain.min());
        assert_eq!(domain.negation(&domain.min()), domain.max());
        assert_eq!(domain.negation(&i64::MIN), domain.max());
        assert_eq!(domain.from_margin(2.6, false), 3);
        assert_eq!(domain.from_margin(f64::INFINITY, false), domain.max());
    }

    #[test]
    fn interval_construction() {
        assert!(AbstractInterval::new(1.0, 2.0).is_ok());
        assert!(AbstractInterval::new(2.0, 2.0).is_ok());
        assert!(AbstractInterval::new(3.0, 2.0).is_err());
    }

    #[test]
    fn interval_intersection() -> Result<(), DomainError> {
        let a = AbstractInterval::new(0.0, 4.0)?;
        let b = AbstractInterval::new(2.0, 6.0)?;
        let c = AbstractInterval::new(5.0, 6.0)?;

        assert_eq!(a.intersect(&b), Some(AbstractInterval::new(2.0, 4.0)?));
        assert_eq!(a.intersect(&c), None);
        assert!(b.contains(&c));
        assert!(!c.contains(&b));
        assert_eq!(a.width(), 4.0);

        Ok(())
    }

    #[test]
    fn interval_domain_operations() -> Result<(), DomainError> {
        let domain = IntervalDomain::new(DoubleDomain);
        let a = AbstractInterval::new(-1.0, 3.0)?;
        let b = AbstractInterval::new(0.0, 2.0)?;

        assert_eq!(domain.conjunction(&a, &b), AbstractInterval::new(-1.0, 2.0)?);
        assert_eq!(domain.disjunction(&a, &b), AbstractInterval::new(0.0, 3.0)?);
        assert_eq!(domain.negation(&a), AbstractInterval::new(-3.0, 1.0)?);
        assert_eq!(
            domain.unknown(),
            AbstractInterval::new(f64::NEG_INFINITY, f64::INFINITY)?
        );
        assert!(domain.unknown().contains(&a));

        Ok(())
    }

    #[test]
    fn interval_domain_over_booleans() {
        let domain = IntervalDomain::new(BooleanDomain);
        let unknown = domain.unknown();
        let yes = domain.max();

        assert_eq!(domain.disjunction(&unknown, &yes), yes);
        assert_eq!(domain.conjunction(&unknown, &yes), unknown);
        assert_eq!(domain.negation(&unknown), unknown);
    }
}
