//! Lattice operations over the scalar values produced by monitors.
//!
//! The concrete [`SignalDomain`](crate::domain::SignalDomain) implementations are thin wrappers
//! around these traits: conjunction is a [`Meet`], disjunction is a [`Join`], and the domain bounds
//! are [`Bottom`] and [`Top`].

/// Trait representing a type with a global maximum.
///
/// The value returned by the `top` method should be greater than or equal to all other values of
/// the type.
pub trait Top {
    /// Compute the global maximum for the type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use banquo_spatial::Top;
    /// assert_eq!(f64::top(), f64::INFINITY);
    /// assert!(bool::top());
    /// ```
    fn top() -> Self;
}

/// Trait representing a type with a global minimum.
///
/// The value returned by the `bottom` method should be less than or equal to all other values of
/// the type.
pub trait Bottom {
    /// Compute the global minimum for the type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use banquo_spatial::Bottom;
    /// assert_eq!(f64::bottom(), f64::NEG_INFINITY);
    /// assert_eq!(i64::bottom(), -i64::MAX);
    /// ```
    fn bottom() -> Self;
}

/// Trait representing a type that can compute the [infimum] of two values.
///
/// Types implementing this trait form a [meet] semi-lattice. For totally ordered types this is the
/// smaller of the two values. The operation must be associative, commutative, and idempotent, and
/// [`Top`] (when implemented) must be its identity.
///
/// [infimum]: https://en.wikipedia.org/wiki/Infimum_and_supremum
/// [meet]: https://en.wikipedia.org/wiki/Join_and_meet
pub trait Meet: PartialOrd {
    /// Return the infimum of two values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use banquo_spatial::Meet;
    /// assert_eq!(Meet::min(&1.0, &2.0), 1.0);
    /// assert!(!Meet::min(&true, &false));
    /// ```
    fn min(&self, other: &Self) -> Self;
}

/// Trait representing a type that can compute the [supremum] of two values.
///
/// Types implementing this trait form a [join] semi-lattice. For totally ordered types this is the
/// larger of the two values. [`Bottom`] (when implemented) must be the identity of the operation.
///
/// [supremum]: https://en.wikipedia.org/wiki/Infimum_and_supremum
/// [join]: https://en.wikipedia.org/wiki/Join_and_meet
pub trait Join: PartialOrd {
    /// Return the supremum of two values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use banquo_spatial::Join;
    /// assert_eq!(Join::max(&1.0, &2.0), 2.0);
    /// assert!(Join::max(&true, &false));
    /// ```
    fn max(&self, other: &Self) -> Self;
}

impl Top for f64 {
    fn top() -> Self {
        f64::INFINITY
    }
}

impl Bottom for f64 {
    fn bottom() -> Self {
        f64::NEG_INFINITY
    }
}

impl Meet for f64 {
    fn min(&self, other: &Self) -> Self {
        f64::min(*self, *other)
    }
}

impl Join for f64 {
    fn max(&self, other: &Self) -> Self {
        f64::max(*self, *other)
    }
}

impl Top for bool {
    fn top() -> Self {
        true
    }
}

impl Bottom for bool {
    fn bottom() -> Self {
        false
    }
}

impl Meet for bool {
    fn min(&self, other: &Self) -> Self {
        *self && *other
    }
}

impl Join for bool {
    fn max(&self, other: &Self) -> Self {
        *self || *other
    }
}

// The bounds are symmetric so that negation maps top to bottom without overflow.
impl Top for i64 {
    fn top() -> Self {
        i64::MAX
    }
}

impl Bottom for i64 {
    fn bottom() -> Self {
        -i64::MAX
    }
}

impl Meet for i64 {
    fn min(&self, other: &Self) -> Self {
        Ord::min(*self, *other)
    }
}

impl Join for i64 {
    fn max(&self, other: &Self) -> Self {
        Ord::max(*self, *other)
    }
}
