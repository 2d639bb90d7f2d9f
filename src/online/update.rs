use std::fmt::{Display, Formatter};

use super::OnlineError;

/// Claim that a value holds over the half-open time range `[start, end)`.
///
/// Updates are the unit of communication between online monitors: inputs are delivered as
/// updates, and every node of an online monitor reports the ranges where its knowledge changed as
/// updates.
#[derive(Debug, Clone, PartialEq)]
pub struct Update<V> {
    start: f64,
    end: f64,
    value: V,
}

impl<V> Update<V> {
    /// Create an update, failing if either bound is NaN or if the range is empty.
    ///
    /// ```rust
    /// use banquo_spatial::online::Update;
    ///
    /// assert!(Update::new(2.0, 3.0, 'a').is_ok());
    /// assert!(Update::new(3.0, 3.0, 'a').is_err());
    /// assert!(Update::new(0.0, f64::INFINITY, 'a').is_ok());
    /// ```
    pub fn new(start: f64, end: f64, value: V) -> Result<Self, OnlineError> {
        if start.is_nan() || end.is_nan() || start >= end {
            return Err(OnlineError::InvalidUpdate { start, end });
        }

        Ok(Self { start, end, value })
    }

    // Callers guarantee that start < end.
    pub(crate) fn unchecked(start: f64, end: f64, value: V) -> Self {
        Self { start, end, value }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// The portion of the update inside of `[from, to)`, if any.
    pub fn clip(&self, from: f64, to: f64) -> Option<Update<V>>
    where
        V: Clone,
    {
        let start = f64::max(self.start, from);
        let end = f64::min(self.end, to);

        (start < end).then(|| Self::unchecked(start, end, self.value.clone()))
    }

    pub fn map<U, F>(self, f: F) -> Update<U>
    where
        F: FnOnce(V) -> U,
    {
        Update {
            start: self.start,
            end: self.end,
            value: f(self.value),
        }
    }
}

impl<V: Display> Display for Update<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}) -> {}", self.start, self.end, self.value)
    }
}
