use std::{
    fmt,
    ops::{Add, Deref},
};

use thiserror::Error;
use uom::{
    Conversion,
    si::{f64::Time, time},
};

/// A unit-safe, strictly positive time-step size.
///
/// `StepSize` wraps a [`Time`] value while enforcing that the step is
/// strictly greater than zero, so a backward-difference formula can never be
/// handed a zero or negative denominator.
///
/// # Construction
///
/// From a concrete [`uom`] unit:
///
/// ```ignore
/// use unsteady_core::StepSize;
/// use uom::si::time::second;
///
/// let dt = StepSize::new::<second>(0.5)?;
/// ```
///
/// Or from an existing [`Time`] value via [`TryFrom`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct StepSize(Time);

/// Error type returned when constructing an invalid [`StepSize`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StepSizeError {
    #[error("step size must be greater than zero, got {0} s")]
    NotPositive(f64),
}

impl StepSize {
    /// Constructs a `StepSize` from a numeric value and unit.
    ///
    /// # Errors
    ///
    /// Returns [`StepSizeError::NotPositive`] if `value` is zero or negative.
    pub fn new<U>(value: f64) -> Result<Self, StepSizeError>
    where
        U: time::Unit + Conversion<f64, T = f64>,
    {
        Self::from_time(Time::new::<U>(value))
    }

    /// Constructs a `StepSize` from an existing [`Time`] value.
    ///
    /// # Errors
    ///
    /// Returns [`StepSizeError::NotPositive`] if the time is zero or negative.
    pub fn from_time(time: Time) -> Result<Self, StepSizeError> {
        let seconds = time.get::<time::second>();
        if seconds > 0.0 {
            Ok(Self(time))
        } else {
            Err(StepSizeError::NotPositive(seconds))
        }
    }

    /// Consumes the `StepSize` and returns the underlying [`Time`] value.
    #[must_use]
    pub fn into_inner(self) -> Time {
        self.0
    }

    /// Returns the step size in seconds.
    #[must_use]
    pub fn seconds(self) -> f64 {
        self.0.get::<time::second>()
    }
}

impl TryFrom<Time> for StepSize {
    type Error = StepSizeError;
    fn try_from(t: Time) -> Result<Self, Self::Error> {
        Self::from_time(t)
    }
}

/// Dereferences to the inner [`Time`] value, so a `StepSize` can be used
/// wherever a `Time` reference is expected.
impl Deref for StepSize {
    type Target = Time;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Advances a [`Time`] value by a step, as in `t0 = t1 + dt0`.
impl Add<StepSize> for Time {
    type Output = Time;
    fn add(self, rhs: StepSize) -> Self::Output {
        self + rhs.0
    }
}

impl fmt::Display for StepSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.get::<time::second>();
        write!(f, "{s} s")
    }
}
