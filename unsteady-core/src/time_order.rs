use thiserror::Error;

/// The order of the backward time-differencing scheme used by a simulation.
///
/// The order is fixed when a simulation is constructed and determines how
/// much history it carries: `order + 1` solution and time slots, and `order`
/// step-size slots.
///
/// Only first and second order are implemented. Requesting any other order
/// fails at construction rather than deep inside a time step, so a
/// misconfigured simulation never starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOrder {
    /// Backward Euler.
    First,
    /// Variable-step BDF2.
    Second,
}

/// Error returned when a time-differencing order has no implemented formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("backward differencing is only implemented for time orders 1 and 2, got {order}")]
pub struct UnsupportedTimeOrder {
    pub order: usize,
}

impl TimeOrder {
    /// Constructs a `TimeOrder` from a raw order.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedTimeOrder`] unless `order` is 1 or 2.
    pub fn new(order: usize) -> Result<Self, UnsupportedTimeOrder> {
        match order {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            order => Err(UnsupportedTimeOrder { order }),
        }
    }

    /// Returns the order as a number.
    #[must_use]
    pub fn get(self) -> usize {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }

    /// Number of solution and time slots a simulation of this order carries.
    #[must_use]
    pub fn history_depth(self) -> usize {
        self.get() + 1
    }

    /// Number of step-size slots a simulation of this order carries.
    #[must_use]
    pub fn step_size_depth(self) -> usize {
        self.get()
    }
}
