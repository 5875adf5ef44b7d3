//! Backward-difference formulas for implicit time discretization.
//!
//! These functions turn a short history of solution values into a discrete
//! time-derivative term, expressed as a scalar-weighted combination of the
//! history entries. The weights carry units of inverse seconds, so applying
//! them to any expression type that supports `Mul<f64>` and `Add` yields the
//! corresponding rate of change.
//!
//! Everything here is pure: no solver, mesh, or history state is touched,
//! which is what makes the formulas testable on plain `f64` values.

use std::ops::{Add, Mul};

use crate::{StepSize, UnsupportedTimeOrder};

/// First-order backward difference (backward Euler).
///
/// Computes `(w_next - w) / dt` for the pair `(w_next, w)`, most-recent
/// first.
pub fn apply_backward_euler<V>(dt: StepSize, values: (V, V)) -> V
where
    V: Mul<f64, Output = V> + Add<Output = V>,
{
    let (w_next, w) = values;
    let rate = 1.0 / dt.seconds();

    w_next * rate + w * (-rate)
}

/// Second-order backward difference with variable step sizes.
///
/// `step_sizes` is `(dt0, dt1)` and `values` is `(w_next, w, w_prev)`, both
/// most-recent first. For equal step sizes this reduces to the familiar
/// constant-step formula `(3/2 w_next - 2 w + 1/2 w_prev) / dt`.
pub fn apply_bdf2<V>(step_sizes: (StepSize, StepSize), values: (V, V, V)) -> V
where
    V: Mul<f64, Output = V> + Add<Output = V>,
{
    let (dt0, dt1) = (step_sizes.0.seconds(), step_sizes.1.seconds());
    let (w_next, w, w_prev) = values;

    let c_next = (2.0 * dt0 + dt1) / (dt0 * (dt0 + dt1));
    let c = -(dt0 + dt1) / (dt0 * dt1);
    let c_prev = dt0 / (dt1 * (dt0 + dt1));

    w_next * c_next + w * c + w_prev * c_prev
}

/// The backward-difference weights for a given order and step-size history.
///
/// Returns one weight per history entry, most-recent first, in units of
/// inverse seconds. The weights of any backward-difference formula sum to
/// zero, since the derivative of a constant vanishes.
///
/// # Errors
///
/// Returns [`UnsupportedTimeOrder`] unless `order` is 1 or 2.
///
/// # Panics
///
/// Panics if `step_sizes` holds fewer than `order` entries.
pub fn coefficients(
    order: usize,
    step_sizes: &[StepSize],
) -> Result<Vec<f64>, UnsupportedTimeOrder> {
    match order {
        1 => {
            let dt = step_sizes[0].seconds();
            Ok(vec![1.0 / dt, -1.0 / dt])
        }
        2 => {
            let (dt0, dt1) = (step_sizes[0].seconds(), step_sizes[1].seconds());
            Ok(vec![
                (2.0 * dt0 + dt1) / (dt0 * (dt0 + dt1)),
                -(dt0 + dt1) / (dt0 * dt1),
                dt0 / (dt1 * (dt0 + dt1)),
            ])
        }
        order => Err(UnsupportedTimeOrder { order }),
    }
}

/// Discrete time derivative of a solution-value history.
///
/// `values` holds `order + 1` entries, most-recent first, and `step_sizes`
/// holds `order` entries, most-recent first. Dispatches to
/// [`apply_backward_euler`] or [`apply_bdf2`] by order.
///
/// # Errors
///
/// Returns [`UnsupportedTimeOrder`] unless `order` is 1 or 2.
///
/// # Panics
///
/// Panics if `values` or `step_sizes` is shorter than the order requires.
pub fn discrete_derivative<V>(
    order: usize,
    step_sizes: &[StepSize],
    values: &[V],
) -> Result<V, UnsupportedTimeOrder>
where
    V: Clone + Mul<f64, Output = V> + Add<Output = V>,
{
    match order {
        1 => Ok(apply_backward_euler(
            step_sizes[0],
            (values[0].clone(), values[1].clone()),
        )),
        2 => Ok(apply_bdf2(
            (step_sizes[0], step_sizes[1]),
            (values[0].clone(), values[1].clone(), values[2].clone()),
        )),
        order => Err(UnsupportedTimeOrder { order }),
    }
}
