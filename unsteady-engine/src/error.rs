use thiserror::Error;

use unsteady_core::ConfigError;

/// Failures surfaced by a [`SimulationEngine`](crate::SimulationEngine).
///
/// Backend failures pass through unmodified; the engine performs no retries.
/// The recommended (manual) recovery from [`Diverged`](EngineError::Diverged)
/// is `reset_initial_guess` or `load_newton_solution` followed by a new solve
/// with adjusted parameters or step size.
#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + 'static,
{
    /// The nonlinear iteration failed to converge.
    ///
    /// The current solution slot holds whatever the failed iteration left
    /// behind; the rest of the history is untouched.
    #[error("nonlinear solver failed to converge after {iterations} iterations")]
    Diverged { iterations: usize },

    /// A goal tolerance was given, but the problem defines no adaptive goal.
    #[error("goal-oriented solve requested, but the problem defines no adaptive goal")]
    NoAdaptiveGoal,

    /// A solver configuration was addressed with an unknown key or
    /// mismatched type.
    #[error("solver configuration rejected")]
    Config(#[from] ConfigError),

    /// The finite-element backend reported a failure.
    #[error("finite-element backend call failed")]
    Backend(#[source] E),
}
