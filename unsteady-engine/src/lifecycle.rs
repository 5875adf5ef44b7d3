use unsteady_core::{
    SolverConfig,
    fem::{FemBackend, VariationalProblem},
};

use crate::EngineError;

/// The configuration group inside an adaptive solver's parameter tree that
/// mirrors the point solver's parameters.
const NESTED_SOLVER_GROUP: &str = "nonlinear_variational_solver";

/// Outcome of the most recent solve.
///
/// `iterations` is `None` after a goal-oriented adaptive solve, which does
/// not report an iteration count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStatus {
    pub iterations: Option<usize>,
    pub solved: bool,
}

/// The plain nonlinear point solver, reduced to the state this core owns:
/// its parameter tree. The algebra lives in the backend.
struct PointSolver {
    config: SolverConfig,
}

/// The goal-oriented adaptive solver's engine-side state.
struct AdaptiveSolver {
    config: SolverConfig,
}

/// Owns construction and reconstruction of the nonlinear variational problem
/// and its solvers.
///
/// A mesh or element change breaks the references a variational problem is
/// built around, so the lifecycle tracks a dirty flag
/// ([`needs_setup`](SolverLifecycle::needs_setup)) that the engine checks
/// before every solve. Solver parameter trees deliberately outlive the
/// solvers themselves: a rebuild constructs fresh solvers and copies the
/// previous configuration into them, so user tuning survives any number of
/// mesh changes.
pub struct SolverLifecycle<B: FemBackend> {
    variational: Option<VariationalProblem<B>>,
    solver: Option<PointSolver>,
    adaptive: Option<AdaptiveSolver>,
    goal: Option<B::Goal>,
    needs_setup: bool,
}

impl<B: FemBackend> SolverLifecycle<B> {
    /// Creates a lifecycle with no solver built yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variational: None,
            solver: None,
            adaptive: None,
            goal: None,
            needs_setup: true,
        }
    }

    /// Whether the solver must be rebuilt before the next solve.
    #[must_use]
    pub fn needs_setup(&self) -> bool {
        self.needs_setup
    }

    /// Marks the solver state stale, forcing a rebuild before the next
    /// solve. Solver configurations are retained.
    pub fn mark_dirty(&mut self) {
        self.needs_setup = true;
        self.variational = None;
    }

    /// The point solver's parameter tree, once a solver has been built.
    #[must_use]
    pub fn solver_config(&self) -> Option<&SolverConfig> {
        self.solver.as_ref().map(|s| &s.config)
    }

    /// Mutable access to the point solver's parameter tree.
    pub fn solver_config_mut(&mut self) -> Option<&mut SolverConfig> {
        self.solver.as_mut().map(|s| &mut s.config)
    }

    /// The adaptive solver's parameter tree, if a goal is defined.
    #[must_use]
    pub fn adaptive_config(&self) -> Option<&SolverConfig> {
        self.adaptive.as_ref().map(|s| &s.config)
    }

    /// Mutable access to the adaptive solver's parameter tree.
    pub fn adaptive_config_mut(&mut self) -> Option<&mut SolverConfig> {
        self.adaptive.as_mut().map(|s| &mut s.config)
    }

    /// Rebuilds the variational problem and both solvers from the current
    /// state.
    ///
    /// The Jacobian is the symbolic derivative of `form` about `solution`.
    /// If a point or adaptive solver existed before, its parameter tree is
    /// copied into the new instance. Passing `goal: None` tears the adaptive
    /// solver down.
    ///
    /// On any failure the lifecycle stays dirty; it never clears the flag on
    /// a partial rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Backend`] if the form cannot be
    /// differentiated.
    pub fn rebuild(
        &mut self,
        backend: &B,
        form: B::Form,
        solution: &B::Field,
        boundary_conditions: Vec<B::BoundaryCondition>,
        goal: Option<B::Goal>,
    ) -> Result<(), EngineError<B::Error>> {
        let jacobian = backend
            .differentiate(&form, solution)
            .map_err(EngineError::Backend)?;

        self.variational = Some(VariationalProblem {
            form,
            jacobian,
            boundary_conditions,
        });

        let config = match self.solver.take() {
            Some(previous) => previous.config,
            None => backend.default_solver_config(),
        };
        self.solver = Some(PointSolver { config });

        self.adaptive = if goal.is_some() {
            let config = match self.adaptive.take() {
                Some(previous) => previous.config,
                None => backend.default_adaptive_config(),
            };
            Some(AdaptiveSolver { config })
        } else {
            None
        };
        self.goal = goal;

        tracing::debug!("nonlinear solver rebuilt");
        self.needs_setup = false;
        Ok(())
    }

    /// Solves the current variational problem in place.
    ///
    /// Without a `goal_tolerance` the plain point solver runs and the
    /// returned status carries its iteration count. With a tolerance, the
    /// point solver's parameters are first propagated into the adaptive
    /// solver's nested point-solver group, then the adaptive solver runs;
    /// its status carries no iteration count.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Diverged`] if the point solver does not converge.
    /// - [`EngineError::NoAdaptiveGoal`] if a tolerance is given but the
    ///   problem defines no goal.
    /// - [`EngineError::Config`] if the adaptive parameter tree does not
    ///   mirror the point solver's.
    /// - [`EngineError::Backend`] for failures inside the backend.
    ///
    /// # Panics
    ///
    /// Panics if called while [`needs_setup`](SolverLifecycle::needs_setup)
    /// is set; the engine rebuilds before every solve, so this indicates
    /// incorrect lifecycle use.
    pub fn solve(
        &mut self,
        backend: &B,
        solution: &mut B::Field,
        goal_tolerance: Option<f64>,
    ) -> Result<SolverStatus, EngineError<B::Error>> {
        let variational = self
            .variational
            .as_ref()
            .expect("solver is rebuilt before every solve");
        let solver = self
            .solver
            .as_ref()
            .expect("solver is rebuilt before every solve");

        match goal_tolerance {
            None => {
                let report = backend
                    .solve_nonlinear(variational, &solver.config, solution)
                    .map_err(EngineError::Backend)?;
                if !report.converged {
                    return Err(EngineError::Diverged {
                        iterations: report.iterations,
                    });
                }
                Ok(SolverStatus {
                    iterations: Some(report.iterations),
                    solved: true,
                })
            }
            Some(tolerance) => {
                let adaptive = self.adaptive.as_mut().ok_or(EngineError::NoAdaptiveGoal)?;
                let goal = self.goal.as_ref().ok_or(EngineError::NoAdaptiveGoal)?;

                adaptive
                    .config
                    .group_mut(NESTED_SOLVER_GROUP)?
                    .propagate_from(&solver.config)?;

                backend
                    .solve_adaptive(variational, goal, tolerance, &adaptive.config, solution)
                    .map_err(EngineError::Backend)?;
                Ok(SolverStatus {
                    iterations: None,
                    solved: true,
                })
            }
        }
    }

    /// Copies the solver parameter trees from another lifecycle, where the
    /// corresponding solvers exist on both sides. Used by engine deep
    /// copies.
    pub(crate) fn copy_configs_from(&mut self, other: &Self) {
        if let (Some(target), Some(source)) = (self.solver.as_mut(), other.solver.as_ref()) {
            target.config = source.config.clone();
        }
        if let (Some(target), Some(source)) = (self.adaptive.as_mut(), other.adaptive.as_ref()) {
            target.config = source.config.clone();
        }
    }
}

impl<B: FemBackend> Default for SolverLifecycle<B> {
    fn default() -> Self {
        Self::new()
    }
}
