use std::rc::Rc;

use uom::si::f64::Time;

use unsteady_core::{
    SolverConfig, StepSize, TimeHistory, TimeOrder, bdf,
    fem::{FemBackend, FormContext, TransientProblem},
};

use crate::{EngineError, SolutionHistory, SolverLifecycle, SolverStatus};

/// Drives a [`TransientProblem`] through a sequence of implicit time steps.
///
/// The engine owns the notion of time for a simulation: the rolling solution
/// and time histories, the backward-difference discretization, and the
/// lifecycle of the nonlinear (and optionally goal-oriented adaptive) solver.
/// The spatial work (meshes, forms, algebra) happens in the [`FemBackend`].
///
/// A step is taken in two moves: [`solve`](SimulationEngine::solve) computes
/// the solution at `t1 + dt0`, and [`advance`](SimulationEngine::advance)
/// commits it by shifting the histories back. Keeping them separate lets a
/// caller re-solve the same step before committing, for instance after
/// shrinking the step size when the nonlinear iteration diverged.
///
/// Any mesh change invalidates the function space, every history slot, and
/// the solver; [`change_mesh`](SimulationEngine::change_mesh) performs that
/// whole cascade and the next solve rebuilds transparently.
pub struct SimulationEngine<B, P>
where
    B: FemBackend,
    P: TransientProblem<B>,
{
    pub(crate) backend: B,
    pub(crate) problem: P,
    pub(crate) time_order: TimeOrder,
    pub(crate) measure: B::Measure,
    pub(crate) mesh: B::Mesh,
    pub(crate) element: B::Element,
    pub(crate) space: Rc<B::FunctionSpace>,
    pub(crate) solutions: SolutionHistory<B>,
    pub(crate) times: TimeHistory,
    pub(crate) newton_guess: B::Field,
    pub(crate) lifecycle: SolverLifecycle<B>,
    pub(crate) status: SolverStatus,
}

impl<B, P> SimulationEngine<B, P>
where
    B: FemBackend,
    P: TransientProblem<B>,
{
    /// Builds an engine on the problem's initial mesh and performs the first
    /// solver setup.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Backend`] if the problem's form, boundary
    /// conditions, or Jacobian cannot be built.
    pub fn new(
        backend: B,
        problem: P,
        time_order: TimeOrder,
        measure: B::Measure,
    ) -> Result<Self, EngineError<B::Error>> {
        let mesh = problem.initial_mesh(&backend);
        let element = problem.element(&backend);
        let space = backend.function_space(&mesh, &element);
        let solutions = SolutionHistory::new(&backend, &space, time_order.history_depth());
        let newton_guess = backend.field(&space);

        let mut engine = Self {
            backend,
            problem,
            time_order,
            measure,
            mesh,
            element,
            space,
            solutions,
            times: TimeHistory::new(time_order),
            newton_guess,
            lifecycle: SolverLifecycle::new(),
            status: SolverStatus::default(),
        };
        engine.setup_solver()?;
        Ok(engine)
    }

    /// The time value of the current step.
    #[must_use]
    pub fn time(&self) -> Time {
        self.times.time()
    }

    /// The current step size.
    #[must_use]
    pub fn step_size(&self) -> StepSize {
        self.times.step_size()
    }

    /// Sets the step size for the current step.
    ///
    /// Takes effect at the next [`solve`](SimulationEngine::solve), which
    /// recomputes the current time from it.
    pub fn set_step_size(&mut self, dt: StepSize) {
        self.times.set_step_size(dt);
    }

    /// The mesh the simulation currently runs on.
    #[must_use]
    pub fn mesh(&self) -> &B::Mesh {
        &self.mesh
    }

    /// The mixed element, fixed for the engine's lifetime.
    #[must_use]
    pub fn element(&self) -> &B::Element {
        &self.element
    }

    /// The function space shared by all solution fields.
    #[must_use]
    pub fn function_space(&self) -> &Rc<B::FunctionSpace> {
        &self.space
    }

    /// The current solution field.
    #[must_use]
    pub fn solution(&self) -> &B::Field {
        self.solutions.current()
    }

    /// The full solution history.
    #[must_use]
    pub fn solutions(&self) -> &SolutionHistory<B> {
        &self.solutions
    }

    /// The full time history.
    #[must_use]
    pub fn time_history(&self) -> &TimeHistory {
        &self.times
    }

    /// Status of the most recent solve.
    #[must_use]
    pub fn status(&self) -> SolverStatus {
        self.status
    }

    /// Whether the solver must be rebuilt before the next solve.
    #[must_use]
    pub fn solver_needs_setup(&self) -> bool {
        self.lifecycle.needs_setup()
    }

    /// The point solver's parameter tree, once built.
    #[must_use]
    pub fn solver_config(&self) -> Option<&SolverConfig> {
        self.lifecycle.solver_config()
    }

    /// Mutable access to the point solver's parameter tree, for tuning
    /// tolerances or linear-solver choices. Tuning survives solver rebuilds.
    pub fn solver_config_mut(&mut self) -> Option<&mut SolverConfig> {
        self.lifecycle.solver_config_mut()
    }

    /// The adaptive solver's parameter tree, if the problem defines a goal.
    #[must_use]
    pub fn adaptive_config(&self) -> Option<&SolverConfig> {
        self.lifecycle.adaptive_config()
    }

    /// The problem definition this engine runs.
    #[must_use]
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// The backend this engine drives.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One discrete time-derivative expression per mixed-element component,
    /// computed from the solution history by the active backward-difference
    /// formula.
    #[must_use]
    pub fn time_discrete_terms(&self) -> Vec<B::Expr> {
        let current = self.backend.split(self.solutions.current());
        let previous = self.backend.split(self.solutions.slot(1));
        let dt0 = self.times.step_size();

        match self.time_order {
            TimeOrder::First => current
                .into_iter()
                .zip(previous)
                .map(|(w_next, w)| bdf::apply_backward_euler(dt0, (w_next, w)))
                .collect(),
            TimeOrder::Second => {
                let oldest = self.backend.split(self.solutions.slot(2));
                let dt1 = self.times.step_sizes()[1];
                current
                    .into_iter()
                    .zip(previous)
                    .zip(oldest)
                    .map(|((w_next, w), w_prev)| {
                        bdf::apply_bdf2((dt0, dt1), (w_next, w, w_prev))
                    })
                    .collect()
            }
        }
    }

    /// Rebuilds the variational problem and solvers against the current
    /// mesh, function space, and solution.
    ///
    /// Called automatically by [`solve`](SimulationEngine::solve) whenever
    /// the solver state is dirty; callers only need it to eagerly rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Backend`] if the form, boundary conditions, or
    /// Jacobian cannot be built. The solver stays dirty on failure.
    pub fn setup_solver(&mut self) -> Result<(), EngineError<B::Error>> {
        let terms = self.time_discrete_terms();
        let (form, boundary_conditions, goal) = {
            let ctx = FormContext {
                solution: self.solutions.current(),
                time_derivatives: &terms,
                measure: &self.measure,
            };
            let form = self
                .problem
                .governing_form(&self.backend, &ctx)
                .map_err(EngineError::Backend)?;
            let boundary_conditions = self
                .problem
                .boundary_conditions(&self.backend, self.solutions.space())
                .map_err(EngineError::Backend)?;
            let goal = self.problem.adaptive_goal(&self.backend, &ctx);
            (form, boundary_conditions, goal)
        };

        self.lifecycle.rebuild(
            &self.backend,
            form,
            self.solutions.current(),
            boundary_conditions,
            goal,
        )
    }

    /// Solves the current time step.
    ///
    /// Rebuilds the solver first if a mesh or element change left it dirty,
    /// restores `t0 = t1 + dt0`, then runs the plain point solver. When
    /// `goal_tolerance` is given it runs the goal-oriented adaptive solver
    /// instead, whose status reports no iteration count.
    ///
    /// A failed solve leaves the history untouched apart from the in-place
    /// current slot, and [`status`](SimulationEngine::status) keeps
    /// `solved: false`.
    ///
    /// # Errors
    ///
    /// See [`SolverLifecycle::solve`]; backend failures propagate
    /// unmodified.
    pub fn solve(
        &mut self,
        goal_tolerance: Option<f64>,
    ) -> Result<SolverStatus, EngineError<B::Error>> {
        if self.lifecycle.needs_setup() {
            self.setup_solver()?;
        }
        self.times.sync_current_time();

        match self
            .lifecycle
            .solve(&self.backend, self.solutions.current_mut(), goal_tolerance)
        {
            Ok(status) => {
                self.status = status;
                Ok(status)
            }
            Err(error) => {
                let iterations = match &error {
                    EngineError::Diverged { iterations } => {
                        tracing::warn!(iterations, "nonlinear solve diverged");
                        Some(*iterations)
                    }
                    _ => None,
                };
                self.status = SolverStatus {
                    iterations,
                    solved: false,
                };
                Err(error)
            }
        }
    }

    /// Commits the current step by shifting the solution and time histories
    /// one slot back.
    ///
    /// Kept separate from [`solve`](SimulationEngine::solve) so a step can
    /// be re-solved (for instance with an adjusted step size) before being
    /// committed.
    pub fn advance(&mut self) {
        self.solutions.advance(&self.backend);
        self.times.advance();
    }

    /// Fills every solution slot with the problem's initial values.
    ///
    /// Used once at the start of a run, and to re-seed after a mesh change.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Backend`] if the initial-value field cannot be
    /// built.
    pub fn assign_initial_values(&mut self) -> Result<(), EngineError<B::Error>> {
        let initial = self
            .problem
            .initial_values(&self.backend, self.solutions.space())
            .map_err(EngineError::Backend)?;
        self.solutions.fill_from(&self.backend, &initial);
        Ok(())
    }

    /// Copies the previous step's solution into the current slot.
    ///
    /// Recovers a clean starting point after a diverged nonlinear iteration
    /// has left garbage in the current slot.
    pub fn reset_initial_guess(&mut self) {
        self.solutions.reset_current_from_previous(&self.backend);
    }

    /// Snapshots the current solution into the auxiliary Newton-guess
    /// field.
    ///
    /// A failed Newton iteration replaces the current solution with garbage;
    /// saving after each successful solve keeps a known-good iterate to
    /// restore from. The guess field is bound to the current function space:
    /// if the backend refines the mesh internally during an adaptive solve,
    /// the snapshot is stale and must not be restored.
    pub fn save_newton_solution(&mut self) {
        self.backend
            .assign(&mut self.newton_guess, self.solutions.current());
    }

    /// Restores the current solution from the auxiliary Newton-guess field.
    ///
    /// Same function-space precondition as
    /// [`save_newton_solution`](SimulationEngine::save_newton_solution).
    pub fn load_newton_solution(&mut self) {
        self.backend
            .assign(self.solutions.current_mut(), &self.newton_guess);
    }

    /// Overwrites the current solution on a geometric subdomain,
    /// component-wise.
    ///
    /// Builds a throwaway Dirichlet-style constraint per mixed-element
    /// component (`values` holds one prescribed value per component) and
    /// applies them to a copy of the current solution before committing the
    /// copy back. Reusing the boundary-condition machinery this way gives a
    /// general "project values onto a subregion" primitive.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Backend`] if a constraint cannot be built or
    /// applied.
    pub fn set_solution_on_subdomain(
        &mut self,
        subdomain: &B::SubDomain,
        values: &[B::ComponentValue],
    ) -> Result<(), EngineError<B::Error>> {
        let mut scratch = self.backend.field(&self.space);
        self.backend.assign(&mut scratch, self.solutions.current());

        for (component, value) in values.iter().enumerate() {
            self.backend
                .constrain_component(&self.space, component, value, subdomain, &mut scratch)
                .map_err(EngineError::Backend)?;
        }

        self.backend.assign(self.solutions.current_mut(), &scratch);
        Ok(())
    }

    /// Moves the simulation onto a new mesh.
    ///
    /// Rebuilds the function space, reallocates every solution slot and the
    /// Newton-guess field against it, and marks the solver dirty so the next
    /// solve rebuilds. Solution values are not migrated between meshes; the
    /// caller re-seeds them, e.g. via
    /// [`assign_initial_values`](SimulationEngine::assign_initial_values).
    pub fn change_mesh(&mut self, mesh: B::Mesh) {
        self.mesh = mesh;
        self.space = self.backend.function_space(&self.mesh, &self.element);
        self.solutions.reinit(&self.backend, &self.space);
        self.newton_guess = self.backend.field(&self.space);
        self.lifecycle.mark_dirty();
        tracing::debug!("mesh changed; function space and solution history reallocated");
    }

    /// Produces an independent copy of this engine.
    ///
    /// The copy has the same time order and integration measure, a cloned
    /// mesh, solution values copied slot by slot, an identical time history,
    /// and its own freshly rebuilt solver whose configuration is copied from
    /// this engine. No mutable state is aliased, so the copy can be stepped,
    /// re-meshed, or discarded without affecting the original, which is
    /// useful for in-memory checkpointing and parameter sweeps.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Backend`] if the copy's solver cannot be
    /// built.
    pub fn deepcopy(&self) -> Result<Self, EngineError<B::Error>>
    where
        B: Clone,
        P: Clone,
    {
        let backend = self.backend.clone();
        let mesh = self.mesh.clone();
        let element = self.element.clone();
        let space = backend.function_space(&mesh, &element);

        let mut solutions =
            SolutionHistory::new(&backend, &space, self.time_order.history_depth());
        for slot in 0..solutions.depth() {
            backend.assign(solutions.slot_mut(slot), self.solutions.slot(slot));
        }
        let newton_guess = backend.field(&space);

        let mut copy = Self {
            backend,
            problem: self.problem.clone(),
            time_order: self.time_order,
            measure: self.measure.clone(),
            mesh,
            element,
            space,
            solutions,
            times: self.times.clone(),
            newton_guess,
            lifecycle: SolverLifecycle::new(),
            status: SolverStatus::default(),
        };
        copy.setup_solver()?;
        copy.lifecycle.copy_configs_from(&self.lifecycle);
        Ok(copy)
    }
}
