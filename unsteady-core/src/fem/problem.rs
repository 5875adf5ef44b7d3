use std::rc::Rc;

use crate::fem::FemBackend;

/// Everything a problem definition may consult while assembling its
/// governing form or goal functional.
///
/// The `time_derivatives` slice holds one discrete time-derivative expression
/// per component of the mixed solution, already weighted by the active
/// backward-difference formula; the implementer combines them into the
/// residual.
pub struct FormContext<'a, B: FemBackend> {
    /// The solution field the solver will iterate on.
    pub solution: &'a B::Field,
    /// Discrete time-derivative terms, one per mixed-element component.
    pub time_derivatives: &'a [B::Expr],
    /// The integration measure the simulation was constructed with.
    pub measure: &'a B::Measure,
}

/// The problem-definition contract an unsteady simulation runs against.
///
/// Implementers supply the geometry, the mixed element, the physics, and the
/// boundary data; the engine owns everything temporal. The two provided
/// methods are genuinely optional: a problem without an
/// [`adaptive_goal`](TransientProblem::adaptive_goal) simply cannot be solved
/// goal-adaptively, and [`initial_mesh`](TransientProblem::initial_mesh)
/// defaults to the coarse mesh.
pub trait TransientProblem<B: FemBackend> {
    /// The coarsest mesh the problem is posed on.
    fn coarse_mesh(&self, backend: &B) -> B::Mesh;

    /// The mixed finite element, fixed for the simulation's lifetime.
    fn element(&self, backend: &B) -> B::Element;

    /// Assembles the nonlinear residual form for the current state.
    ///
    /// # Errors
    ///
    /// Returns `B::Error` if assembly fails.
    fn governing_form(&self, backend: &B, ctx: &FormContext<'_, B>) -> Result<B::Form, B::Error>;

    /// The field of initial values, allocated on `space`.
    ///
    /// # Errors
    ///
    /// Returns `B::Error` if the field cannot be built.
    fn initial_values(
        &self,
        backend: &B,
        space: &Rc<B::FunctionSpace>,
    ) -> Result<B::Field, B::Error>;

    /// The boundary conditions in force on `space`.
    ///
    /// # Errors
    ///
    /// Returns `B::Error` if a condition cannot be built.
    fn boundary_conditions(
        &self,
        backend: &B,
        space: &Rc<B::FunctionSpace>,
    ) -> Result<Vec<B::BoundaryCondition>, B::Error>;

    /// The goal functional for goal-oriented adaptive refinement.
    ///
    /// Returning `None` (the default) disables adaptive solving for this
    /// problem.
    fn adaptive_goal(&self, backend: &B, ctx: &FormContext<'_, B>) -> Option<B::Goal> {
        let _ = (backend, ctx);
        None
    }

    /// The mesh a simulation starts on, refined ahead of any adaptive
    /// refinement. Defaults to [`coarse_mesh`](TransientProblem::coarse_mesh).
    fn initial_mesh(&self, backend: &B) -> B::Mesh {
        self.coarse_mesh(backend)
    }
}
