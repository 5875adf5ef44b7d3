use std::{
    ops::{Add, Mul},
    rc::Rc,
};

use crate::{SolverConfig, fem::VariationalProblem};

/// The outcome of a plain nonlinear solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverReport {
    /// Nonlinear iterations performed.
    pub iterations: usize,
    /// Whether the iteration met its convergence criteria.
    pub converged: bool,
}

/// Capability contract for a finite-element spatial discretization engine.
///
/// A backend owns the meaning of meshes, elements, function spaces, and
/// discrete fields, and performs every algebraic solve. The time-stepping
/// core drives it but never looks inside its types.
///
/// Function spaces are shared between all fields allocated on them, so they
/// are handed out as [`Rc`]; the whole framework is single-threaded and a
/// backend may assume its methods are never called concurrently.
pub trait FemBackend {
    /// A spatial mesh.
    type Mesh: Clone;
    /// A (mixed) finite element, fixed for the lifetime of a simulation.
    type Element: Clone;
    /// A function space built from a mesh and an element.
    type FunctionSpace;
    /// A discrete field holding solution values on a function space.
    type Field;
    /// A per-component expression, usable in form assembly.
    ///
    /// Discrete time-derivative terms are built as scalar-weighted
    /// combinations of these, hence the operator bounds.
    type Expr: Clone + Add<Output = Self::Expr> + Mul<f64, Output = Self::Expr>;
    /// A variational form (residual or Jacobian).
    type Form;
    /// A Dirichlet-style boundary condition.
    type BoundaryCondition;
    /// A geometric subdomain selector.
    type SubDomain;
    /// A prescribed value for one component of the mixed solution.
    type ComponentValue;
    /// A goal functional for goal-oriented adaptive refinement.
    type Goal;
    /// An integration measure for form assembly.
    type Measure: Clone;
    /// Failures raised by the engine, surfaced to callers unmodified.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds the function space for a mesh/element pair.
    fn function_space(
        &self,
        mesh: &Self::Mesh,
        element: &Self::Element,
    ) -> Rc<Self::FunctionSpace>;

    /// Allocates a zero-initialized field on a function space.
    fn field(&self, space: &Rc<Self::FunctionSpace>) -> Self::Field;

    /// Copies the values of `source` into `target`.
    ///
    /// Both fields must have the same layout; this is a value copy, not an
    /// interpolation between spaces.
    fn assign(&self, target: &mut Self::Field, source: &Self::Field);

    /// Splits a mixed field into one expression per solution component.
    fn split(&self, field: &Self::Field) -> Vec<Self::Expr>;

    /// Number of components in a mixed element.
    fn component_count(&self, element: &Self::Element) -> usize;

    /// Symbolically differentiates a form about the given solution field,
    /// producing the Jacobian form.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the form cannot be differentiated.
    fn differentiate(
        &self,
        form: &Self::Form,
        about: &Self::Field,
    ) -> Result<Self::Form, Self::Error>;

    /// The engine's default point-solver parameter tree.
    fn default_solver_config(&self) -> SolverConfig;

    /// The engine's default adaptive-solver parameter tree.
    ///
    /// Must contain a `"nonlinear_variational_solver"` group mirroring the
    /// point-solver tree, which the lifecycle fills in before every
    /// goal-oriented solve.
    fn default_adaptive_config(&self) -> SolverConfig;

    /// Runs the plain nonlinear solver, updating `solution` in place.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` on failures other than non-convergence;
    /// non-convergence is reported through [`SolverReport::converged`].
    fn solve_nonlinear(
        &self,
        problem: &VariationalProblem<Self>,
        config: &SolverConfig,
        solution: &mut Self::Field,
    ) -> Result<SolverReport, Self::Error>
    where
        Self: Sized;

    /// Runs the goal-oriented adaptive solver to the given tolerance,
    /// updating `solution` in place.
    ///
    /// The adaptive path reports no iteration count.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the adaptive solve fails.
    fn solve_adaptive(
        &self,
        problem: &VariationalProblem<Self>,
        goal: &Self::Goal,
        tolerance: f64,
        config: &SolverConfig,
        solution: &mut Self::Field,
    ) -> Result<(), Self::Error>
    where
        Self: Sized;

    /// Overwrites one component of `target` on a geometric subdomain by
    /// applying a throwaway Dirichlet-style constraint.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the constraint cannot be built or applied.
    fn constrain_component(
        &self,
        space: &Rc<Self::FunctionSpace>,
        component: usize,
        value: &Self::ComponentValue,
        subdomain: &Self::SubDomain,
        target: &mut Self::Field,
    ) -> Result<(), Self::Error>;
}
