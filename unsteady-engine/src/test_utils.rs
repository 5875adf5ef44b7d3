//! Mock finite-element backend for exercising the engine without a real
//! spatial discretization package.
//!
//! Fields are nodal values on a 1D interval mesh, component-interleaved.
//! Governing forms are stand-ins with trivially known solutions, which keeps
//! every test's expected state exact.

use std::{cell::Cell, collections::HashMap, rc::Rc};

use thiserror::Error;

use unsteady_core::{
    ConfigValue, SolverConfig, TimeOrder,
    fem::{
        CheckpointStore, FemBackend, FormContext, SolverReport, TransientProblem,
        VariationalProblem,
    },
};

use crate::SimulationEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalMesh {
    pub cells: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodalElement {
    pub components: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NodalSpace {
    pub mesh: IntervalMesh,
    pub element: NodalElement,
}

impl NodalSpace {
    pub fn node_count(&self) -> usize {
        self.mesh.cells + 1
    }

    pub fn dof_count(&self) -> usize {
        self.node_count() * self.element.components
    }
}

/// Component-interleaved nodal values.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalField {
    pub values: Vec<f64>,
    pub components: usize,
}

/// Governing forms with trivially known solutions.
#[derive(Debug, Clone, PartialEq)]
pub enum TestForm {
    /// The solve leaves the solution exactly where it is.
    Stationary,
    /// The solve fills every degree of freedom with the given value.
    SetAll(f64),
    /// The nonlinear iteration never converges and scrambles the solution.
    Diverging,
}

/// An inclusive range of node indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRange {
    pub first: usize,
    pub last: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeanGoal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMeasure;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TestBackendError {
    #[error("mock backend failure: {0}")]
    Failure(String),
}

/// The mock backend. Clones share the call counters, so a deep-copied
/// engine's activity is visible through the original handle.
#[derive(Debug, Clone, Default)]
pub struct TestBackend {
    pub rebuilds: Rc<Cell<usize>>,
    pub plain_solves: Rc<Cell<usize>>,
    pub adaptive_solves: Rc<Cell<usize>>,
}

impl TestBackend {
    fn max_iterations(config: &SolverConfig) -> usize {
        match config
            .group("newton_solver")
            .ok()
            .and_then(|g| g.get("maximum_iterations"))
        {
            Some(ConfigValue::Int(n)) => *n as usize,
            _ => 0,
        }
    }

    fn apply_form(form: &TestForm, solution: &mut NodalField) {
        match form {
            TestForm::Stationary => {}
            TestForm::SetAll(value) => solution.values.fill(*value),
            TestForm::Diverging => solution.values.fill(f64::NAN),
        }
    }
}

impl FemBackend for TestBackend {
    type Mesh = IntervalMesh;
    type Element = NodalElement;
    type FunctionSpace = NodalSpace;
    type Field = NodalField;
    type Expr = f64;
    type Form = TestForm;
    type BoundaryCondition = ();
    type SubDomain = NodeRange;
    type ComponentValue = f64;
    type Goal = MeanGoal;
    type Measure = CellMeasure;
    type Error = TestBackendError;

    fn function_space(&self, mesh: &IntervalMesh, element: &NodalElement) -> Rc<NodalSpace> {
        Rc::new(NodalSpace {
            mesh: mesh.clone(),
            element: element.clone(),
        })
    }

    fn field(&self, space: &Rc<NodalSpace>) -> NodalField {
        NodalField {
            values: vec![0.0; space.dof_count()],
            components: space.element.components,
        }
    }

    fn assign(&self, target: &mut NodalField, source: &NodalField) {
        target.values = source.values.clone();
    }

    fn split(&self, field: &NodalField) -> Vec<f64> {
        // One expression per component: its mean nodal value.
        let nodes = field.values.len() / field.components;
        (0..field.components)
            .map(|component| {
                let sum: f64 = (0..nodes)
                    .map(|node| field.values[node * field.components + component])
                    .sum();
                sum / nodes as f64
            })
            .collect()
    }

    fn component_count(&self, element: &NodalElement) -> usize {
        element.components
    }

    fn differentiate(
        &self,
        form: &TestForm,
        _about: &NodalField,
    ) -> Result<TestForm, TestBackendError> {
        self.rebuilds.set(self.rebuilds.get() + 1);
        Ok(form.clone())
    }

    fn default_solver_config(&self) -> SolverConfig {
        let mut newton = SolverConfig::new();
        newton
            .insert("maximum_iterations", ConfigValue::Int(25))
            .insert("relative_tolerance", ConfigValue::Real(1e-9))
            .insert("report", ConfigValue::Bool(false));

        let mut config = SolverConfig::new();
        config
            .insert("nonlinear_solver", ConfigValue::Str("newton".into()))
            .insert("newton_solver", ConfigValue::Group(newton));
        config
    }

    fn default_adaptive_config(&self) -> SolverConfig {
        let mut config = SolverConfig::new();
        config
            .insert("max_refinements", ConfigValue::Int(10))
            .insert(
                "nonlinear_variational_solver",
                ConfigValue::Group(self.default_solver_config()),
            );
        config
    }

    fn solve_nonlinear(
        &self,
        problem: &VariationalProblem<Self>,
        config: &SolverConfig,
        solution: &mut NodalField,
    ) -> Result<SolverReport, TestBackendError> {
        self.plain_solves.set(self.plain_solves.get() + 1);
        Self::apply_form(&problem.form, solution);

        match problem.form {
            TestForm::Diverging => Ok(SolverReport {
                iterations: Self::max_iterations(config),
                converged: false,
            }),
            _ => Ok(SolverReport {
                iterations: 2,
                converged: true,
            }),
        }
    }

    fn solve_adaptive(
        &self,
        problem: &VariationalProblem<Self>,
        _goal: &MeanGoal,
        _tolerance: f64,
        _config: &SolverConfig,
        solution: &mut NodalField,
    ) -> Result<(), TestBackendError> {
        self.adaptive_solves.set(self.adaptive_solves.get() + 1);

        if matches!(problem.form, TestForm::Diverging) {
            return Err(TestBackendError::Failure("adaptive solve failed".into()));
        }
        Self::apply_form(&problem.form, solution);
        Ok(())
    }

    fn constrain_component(
        &self,
        space: &Rc<NodalSpace>,
        component: usize,
        value: &f64,
        subdomain: &NodeRange,
        target: &mut NodalField,
    ) -> Result<(), TestBackendError> {
        let components = space.element.components;
        let last = subdomain.last.min(space.node_count() - 1);
        for node in subdomain.first..=last {
            target.values[node * components + component] = *value;
        }
        Ok(())
    }
}

/// A problem definition over the mock backend.
#[derive(Debug, Clone)]
pub struct TestProblem {
    pub cells: usize,
    pub components: usize,
    pub initial: f64,
    pub form: TestForm,
    pub with_goal: bool,
}

impl Default for TestProblem {
    fn default() -> Self {
        Self {
            cells: 4,
            components: 2,
            initial: 0.0,
            form: TestForm::Stationary,
            with_goal: false,
        }
    }
}

impl TransientProblem<TestBackend> for TestProblem {
    fn coarse_mesh(&self, _backend: &TestBackend) -> IntervalMesh {
        IntervalMesh { cells: self.cells }
    }

    fn element(&self, _backend: &TestBackend) -> NodalElement {
        NodalElement {
            components: self.components,
        }
    }

    fn governing_form(
        &self,
        _backend: &TestBackend,
        _ctx: &FormContext<'_, TestBackend>,
    ) -> Result<TestForm, TestBackendError> {
        Ok(self.form.clone())
    }

    fn initial_values(
        &self,
        _backend: &TestBackend,
        space: &Rc<NodalSpace>,
    ) -> Result<NodalField, TestBackendError> {
        Ok(NodalField {
            values: vec![self.initial; space.dof_count()],
            components: space.element.components,
        })
    }

    fn boundary_conditions(
        &self,
        _backend: &TestBackend,
        _space: &Rc<NodalSpace>,
    ) -> Result<Vec<()>, TestBackendError> {
        Ok(vec![])
    }

    fn adaptive_goal(
        &self,
        _backend: &TestBackend,
        _ctx: &FormContext<'_, TestBackend>,
    ) -> Option<MeanGoal> {
        self.with_goal.then_some(MeanGoal)
    }
}

/// Builds an engine over the mock backend.
pub fn engine(problem: TestProblem, order: usize) -> SimulationEngine<TestBackend, TestProblem> {
    SimulationEngine::new(
        TestBackend::default(),
        problem,
        TimeOrder::new(order).unwrap(),
        CellMeasure,
    )
    .unwrap()
}

#[derive(Debug, Clone)]
pub enum StoredEntry {
    Mesh(IntervalMesh),
    Field(Vec<f64>),
    Scalars(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MemoryStoreError {
    #[error("no entry tagged {0:?}")]
    Missing(String),
    #[error("entry {0:?} holds a different kind of data")]
    WrongKind(String),
    #[error("field tagged {tag:?} has {stored} values, destination expects {expected}")]
    LengthMismatch {
        tag: String,
        stored: usize,
        expected: usize,
    },
}

/// An in-memory checkpoint container.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, StoredEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops an entry, for simulating a truncated checkpoint.
    pub fn remove(&mut self, tag: &str) {
        self.entries.remove(tag);
    }

    /// Overwrites a scalar entry, for simulating a malformed checkpoint.
    pub fn put_scalars(&mut self, tag: &str, values: Vec<f64>) {
        self.entries
            .insert(tag.to_owned(), StoredEntry::Scalars(values));
    }
}

impl CheckpointStore<TestBackend> for MemoryStore {
    type Error = MemoryStoreError;

    fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    fn write_mesh(&mut self, tag: &str, mesh: &IntervalMesh) -> Result<(), MemoryStoreError> {
        self.entries
            .insert(tag.to_owned(), StoredEntry::Mesh(mesh.clone()));
        Ok(())
    }

    fn read_mesh(&mut self, tag: &str) -> Result<IntervalMesh, MemoryStoreError> {
        match self.entries.get(tag) {
            Some(StoredEntry::Mesh(mesh)) => Ok(mesh.clone()),
            Some(_) => Err(MemoryStoreError::WrongKind(tag.to_owned())),
            None => Err(MemoryStoreError::Missing(tag.to_owned())),
        }
    }

    fn write_field(&mut self, tag: &str, field: &NodalField) -> Result<(), MemoryStoreError> {
        self.entries
            .insert(tag.to_owned(), StoredEntry::Field(field.values.clone()));
        Ok(())
    }

    fn read_field(&mut self, tag: &str, target: &mut NodalField) -> Result<(), MemoryStoreError> {
        match self.entries.get(tag) {
            Some(StoredEntry::Field(values)) => {
                if values.len() != target.values.len() {
                    return Err(MemoryStoreError::LengthMismatch {
                        tag: tag.to_owned(),
                        stored: values.len(),
                        expected: target.values.len(),
                    });
                }
                target.values.copy_from_slice(values);
                Ok(())
            }
            Some(_) => Err(MemoryStoreError::WrongKind(tag.to_owned())),
            None => Err(MemoryStoreError::Missing(tag.to_owned())),
        }
    }

    fn write_scalars(&mut self, tag: &str, values: &[f64]) -> Result<(), MemoryStoreError> {
        self.entries
            .insert(tag.to_owned(), StoredEntry::Scalars(values.to_vec()));
        Ok(())
    }

    fn read_scalars(&mut self, tag: &str) -> Result<Vec<f64>, MemoryStoreError> {
        match self.entries.get(tag) {
            Some(StoredEntry::Scalars(values)) => Ok(values.clone()),
            Some(_) => Err(MemoryStoreError::WrongKind(tag.to_owned())),
            None => Err(MemoryStoreError::Missing(tag.to_owned())),
        }
    }
}
