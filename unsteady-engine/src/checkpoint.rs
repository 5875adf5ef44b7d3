//! Checkpoint persistence for simulation engines.
//!
//! A checkpoint is one container holding the current mesh, every solution
//! slot, and every time value, keyed by string tags: `mesh`,
//! `solution0..solutionK`, and `time0..timeK` for a time order K. Each time
//! value is stored as a length-1 scalar array, since some container formats
//! cannot persist a bare number.
//!
//! Reads validate that every required tag is present and read everything
//! into temporaries before touching the engine, so a malformed checkpoint
//! leaves the prior in-memory state intact.

use std::rc::Rc;

use thiserror::Error;
use uom::si::{f64::Time, time::second};

use unsteady_core::fem::{CheckpointStore, FemBackend, TransientProblem};

use crate::{EngineError, SimulationEngine};

/// Tag under which the mesh is stored.
pub const MESH_TAG: &str = "mesh";

/// Tag under which solution slot `slot` is stored.
#[must_use]
pub fn solution_tag(slot: usize) -> String {
    format!("solution{slot}")
}

/// Tag under which the time value of slot `slot` is stored.
#[must_use]
pub fn time_tag(slot: usize) -> String {
    format!("time{slot}")
}

/// Failures while writing or reading a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError<S, E>
where
    S: std::error::Error + 'static,
    E: std::error::Error + 'static,
{
    /// A tag required by the engine's time order is absent from the source.
    #[error("checkpoint is missing required tag {tag:?}")]
    MissingTag { tag: String },

    /// A time entry does not hold exactly one value.
    #[error("checkpoint tag {tag:?} holds {len} values where exactly one was expected")]
    MalformedTimeValue { tag: String, len: usize },

    /// The underlying container reported a failure.
    #[error("checkpoint store operation failed")]
    Store(#[source] S),

    /// Rebuilding the engine after a read failed.
    #[error("engine could not be rebuilt from the checkpoint")]
    Engine(#[source] EngineError<E>),
}

impl<B, P> SimulationEngine<B, P>
where
    B: FemBackend,
    P: TransientProblem<B>,
{
    /// Persists the mesh, all solution slots, and all time values to a
    /// checkpoint container.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Store`] if the container rejects a write.
    pub fn write_checkpoint<S>(
        &self,
        store: &mut S,
    ) -> Result<(), CheckpointError<S::Error, B::Error>>
    where
        S: CheckpointStore<B>,
    {
        tracing::info!("writing checkpoint");

        store
            .write_mesh(MESH_TAG, &self.mesh)
            .map_err(CheckpointError::Store)?;

        for slot in 0..self.solutions.depth() {
            store
                .write_field(&solution_tag(slot), self.solutions.slot(slot))
                .map_err(CheckpointError::Store)?;

            let seconds = self.times.time_at(slot).get::<second>();
            store
                .write_scalars(&time_tag(slot), &[seconds])
                .map_err(CheckpointError::Store)?;
        }
        Ok(())
    }

    /// Restores the engine from a checkpoint written by
    /// [`write_checkpoint`](SimulationEngine::write_checkpoint) on an engine
    /// of the same time order and element.
    ///
    /// Reads the mesh, rebuilds the function space from the engine's fixed
    /// element, reallocates and fills every solution slot, restores all time
    /// values, reallocates the Newton-guess field, and rebuilds the solver,
    /// after which the engine is ready to resume time stepping.
    ///
    /// # Errors
    ///
    /// - [`CheckpointError::MissingTag`] if a required tag is absent; the
    ///   engine is not touched.
    /// - [`CheckpointError::MalformedTimeValue`] if a time entry is not a
    ///   length-1 array; the engine is not touched.
    /// - [`CheckpointError::Store`] if the container rejects a read. Reads
    ///   happen before the engine is mutated.
    /// - [`CheckpointError::Engine`] if the post-read solver rebuild fails;
    ///   the engine holds the restored state but stays dirty.
    pub fn read_checkpoint<S>(
        &mut self,
        store: &mut S,
    ) -> Result<(), CheckpointError<S::Error, B::Error>>
    where
        S: CheckpointStore<B>,
    {
        tracing::info!("reading checkpoint");

        let depth = self.solutions.depth();
        let mut required = vec![MESH_TAG.to_owned()];
        for slot in 0..depth {
            required.push(solution_tag(slot));
            required.push(time_tag(slot));
        }
        for tag in &required {
            if !store.contains(tag) {
                return Err(CheckpointError::MissingTag { tag: tag.clone() });
            }
        }

        let mesh = store.read_mesh(MESH_TAG).map_err(CheckpointError::Store)?;
        let space = self.backend.function_space(&mesh, &self.element);

        let mut slots = Vec::with_capacity(depth);
        let mut times = Vec::with_capacity(depth);
        for slot in 0..depth {
            let mut field = self.backend.field(&space);
            store
                .read_field(&solution_tag(slot), &mut field)
                .map_err(CheckpointError::Store)?;
            slots.push(field);

            let tag = time_tag(slot);
            let values = store
                .read_scalars(&tag)
                .map_err(CheckpointError::Store)?;
            if values.len() != 1 {
                return Err(CheckpointError::MalformedTimeValue {
                    tag,
                    len: values.len(),
                });
            }
            times.push(Time::new::<second>(values[0]));
        }

        self.mesh = mesh;
        self.space = Rc::clone(&space);
        self.solutions.replace(space, slots);
        for (slot, time) in times.into_iter().enumerate() {
            self.times.set_time_at(slot, time);
        }
        self.newton_guess = self.backend.field(&self.space);
        self.lifecycle.mark_dirty();

        self.setup_solver().map_err(CheckpointError::Engine)
    }
}
