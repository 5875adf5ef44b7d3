use std::rc::Rc;

use unsteady_core::fem::FemBackend;

/// The rolling record of discrete solution fields of an unsteady simulation.
///
/// Slots are ordered most-recent first and index-aligned with the
/// [`TimeHistory`](unsteady_core::TimeHistory): slot 0 is the solution being
/// computed, slot 1 the last committed step, and so on. Every slot is bound
/// to the same shared function space; when the mesh or element changes, the
/// whole history must be reallocated against the new space via
/// [`reinit`](SolutionHistory::reinit), which deliberately does not migrate
/// values; re-seeding after a mesh change is the caller's decision.
pub struct SolutionHistory<B: FemBackend> {
    space: Rc<B::FunctionSpace>,
    slots: Vec<B::Field>,
}

impl<B: FemBackend> SolutionHistory<B> {
    /// Allocates `depth` zero-initialized fields on `space`.
    pub fn new(backend: &B, space: &Rc<B::FunctionSpace>, depth: usize) -> Self {
        let slots = (0..depth).map(|_| backend.field(space)).collect();
        Self {
            space: Rc::clone(space),
            slots,
        }
    }

    /// The function space every slot is bound to.
    #[must_use]
    pub fn space(&self) -> &Rc<B::FunctionSpace> {
        &self.space
    }

    /// Number of slots.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// The current solution field.
    #[must_use]
    pub fn current(&self) -> &B::Field {
        &self.slots[0]
    }

    /// Mutable access to the current solution field.
    pub fn current_mut(&mut self) -> &mut B::Field {
        &mut self.slots[0]
    }

    /// The solution field in a given history slot (0 = current).
    ///
    /// # Panics
    ///
    /// Panics if `slot` exceeds the history depth.
    #[must_use]
    pub fn slot(&self, slot: usize) -> &B::Field {
        &self.slots[slot]
    }

    /// Mutable access to a history slot, for value restoration.
    pub(crate) fn slot_mut(&mut self, slot: usize) -> &mut B::Field {
        &mut self.slots[slot]
    }

    /// Shifts solution values one slot back, oldest first, preparing for a
    /// new time step.
    ///
    /// This copies values between fields; the current slot keeps its values
    /// as the starting guess for the next step.
    pub fn advance(&mut self, backend: &B) {
        for i in (1..self.slots.len()).rev() {
            let (head, tail) = self.slots.split_at_mut(i);
            backend.assign(&mut tail[0], &head[i - 1]);
        }
    }

    /// Copies `source`'s values into every slot.
    pub fn fill_from(&mut self, backend: &B, source: &B::Field) {
        for slot in &mut self.slots {
            backend.assign(slot, source);
        }
    }

    /// Copies the previous step's values back into the current slot.
    ///
    /// Used to recover a clean starting point after a diverged nonlinear
    /// iteration has left garbage in the current slot.
    pub fn reset_current_from_previous(&mut self, backend: &B) {
        let (current, rest) = self.slots.split_at_mut(1);
        backend.assign(&mut current[0], &rest[0]);
    }

    /// Reallocates every slot against a new function space.
    ///
    /// Values are not migrated between spaces; all slots come back
    /// zero-initialized.
    pub fn reinit(&mut self, backend: &B, space: &Rc<B::FunctionSpace>) {
        self.space = Rc::clone(space);
        for slot in &mut self.slots {
            *slot = backend.field(space);
        }
    }

    /// Replaces the history wholesale with fields restored from a
    /// checkpoint.
    pub(crate) fn replace(&mut self, space: Rc<B::FunctionSpace>, slots: Vec<B::Field>) {
        self.space = space;
        self.slots = slots;
    }
}
