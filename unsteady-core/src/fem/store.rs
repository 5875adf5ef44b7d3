use crate::fem::FemBackend;

/// A persistent container a checkpoint is written to or read from.
///
/// Entries are keyed by string tag. Scalar sequences exist because some
/// container formats cannot store a bare number; a time value is persisted as
/// a length-1 array.
///
/// Reads and writes are blocking, atomic units from the core's perspective;
/// a distributed backend performs its collective I/O inside them.
pub trait CheckpointStore<B: FemBackend> {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether the container holds an entry with this tag.
    fn contains(&self, tag: &str) -> bool;

    /// Persists a mesh under `tag`.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the write fails.
    fn write_mesh(&mut self, tag: &str, mesh: &B::Mesh) -> Result<(), Self::Error>;

    /// Reads the mesh stored under `tag`.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the entry is missing or malformed.
    fn read_mesh(&mut self, tag: &str) -> Result<B::Mesh, Self::Error>;

    /// Persists a field's values under `tag`.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the write fails.
    fn write_field(&mut self, tag: &str, field: &B::Field) -> Result<(), Self::Error>;

    /// Reads the values stored under `tag` into an already allocated field.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the entry is missing, malformed, or does not
    /// match the field's layout.
    fn read_field(&mut self, tag: &str, target: &mut B::Field) -> Result<(), Self::Error>;

    /// Persists a scalar sequence under `tag`.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the write fails.
    fn write_scalars(&mut self, tag: &str, values: &[f64]) -> Result<(), Self::Error>;

    /// Reads the scalar sequence stored under `tag`.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the entry is missing or malformed.
    fn read_scalars(&mut self, tag: &str) -> Result<Vec<f64>, Self::Error>;
}
