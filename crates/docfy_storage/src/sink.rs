//! Snapshot sink trait definition.

use crate::document::Snapshot;
use crate::error::StorageResult;

/// Where a [`crate::DocumentStore`] keeps its state between mutations.
///
/// Sinks see whole snapshots. They do not interpret collections.
///
/// # Invariants
///
/// - `load` returns the snapshot most recently passed to `persist`, or `None`
///   if nothing was ever persisted
/// - A failed `persist` leaves the previously persisted snapshot intact
///
/// # Implementors
///
/// - [`super::EphemeralSink`] - Keeps nothing
/// - [`super::JsonFileSink`] - Writes a JSON file
pub trait SnapshotSink: Send + Sync + 'static {
    /// Reads the last persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data exists but cannot be read.
    fn load(&self) -> StorageResult<Option<Snapshot>>;

    /// Durably records `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn persist(&self, snapshot: &Snapshot) -> StorageResult<()>;

    /// Returns true if `persist` does blocking I/O, in which case the store
    /// runs it on the blocking thread pool.
    fn is_blocking(&self) -> bool {
        true
    }
}
