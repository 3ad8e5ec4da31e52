//! Ephemeral sink for tests and throwaway deployments.

use crate::document::Snapshot;
use crate::error::StorageResult;
use crate::sink::SnapshotSink;

/// A sink that persists nothing.
///
/// State lives only in the owning [`crate::DocumentStore`] and is lost when
/// it is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct EphemeralSink;

impl SnapshotSink for EphemeralSink {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        Ok(None)
    }

    fn persist(&self, _snapshot: &Snapshot) -> StorageResult<()> {
        Ok(())
    }

    fn is_blocking(&self) -> bool {
        false
    }
}
