//! Pluggable persistence backends for the single resumable session snapshot.

#[cfg(feature = "couch-store")]
pub mod couchdb;
#[cfg(feature = "file-store")]
pub mod file;

use crate::dao::models::GameSnapshotEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for the session snapshot.
///
/// All backends store exactly one snapshot under a fixed key with
/// last-write-wins semantics; a load after a clear yields `None`.
pub trait SnapshotStore: Send + Sync {
    /// Persist the snapshot, replacing any previous one.
    fn save(&self, snapshot: GameSnapshotEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load the stored snapshot, if any. Unreadable payloads are discarded
    /// and reported as absent rather than failing the caller.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<GameSnapshotEntity>>>;
    /// Delete the stored snapshot; succeeds when none exists.
    fn clear(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Probe whether the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
