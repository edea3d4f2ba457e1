use serde::{Deserialize, Serialize};

use crate::dao::models::GameSnapshotEntity;

/// Fixed document id under which the single session snapshot lives.
pub const SNAPSHOT_DOC_ID: &str = "session::current";

/// CouchDB document wrapping the snapshot entity with revision metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchSnapshotDocument {
    /// CouchDB document id; always [`SNAPSHOT_DOC_ID`].
    #[serde(rename = "_id")]
    pub id: String,
    /// CouchDB revision, present once the document exists.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// The snapshot payload itself.
    #[serde(flatten)]
    pub snapshot: GameSnapshotEntity,
}

impl CouchSnapshotDocument {
    /// Wrap an entity for storage, carrying the revision of a prior document.
    pub fn from_entity(snapshot: GameSnapshotEntity, rev: Option<String>) -> Self {
        Self {
            id: SNAPSHOT_DOC_ID.to_string(),
            rev,
            snapshot,
        }
    }

    /// Unwrap the stored entity, discarding CouchDB metadata.
    pub fn into_entity(self) -> GameSnapshotEntity {
        self.snapshot
    }
}
