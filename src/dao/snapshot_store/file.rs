//! File-backed snapshot store keeping one JSON document at a fixed path.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::fs;
use tracing::warn;

use crate::dao::{
    models::GameSnapshotEntity,
    snapshot_store::SnapshotStore,
    storage::{StorageError, StorageResult},
};

/// Snapshot store writing the session document to local disk.
///
/// Writes go through a sibling temp file followed by a rename so a crash
/// mid-save never leaves a truncated document behind.
#[derive(Clone)]
pub struct FileSnapshotStore {
    path: Arc<PathBuf>,
}

impl FileSnapshotStore {
    /// Open the store, creating the parent directory when missing.
    pub async fn open(path: PathBuf) -> StorageResult<Self> {
        ensure_parent(&path).await?;
        Ok(Self {
            path: Arc::new(path),
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

async fn ensure_parent(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await.map_err(|source| {
            StorageError::unavailable(
                format!("cannot create snapshot directory `{}`", parent.display()),
                source,
            )
        })?;
    }
    Ok(())
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: GameSnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let payload = serde_json::to_vec_pretty(&snapshot).map_err(|source| {
                StorageError::unavailable("cannot encode snapshot".into(), source)
            })?;

            let temp = store.temp_path();
            fs::write(&temp, payload).await.map_err(|source| {
                StorageError::unavailable(
                    format!("cannot write snapshot to `{}`", temp.display()),
                    source,
                )
            })?;
            fs::rename(&temp, store.path.as_ref())
                .await
                .map_err(|source| {
                    StorageError::unavailable(
                        format!("cannot move snapshot into `{}`", store.path.display()),
                        source,
                    )
                })
        })
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<Option<GameSnapshotEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let contents = match fs::read(store.path.as_ref()).await {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(source) => {
                    return Err(StorageError::unavailable(
                        format!("cannot read snapshot at `{}`", store.path.display()),
                        source,
                    ));
                }
            };

            match serde_json::from_slice::<GameSnapshotEntity>(&contents) {
                Ok(snapshot) => Ok(Some(snapshot)),
                Err(err) => {
                    // Corrupt document: discard it and report an empty store.
                    warn!(
                        path = %store.path.display(),
                        error = %err,
                        "discarding unreadable snapshot"
                    );
                    if let Err(remove_err) = fs::remove_file(store.path.as_ref()).await
                        && remove_err.kind() != ErrorKind::NotFound
                    {
                        warn!(
                            path = %store.path.display(),
                            error = %remove_err,
                            "failed to remove unreadable snapshot"
                        );
                    }
                    Ok(None)
                }
            }
        })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            match fs::remove_file(store.path.as_ref()).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(StorageError::unavailable(
                    format!("cannot delete snapshot at `{}`", store.path.display()),
                    source,
                )),
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { ensure_parent(&store.path).await })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { ensure_parent(&store.path).await })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;
    use crate::{dao::models::LifelineUsageEntity, trivia::Difficulty};

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir()
            .join("millionaire-back-tests")
            .join(format!("{}.json", Uuid::new_v4()))
    }

    fn sample_snapshot() -> GameSnapshotEntity {
        GameSnapshotEntity {
            id: Uuid::new_v4(),
            difficulty: Difficulty::Medium,
            category: None,
            questions: Vec::new(),
            current_question_index: 4,
            started: true,
            lifelines_used: LifelineUsageEntity::default(),
            time_left: 30,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn save_load_clear_round_trip() {
        let store = FileSnapshotStore::open(temp_store_path()).await.unwrap();

        assert!(store.load().await.unwrap().is_none());

        let snapshot = sample_snapshot();
        store.save(snapshot.clone()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(snapshot));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Clearing twice stays quiet.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let store = FileSnapshotStore::open(temp_store_path()).await.unwrap();

        let mut snapshot = sample_snapshot();
        store.save(snapshot.clone()).await.unwrap();

        snapshot.current_question_index = 9;
        store.save(snapshot.clone()).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.current_question_index, 9);
    }

    #[tokio::test]
    async fn corrupt_document_is_discarded() {
        let path = temp_store_path();
        let store = FileSnapshotStore::open(path.clone()).await.unwrap();

        fs::write(&path, b"{ not json").await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // The corrupt file is gone afterwards.
        assert!(fs::metadata(&path).await.is_err());
    }
}
