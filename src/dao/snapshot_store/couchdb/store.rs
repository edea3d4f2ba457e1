use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use tracing::warn;

use crate::dao::{
    models::GameSnapshotEntity,
    snapshot_store::SnapshotStore,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchSnapshotDocument, SNAPSHOT_DOC_ID},
};

/// CouchDB-backed implementation of [`SnapshotStore`].
#[derive(Clone)]
pub struct CouchSnapshotStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchSnapshotStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);
        let mut builder = self.client.get(&url);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
        }

        let response = builder
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let mut builder = self.client.put(&url);
                if let Some((ref user, ref pass)) = self.auth {
                    builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
                }
                let create =
                    builder
                        .send()
                        .await
                        .map_err(|source| CouchDaoError::DatabaseCreate {
                            database: database.clone(),
                            source,
                        })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    /// Fetch the snapshot document, tolerating both absence and corruption.
    async fn get_document(&self) -> CouchResult<Option<CouchSnapshotDocument>> {
        let response = self
            .request(Method::GET, SNAPSHOT_DOC_ID)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: SNAPSHOT_DOC_ID.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                match response.json::<CouchSnapshotDocument>().await {
                    Ok(doc) => Ok(Some(doc)),
                    Err(err) => {
                        // Corrupt document: discard it and report an empty store.
                        warn!(error = %err, "discarding unreadable snapshot document");
                        if let Err(delete_err) = self.delete_document().await {
                            warn!(error = %delete_err, "failed to delete unreadable snapshot");
                        }
                        Ok(None)
                    }
                }
            }
            other => Err(CouchDaoError::RequestStatus {
                path: SNAPSHOT_DOC_ID.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document(&self, document: &CouchSnapshotDocument) -> CouchResult<()> {
        let response = self
            .request(Method::PUT, SNAPSHOT_DOC_ID)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: SNAPSHOT_DOC_ID.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: SNAPSHOT_DOC_ID.to_string(),
                status: response.status(),
            })
        }
    }

    async fn delete_document(&self) -> CouchResult<()> {
        let rev = {
            let response = self
                .request(Method::GET, SNAPSHOT_DOC_ID)
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: SNAPSHOT_DOC_ID.to_string(),
                    source,
                })?;

            match response.status() {
                StatusCode::NOT_FOUND => return Ok(()),
                status if status.is_success() => response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|source| CouchDaoError::DecodeResponse {
                        path: SNAPSHOT_DOC_ID.to_string(),
                        source,
                    })?
                    .get("_rev")
                    .and_then(|rev| rev.as_str())
                    .map(str::to_string),
                other => {
                    return Err(CouchDaoError::RequestStatus {
                        path: SNAPSHOT_DOC_ID.to_string(),
                        status: other,
                    });
                }
            }
        };

        let Some(rev) = rev else { return Ok(()) };

        let response = self
            .request(Method::DELETE, SNAPSHOT_DOC_ID)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: SNAPSHOT_DOC_ID.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            other => Err(CouchDaoError::RequestStatus {
                path: SNAPSHOT_DOC_ID.to_string(),
                status: other,
            }),
        }
    }
}

impl SnapshotStore for CouchSnapshotStore {
    fn save(&self, snapshot: GameSnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let rev = store
                .get_document()
                .await?
                .and_then(|existing| existing.rev);
            let doc = CouchSnapshotDocument::from_entity(snapshot, rev);
            store.put_document(&doc).await.map_err(Into::into)
        })
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<Option<GameSnapshotEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let maybe_doc = store.get_document().await?;
            Ok(maybe_doc.map(CouchSnapshotDocument::into_entity))
        })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_document().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let mut builder = store.client.get(&url);
            if let Some((ref user, ref pass)) = store.auth {
                builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
            }

            let response = builder
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
