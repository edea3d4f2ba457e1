//! Millionaire Back binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use millionaire_back::{
    config::AppConfig,
    dao::{snapshot_store::SnapshotStore, storage::StorageError},
    routes,
    services::{notification::Notifier, sse_service, storage_supervisor},
    state::{AppState, SharedState},
    trivia::opentdb::OpenTdbClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let questions = Arc::new(OpenTdbClient::from_env().context("building trivia client")?);
    let notifier = Notifier::from_env().context("building notification client")?;

    let app_state = AppState::new(config, questions, notifier);

    tokio::spawn(storage_supervisor::run(app_state.clone(), connect_store));
    tokio::spawn(sse_service::watch_degraded(app_state.clone()));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Connect to the snapshot store backend selected by `STORE_BACKEND`.
///
/// Defaults to the file-backed store when the variable is unset. The
/// storage supervisor retries this closure with backoff until it succeeds.
async fn connect_store() -> Result<Arc<dyn SnapshotStore>, StorageError> {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "file".into());

    match backend.as_str() {
        #[cfg(feature = "couch-store")]
        "couch" => {
            use millionaire_back::dao::snapshot_store::couchdb::{
                config::CouchConfig, store::CouchSnapshotStore,
            };

            let config = CouchConfig::from_env()
                .map_err(|err| StorageError::unavailable("invalid CouchDB config".into(), err))?;
            let store = CouchSnapshotStore::connect(config)
                .await
                .map_err(|err| StorageError::unavailable("CouchDB connection failed".into(), err))?;
            Ok(Arc::new(store) as Arc<dyn SnapshotStore>)
        }
        #[cfg(feature = "file-store")]
        "file" => connect_file_store().await,
        other => {
            tracing::warn!(backend = other, "unknown store backend; using file store");
            connect_file_store().await
        }
    }
}

#[cfg(feature = "file-store")]
async fn connect_file_store() -> Result<Arc<dyn SnapshotStore>, StorageError> {
    use std::path::PathBuf;

    use millionaire_back::dao::snapshot_store::file::FileSnapshotStore;

    let path = env::var_os("SNAPSHOT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/session.json"));
    let store = FileSnapshotStore::open(path).await?;
    Ok(Arc::new(store) as Arc<dyn SnapshotStore>)
}

#[cfg(not(feature = "file-store"))]
async fn connect_file_store() -> Result<Arc<dyn SnapshotStore>, StorageError> {
    Err(StorageError::unavailable(
        "file store support not compiled in".into(),
        std::io::Error::from(std::io::ErrorKind::Unsupported),
    ))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
