use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::backend::database::SqliteBackend;
use crate::backend::{BackendFactory, DirectoryBackend};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::import::UserImporter;
use crate::logging::logging_middleware;
use crate::resource::{self, AppState};

/// Create the SQLite directory and insert configured reference data
pub async fn setup_backend(config: &AppConfig) -> AppResult<Arc<SqliteBackend>> {
    let backend_config = config
        .database_backend_config()
        .map_err(AppError::Configuration)?;

    info!(url = %backend_config.connection_url, "Setting up SQLite directory");
    let backend = BackendFactory::create(&backend_config).await?;

    if let Some(seed) = &config.seed {
        backend.seed(seed).await?;
    }

    Ok(backend)
}

/// Routes of the import service
pub fn build_router(state: AppState, access_log: bool) -> Router {
    let router = Router::new()
        .route("/user-import", post(resource::import::import_users))
        .route("/health", get(resource::health::health))
        .with_state(state);

    if access_log {
        router.layer(middleware::from_fn(logging_middleware))
    } else {
        router
    }
}

/// Build the whole application from configuration
pub async fn build_app(config: &AppConfig) -> AppResult<Router> {
    let backend = setup_backend(config).await?;
    let directory: Arc<dyn DirectoryBackend> = backend.clone();
    let importer = UserImporter::new(directory, config.import.settings());

    Ok(build_router(
        AppState::new(importer, backend),
        config.logging.access_log,
    ))
}
