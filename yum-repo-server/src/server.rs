//! HTTP server setup: routing, startup sequence and listener.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    auth::auth_middleware,
    config::Config,
    handlers,
    indexer::InitOutcome,
    process::{ProcessRunner, TokioProcessRunner},
    repository::Repository,
    state::AppState,
};

/// Assemble the router for the given state.
///
/// Package downloads are served straight from the repository directory by the
/// fallback service, so any path not claimed by an API route maps onto a file.
pub fn build_router(state: Arc<AppState>) -> Router {
    let guard = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let mut upload_route = post(handlers::upload_package);
    if state.config.auth.protect_upload {
        upload_route = upload_route.route_layer(guard.clone());
    }
    let delete_route = delete(handlers::delete_package).route_layer(guard);

    let static_files = ServeDir::new(&state.config.repo_path);
    let body_limit = state.config.max_upload_size_bytes();

    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/help", get(handlers::help_handler))
        .route("/health", get(handlers::health_handler))
        .route("/api/status", get(handlers::status_handler))
        .route("/api/upload", upload_route)
        .route("/api/delete/{filename}", delete_route)
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the production state: real process runner, process-wide serializer,
/// and an initialised metadata index.
///
/// Expects a configuration that already passed [`Config::validate`].
pub async fn prepare_state(config: Config) -> Result<Arc<AppState>> {
    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
    let repository = Repository::from_config(&config, runner);

    match repository.indexer().initialize().await {
        Ok(InitOutcome::Created) => {
            info!(repo = %config.repo_path.display(), "Initialised empty repository")
        }
        Ok(InitOutcome::Existing) => {}
        Err(e) => {
            error!(error = %e, "Repository initialisation failed");
            anyhow::bail!(
                "failed to initialise repository in '{}': {e}",
                config.repo_path.display()
            );
        }
    }

    Ok(Arc::new(AppState::new(config, repository)))
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// In-flight requests, and with them any running reindex, are allowed to
/// finish before this returns.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}

/// Validate the configuration, prepare the repository and serve until Ctrl-C.
pub async fn run_server(config: Config) -> Result<()> {
    let config = config.validate()?;
    info!(
        repo = %config.repo_path.display(),
        createrepo = %config.createrepo_binary.display(),
        workers = config.workers,
        protected = config.protected,
        auth = config.auth.enabled,
        "Configuration validated"
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = prepare_state(config).await?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Server listening on {}", addr);

    serve(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, stopping gracefully");
}
