//! Web interface: a single upload form in front of [`StudyDeckService`].
//!
//! | Route | |
//! |---|---|
//! | `GET /` | the form |
//! | `POST /generate` | multipart submit, renders the result page |
//! | `POST /rebuild/:id` | repackage a result with the ticked cards |
//! | `GET /download/:id` | the generated file, once |
//! | `GET /health` | `OK`, never behind auth |

pub mod auth;
pub mod error;
pub mod handlers;
pub mod store;
pub mod views;

use crate::config::ServerConfig;
use crate::error::StudyDeckError;
use crate::service::StudyDeckService;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use store::ArtifactStore;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared by every request.
pub struct AppState {
    pub service: StudyDeckService,
    pub artifacts: ArtifactStore,
    pub server: ServerConfig,
}

impl AppState {
    pub fn new(service: StudyDeckService, server: ServerConfig) -> Result<Self, StudyDeckError> {
        let artifacts = ArtifactStore::new()
            .map_err(|e| StudyDeckError::Internal(format!("cannot create artifact directory: {e}")))?;
        Ok(Self {
            service,
            artifacts,
            server,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let gated = Router::new()
        .route("/", get(handlers::index))
        .route("/generate", post(handlers::generate))
        .route("/rebuild/:id", post(handlers::rebuild))
        .route("/download/:id", get(handlers::download))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_basic_auth,
        ));

    Router::new()
        .merge(gated)
        .route("/health", get(handlers::health))
        // Uploads are capped as a whole, not per extractor.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(service: StudyDeckService, server: ServerConfig) -> Result<(), StudyDeckError> {
    let addr = server.socket_addr()?;
    if server.credentials.is_some() {
        info!("Basic authentication enabled");
    }
    let state = Arc::new(AppState::new(service, server)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StudyDeckError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StudyDeckError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
