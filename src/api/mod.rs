// HTTP surface of the launch service.
//
// Routes live under `/api`; `/health` sits at the root for probes.

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use mintforge_types::ErrorResponse;

use crate::chain::Network;
use crate::error::{LaunchError, Result};
use crate::orchestrator::{DeploymentGuard, DeploymentOrchestrator};

mod handlers;

pub use handlers::*;

/// Headroom for the non-file form fields on top of the logo limit.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub orchestrator: Arc<DeploymentOrchestrator>,
    pub guard: Arc<DeploymentGuard>,
    /// Requests naming any other network are refused.
    pub network: Network,
    pub max_logo_bytes: usize,
}

impl AppState {
    pub fn new(orchestrator: Arc<DeploymentOrchestrator>, max_logo_bytes: usize) -> Self {
        let network = orchestrator.chain().network();
        Self {
            orchestrator,
            guard: Arc::new(DeploymentGuard::new()),
            network,
            max_logo_bytes,
        }
    }

    pub(crate) fn ensure_network(&self, requested: &str) -> Result<()> {
        let requested: Network = requested.parse()?;
        if requested != self.network {
            return Err(LaunchError::validation(format!(
                "this service deploys to {}, request asked for {}",
                self.network, requested
            )));
        }
        Ok(())
    }
}

/// API error response: the status plus `{success: false, error, errorKind, step?}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        let mut body = ErrorResponse::new(message);
        body.error_kind = Some(crate::error::ErrorKind::Validation.to_string());
        Self {
            status: StatusCode::BAD_REQUEST,
            body,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn status_for(err: &LaunchError) -> StatusCode {
    match err {
        LaunchError::DuplicateRequest(_) => StatusCode::CONFLICT,
        e if e.is_user_correctable() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LaunchError> for ApiError {
    fn from(err: LaunchError) -> Self {
        let mut body = ErrorResponse::new(err.to_string());
        body.error_kind = Some(err.kind().to_string());
        body.step = err.step().map(String::from);
        Self {
            status: status_for(&err),
            body,
        }
    }
}

/// API Server
pub struct ApiServer {
    state: Arc<AppState>,
    bind_address: String,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>, bind_address: String) -> Self {
        Self {
            state,
            bind_address,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let app = self.create_router().layer(TraceLayer::new_for_http());

        let addr = self
            .bind_address
            .parse()
            .map_err(|e| LaunchError::ConfigError(format!("Invalid bind address: {}", e)))?;

        info!(address = %self.bind_address, network = %self.state.network, "Starting API server");

        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await
            .map_err(|e| LaunchError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    pub fn create_router(&self) -> Router {
        router(self.state.clone())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_logo_bytes + FORM_OVERHEAD_BYTES;
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/create-token", post(handlers::create_token))
        .route("/api/setup-liquidity", post(handlers::setup_liquidity))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
