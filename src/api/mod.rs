//! REST API over the live device registry.
//!
//! Device endpoints:
//! - `GET /devices`, `POST /devices`, `GET /devices/{id}`, `GET /devices/{id}/export`
//!
//! Aggregates and realtime feeds:
//! - `GET /analytics`, `GET /realtime/devices`, `GET /realtime/analytics`,
//!   `GET /realtime/device/{id}`, `GET /v1/analytics` (API key)
//!
//! Misc: `POST /assistant/chat`, `GET /health`.

/// Handler errors and their JSON rendering.
pub mod error;
mod handlers;
/// Request and response bodies.
pub mod types;

use std::any::Any;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use log::info;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::registry::DeviceRegistry;
use crate::sim::types::TickSummary;

pub use error::ApiError;
pub use types::ApiResponse;

/// State shared by all request handlers.
pub struct AppState {
    /// Live device records, mutated by the simulator and `POST /devices`.
    pub registry: Arc<DeviceRegistry>,
    /// Bearer token for `/v1/analytics`; `None` locks that route.
    pub api_key: Option<String>,
    /// Latest simulator tick, for `/health`.
    pub ticks: watch::Receiver<TickSummary>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/devices",
            get(handlers::list_devices).post(handlers::device_action),
        )
        .route("/devices/{id}", get(handlers::device_detail))
        .route("/devices/{id}/export", get(handlers::export_readings))
        .route("/analytics", get(handlers::analytics))
        .route("/realtime/devices", get(handlers::realtime_devices))
        .route("/realtime/analytics", get(handlers::realtime_analytics))
        .route("/realtime/device/{id}", get(handlers::realtime_device))
        .route("/assistant/chat", post(handlers::chat))
        .route("/v1/analytics", get(handlers::v1_analytics))
        .route("/health", get(handlers::health))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Internal("Internal server error".to_string()).into_response()
}

/// Binds to `addr` and serves the API until `shutdown` resolves.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
