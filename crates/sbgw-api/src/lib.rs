//! sbgw-api - HTTP surface of the southbound gateway
//!
//! Routes device get/set calls to the [`Dispatcher`](sbgw_gateway::Dispatcher).
//!
//! # Usage
//!
//! ```ignore
//! use sbgw_api::{create_router, AppState};
//!
//! let state = AppState::new(Dispatcher::new(Arc::new(context)));
//! let router = create_router(state);
//! axum::serve(listener, router).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Canonical device routes
        .route("/devices", get(handlers::devices::list_devices))
        .route(
            "/devices/{name}",
            get(handlers::devices::get_device).post(handlers::devices::set_device),
        )
        // NETCONF-native routes
        .route("/netconf/get/{name}", get(handlers::netconf::get_running))
        .route(
            "/devices/netconf/{name}",
            post(handlers::netconf::edit_config),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
