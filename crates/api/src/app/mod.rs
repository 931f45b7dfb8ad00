//! HTTP API application wiring (Axum router + middleware).
//!
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and body parsing
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::context::AppContext;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(ctx: Arc<AppContext>) -> Router {
    // Ledger routes: require an allowlisted credential.
    let protected = routes::router()
        .layer(Extension(Arc::clone(&ctx)))
        .layer(axum::middleware::from_fn_with_state(
            ctx,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::cors_middleware)))
}
