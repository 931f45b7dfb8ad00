use axum::Router;

pub mod ledger;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    ledger::router()
}
