use axum::http::StatusCode;

/// Liveness probe. Not gated; carries no ledger data.
pub async fn health() -> StatusCode {
    StatusCode::OK
}
