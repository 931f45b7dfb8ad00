use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use pennywise_auth::AuthzError;
use pennywise_core::LedgerError;
use pennywise_infra::StoreError;

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
}

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Rejected(e) => ledger_error_to_response(e),
        StoreError::Persistence(e) => {
            tracing::error!(error = %e, "failed to persist ledger state");
            internal_error()
        }
    }
}

pub fn internal_error() -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
