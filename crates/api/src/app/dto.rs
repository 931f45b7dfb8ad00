use axum::http::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use pennywise_core::LedgerState;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

// Absent and `null` fields decode as zero.

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    #[serde(default)]
    pub amount: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SetBudgetRequest {
    #[serde(default)]
    pub budget: Option<i32>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerView {
    pub balance: i32,
    pub budget: i32,
}

impl From<LedgerState> for LedgerView {
    fn from(state: LedgerState) -> Self {
        Self {
            balance: state.balance,
            budget: state.budget,
        }
    }
}

/// Decode a JSON body regardless of `Content-Type`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, axum::response::Response> {
    serde_json::from_slice(body)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string()))
}
