//! Ledger operations: read, set-absolute, spend-delta, set-budget.
//!
//! Each mutating handler parses its body, then hands the mutation to a blocking
//! task that runs the store's validate/persist/commit section and writes the audit
//! line once the ledger lock has been released.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use pennywise_auth::Identity;
use pennywise_core::{LedgerState, Mutation};
use pennywise_infra::StoreError;

use crate::app::{dto, errors};
use crate::context::AppContext;

pub fn router() -> Router {
    Router::new()
        .route("/get", get(get_ledger))
        .route("/set", post(set_balance))
        .route("/spend", post(spend))
        .route("/set_budget", post(set_budget))
}

pub async fn get_ledger(Extension(ctx): Extension<Arc<AppContext>>) -> Response {
    match tokio::task::spawn_blocking(move || ctx.ledger.snapshot()).await {
        Ok(state) => (StatusCode::OK, Json(dto::LedgerView::from(state))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ledger read task failed");
            errors::internal_error()
        }
    }
}

pub async fn set_balance(
    Extension(ctx): Extension<Arc<AppContext>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Response {
    let req: dto::AmountRequest = match dto::parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mutation = Mutation::Set {
        amount: req.amount.unwrap_or_default(),
    };
    match commit(ctx, identity, mutation).await {
        Ok(state) => (StatusCode::OK, state.balance.to_string()).into_response(),
        Err(resp) => resp,
    }
}

pub async fn spend(
    Extension(ctx): Extension<Arc<AppContext>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Response {
    let req: dto::AmountRequest = match dto::parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mutation = Mutation::Spend {
        amount: req.amount.unwrap_or_default(),
    };
    match commit(ctx, identity, mutation).await {
        Ok(state) => (StatusCode::OK, state.balance.to_string()).into_response(),
        Err(resp) => resp,
    }
}

pub async fn set_budget(
    Extension(ctx): Extension<Arc<AppContext>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Response {
    let req: dto::SetBudgetRequest = match dto::parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mutation = Mutation::SetBudget {
        budget: req.budget.unwrap_or_default(),
    };
    match commit(ctx, identity, mutation).await {
        Ok(state) => (StatusCode::OK, Json(dto::LedgerView::from(state))).into_response(),
        Err(resp) => resp,
    }
}

/// Apply `mutation` and journal it. Rejected or unpersisted mutations are not
/// journaled.
async fn commit(
    ctx: Arc<AppContext>,
    identity: Identity,
    mutation: Mutation,
) -> Result<LedgerState, Response> {
    let task = tokio::task::spawn_blocking(move || {
        let next = ctx.ledger.apply(mutation)?;
        ctx.record_transaction(&identity, mutation);
        Ok::<_, StoreError>(next)
    });

    match task.await {
        Ok(result) => result.map_err(errors::store_error_to_response),
        Err(e) => {
            tracing::error!(error = %e, "ledger task failed");
            Err(errors::internal_error())
        }
    }
}
