//! HTTP surface for the ledger: thin request/response mapping onto the
//! ledger service. The wire contract mirrors the dashboard backend the
//! UI already speaks: `GET /balance/{account}`, `POST /balance/add`,
//! `POST /balance/subtract`, `GET /transactions/{account}`, plus the
//! promoted server-side `POST /balance/transfer`.

use crate::error::LedgerError;
use crate::models::LedgerTransaction;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error};
use uuid::Uuid;

/// Shared state handed to every handler
pub type ApiState = Arc<AppState>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Store internals stay out of client-visible messages
        let message = match &self {
            LedgerError::Database(_) | LedgerError::Store(_) => {
                error!("store failure: {}", self);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: String,
    pub balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
}

#[derive(Debug, Deserialize)]
pub struct MutateRequest {
    pub account: String,
    pub amount: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub amount: i64,
    pub description: String,
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutateResponse {
    pub success: bool,
    pub balance: i64,
    pub transaction: TransactionSummary,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub success: bool,
    pub amount: i64,
    pub from_balance: i64,
    pub to_balance: i64,
    pub transfer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// GET /balance/{account}
/// Auto-provisions unknown accounts with the seed balance; never 404s.
async fn get_balance(
    State(ctx): State<ApiState>,
    Path(account): Path<String>,
) -> Result<Json<BalanceResponse>, LedgerError> {
    debug!("API /balance/{}", account);

    let acct = ctx.ledger.balance(&account).await?;

    Ok(Json(BalanceResponse {
        account: acct.id,
        balance: acct.balance,
        total_earned: acct.total_earned,
        total_spent: acct.total_spent,
    }))
}

/// POST /balance/add
/// Request body: { "account": "0xABC", "amount": 200, "reason": "...", "source": "..." }
async fn add_balance(
    State(ctx): State<ApiState>,
    Json(request): Json<MutateRequest>,
) -> Result<Json<MutateResponse>, LedgerError> {
    let reason = request.reason.as_deref().unwrap_or("Tokens added");
    let source = request.source.as_deref().unwrap_or("system");

    let account = ctx
        .ledger
        .credit(&request.account, request.amount, reason, source)
        .await?;

    Ok(Json(MutateResponse {
        success: true,
        balance: account.balance,
        transaction: TransactionSummary {
            amount: request.amount,
            description: reason.to_string(),
            source: source.to_string(),
        },
    }))
}

/// POST /balance/subtract
/// 400 with an "Insufficient balance" message when the debit exceeds the
/// spendable balance; the dashboard client substring-matches on it.
async fn subtract_balance(
    State(ctx): State<ApiState>,
    Json(request): Json<MutateRequest>,
) -> Result<Json<MutateResponse>, LedgerError> {
    let reason = request.reason.as_deref().unwrap_or("Tokens spent");
    let source = request.source.as_deref().unwrap_or("system");

    let account = ctx
        .ledger
        .debit(&request.account, request.amount, reason, source)
        .await?;

    Ok(Json(MutateResponse {
        success: true,
        balance: account.balance,
        transaction: TransactionSummary {
            amount: request.amount,
            description: reason.to_string(),
            source: source.to_string(),
        },
    }))
}

/// POST /balance/transfer
/// Server-side atomic transfer: both legs commit in one database
/// transaction, so callers no longer need the subtract-then-add dance.
async fn transfer(
    State(ctx): State<ApiState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, LedgerError> {
    debug!(
        "API /balance/transfer {} -> {} ({})",
        request.from, request.to, request.amount
    );

    let reason = request.reason.as_deref().unwrap_or("Transfer");
    let receipt = ctx
        .ledger
        .transfer(&request.from, &request.to, request.amount, reason)
        .await?;

    Ok(Json(TransferResponse {
        success: true,
        amount: receipt.amount,
        from_balance: receipt.from.balance,
        to_balance: receipt.to.balance,
        transfer_id: receipt.transfer_id,
    }))
}

/// GET /transactions/{account}?limit=50&offset=0
async fn list_transactions(
    State(ctx): State<ApiState>,
    Path(account): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<LedgerTransaction>>, LedgerError> {
    debug!("API /transactions/{}", account);

    let rows = ctx
        .ledger
        .transactions(&account, query.limit, query.offset)
        .await?;

    Ok(Json(rows))
}

/// GET /health
async fn health(State(ctx): State<ApiState>) -> impl IntoResponse {
    match ctx.database.ping().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            error!("health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "database unavailable".to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub fn create_router(ctx: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/balance/:account", get(get_balance))
        .route("/balance/add", post(add_balance))
        .route("/balance/subtract", post(subtract_balance))
        .route("/balance/transfer", post(transfer))
        .route("/transactions/:account", get(list_transactions))
        .route("/health", get(health))
        .with_state(ctx)
        .layer(cors)
}
