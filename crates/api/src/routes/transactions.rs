//! Transaction routes.
//!
//! Use and cancel go through the per-account lock; lookups read the store
//! directly.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::ledger::{Transaction, TransactionResult, TransactionType};
use tally_shared::{
    AccountNumber, PageRequest, PageResponse, TransactionToken, types::UserId,
};
use validator::Validate;

use crate::{
    AppState,
    error::ApiError,
    extractors::{ValidatedJson, ValidatedQuery},
    routes::accounts::parse_account_number,
};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transaction/use", post(use_balance))
        .route("/transaction/cancel", post(cancel_balance))
        .route("/transaction/{transaction_id}", get(get_transaction))
        .route(
            "/account/{account_number}/transactions",
            get(list_account_transactions),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for debiting an account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UseBalanceRequest {
    /// Owning user.
    #[validate(range(min = 1, message = "userId must be at least 1"))]
    pub user_id: i64,
    /// Account to debit.
    #[validate(length(equal = 10, message = "accountNumber must be 10 characters"))]
    pub account_number: String,
    /// Amount to debit.
    #[validate(range(
        min = 10,
        max = 1_000_000_000,
        message = "amount must be between 10 and 1000000000"
    ))]
    pub amount: i64,
}

/// Request body for reversing a use.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelBalanceRequest {
    /// Public id of the use to reverse.
    #[validate(length(min = 1, message = "transactionId must not be empty"))]
    pub transaction_id: String,
    /// Account the use was made on.
    #[validate(length(equal = 10, message = "accountNumber must be 10 characters"))]
    pub account_number: String,
    /// Full amount of the original use.
    #[validate(range(min = 1, message = "amount must be at least 1"))]
    pub amount: i64,
}

/// Outcome of a use or cancel.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcomeResponse {
    /// Account the transaction touched.
    pub account_number: AccountNumber,
    /// SUCCESS or FAIL.
    pub transaction_result: TransactionResult,
    /// Public id of the new transaction.
    pub transaction_id: TransactionToken,
    /// Transaction amount.
    pub amount: i64,
    /// When the transaction was recorded.
    pub transacted_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionOutcomeResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            account_number: tx.account_number,
            transaction_result: tx.result,
            transaction_id: tx.transaction_id,
            amount: tx.amount,
            transacted_at: tx.transacted_at,
        }
    }
}

/// A recorded transaction.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Account the transaction touched.
    pub account_number: AccountNumber,
    /// USE or CANCEL.
    pub transaction_type: TransactionType,
    /// SUCCESS or FAIL.
    pub transaction_result: TransactionResult,
    /// Public transaction id.
    pub transaction_id: TransactionToken,
    /// Transaction amount.
    pub amount: i64,
    /// Account balance right after the transaction.
    pub balance_snapshot: i64,
    /// The use this cancel reversed, if any.
    pub canceled_transaction_id: Option<TransactionToken>,
    /// When the transaction was recorded.
    pub transacted_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            account_number: tx.account_number,
            transaction_type: tx.transaction_type,
            transaction_result: tx.result,
            transaction_id: tx.transaction_id,
            amount: tx.amount,
            balance_snapshot: tx.balance_snapshot,
            canceled_transaction_id: tx.canceled_transaction_id,
            transacted_at: tx.transacted_at,
        }
    }
}

/// Query parameters for the account history.
#[derive(Debug, Deserialize, Validate)]
pub struct HistoryQuery {
    /// Page number (1-indexed, default: 1).
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u32>,
    /// Entries per page (default: 20, max: 100).
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

impl HistoryQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/transaction/use` - Debit an account.
async fn use_balance(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UseBalanceRequest>,
) -> Result<Json<TransactionOutcomeResponse>, ApiError> {
    let account_number = parse_account_number(&payload.account_number)?;
    let tx = state
        .guarded
        .use_balance(UserId::new(payload.user_id), &account_number, payload.amount)
        .await?;
    Ok(Json(tx.into()))
}

/// POST `/transaction/cancel` - Reverse a use in full.
async fn cancel_balance(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CancelBalanceRequest>,
) -> Result<Json<TransactionOutcomeResponse>, ApiError> {
    let account_number = parse_account_number(&payload.account_number)?;
    let original = TransactionToken::from_string(payload.transaction_id);
    let tx = state
        .guarded
        .cancel_balance(&original, &account_number, payload.amount)
        .await?;
    Ok(Json(tx.into()))
}

/// GET `/transaction/{transaction_id}` - Look up one transaction.
async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let tx = state
        .transactions
        .find_by_transaction_id(&TransactionToken::from_string(transaction_id))
        .await?;
    Ok(Json(tx.into()))
}

/// GET `/account/{account_number}/transactions` - Account history, newest
/// first.
async fn list_account_transactions(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> Result<Json<PageResponse<TransactionResponse>>, ApiError> {
    let account_number = parse_account_number(&account_number)?;
    let page = state
        .transactions
        .list_account_transactions(&account_number, query.page_request())
        .await?;

    Ok(Json(PageResponse {
        data: page.data.into_iter().map(TransactionResponse::from).collect(),
        meta: page.meta,
    }))
}
