//! Account lifecycle routes.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::{AccountNumber, types::UserId};
use validator::Validate;

use crate::{
    AppState,
    error::ApiError,
    extractors::{ValidatedJson, ValidatedQuery},
};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/account", get(list_accounts))
        .route("/account/create", post(create_account))
        .route("/account/delete", post(delete_account))
}

/// Request body for opening an account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Owning user.
    #[validate(range(min = 1, message = "userId must be at least 1"))]
    pub user_id: i64,
    /// Opening balance.
    #[validate(range(min = 100, message = "initialBalance must be at least 100"))]
    pub initial_balance: i64,
}

/// Response for an opened account.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    /// Owning user.
    pub user_id: UserId,
    /// Assigned account number.
    pub account_number: AccountNumber,
    /// Opening time.
    pub registered_at: DateTime<Utc>,
}

/// Request body for closing an account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    /// Owning user.
    #[validate(range(min = 1, message = "userId must be at least 1"))]
    pub user_id: i64,
    /// Account to close.
    #[validate(length(equal = 10, message = "accountNumber must be 10 characters"))]
    pub account_number: String,
}

/// Response for a closed account.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountResponse {
    /// Owning user.
    pub user_id: UserId,
    /// Closed account number.
    pub account_number: AccountNumber,
    /// Closing time.
    #[serde(rename = "unRegisteredAt")]
    pub unregistered_at: Option<DateTime<Utc>>,
}

/// Query parameters for listing a user's accounts.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListAccountsQuery {
    /// Owning user.
    #[validate(range(min = 1, message = "userId must be at least 1"))]
    pub user_id: i64,
}

/// One listed account.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalanceResponse {
    /// Account number.
    pub account_number: AccountNumber,
    /// Current balance.
    pub balance: i64,
}

/// Parses a length-checked account number from a request.
pub(crate) fn parse_account_number(raw: &str) -> Result<AccountNumber, ApiError> {
    AccountNumber::parse(raw).map_err(|err| ApiError::invalid_field("accountNumber", err.to_string()))
}

/// POST `/account/create` - Open an account.
async fn create_account(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateAccountRequest>,
) -> Result<Json<CreateAccountResponse>, ApiError> {
    let account = state
        .accounts
        .create_account(UserId::new(payload.user_id), payload.initial_balance)
        .await?;

    Ok(Json(CreateAccountResponse {
        user_id: account.user_id,
        account_number: account.account_number,
        registered_at: account.registered_at,
    }))
}

/// POST `/account/delete` - Close an empty account.
async fn delete_account(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<DeleteAccountRequest>,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    let account_number = parse_account_number(&payload.account_number)?;
    let account = state
        .accounts
        .delete_account(UserId::new(payload.user_id), &account_number)
        .await?;

    Ok(Json(DeleteAccountResponse {
        user_id: account.user_id,
        account_number: account.account_number,
        unregistered_at: account.unregistered_at,
    }))
}

/// GET `/account?userId=` - List a user's accounts with balances.
async fn list_accounts(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListAccountsQuery>,
) -> Result<Json<Vec<AccountBalanceResponse>>, ApiError> {
    let accounts = state
        .accounts
        .find_accounts_by_user(UserId::new(query.user_id))
        .await?;

    Ok(Json(
        accounts
            .into_iter()
            .map(|a| AccountBalanceResponse {
                account_number: a.account_number,
                balance: a.balance,
            })
            .collect(),
    ))
}
