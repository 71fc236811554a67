//! Error responses.
//!
//! Every failure leaves the API as
//! `{ "error": <code>, "message": <text>, "reasons": { <field>: <text> } }`.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::ledger::LedgerError;
use tracing::{debug, error};
use validator::ValidationErrors;

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// The core rejected the operation.
    Ledger(LedgerError),
    /// One or more request fields are invalid.
    Validation(BTreeMap<String, String>),
    /// The request body or query string could not be decoded.
    Malformed {
        /// Status chosen by the rejecting extractor.
        status: StatusCode,
        /// Reason reported by the extractor.
        message: String,
    },
}

impl ApiError {
    /// A single invalid field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(BTreeMap::from([(field.to_string(), message.into())]))
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let reasons = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let message = errors.first().map_or_else(
                    || "invalid value".to_string(),
                    |err| {
                        err.message
                            .as_ref()
                            .map_or_else(|| err.code.to_string(), ToString::to_string)
                    },
                );
                (camel_case(&field), message)
            })
            .collect();
        Self::Validation(reasons)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, reasons) = match self {
            Self::Ledger(err) => {
                let status = StatusCode::from_u16(err.http_status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    error!(error = %err, code = err.error_code(), "request failed");
                } else {
                    debug!(error = %err, code = err.error_code(), "request rejected");
                }
                let message = err.to_string();
                let reasons = BTreeMap::from([(err.field().to_string(), message.clone())]);
                (status, err.error_code(), message, reasons)
            }
            Self::Validation(reasons) => {
                debug!(?reasons, "request validation failed");
                (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "Invalid request".to_string(),
                    reasons,
                )
            }
            Self::Malformed { status, message } => {
                debug!(%status, %message, "malformed request");
                let reasons = BTreeMap::from([("request".to_string(), message.clone())]);
                (status, "MALFORMED_REQUEST", message, reasons)
            }
        };

        (
            status,
            Json(json!({
                "error": code,
                "message": message,
                "reasons": reasons
            })),
        )
            .into_response()
    }
}

/// `initial_balance` -> `initialBalance`; already camel-cased names pass
/// through unchanged.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
