use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RequestKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    PayloadTooLarge,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failure to obtain or parse the spreadsheet. Rendered as a banner; the table is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    #[error("invalid sheet url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("sheet url '{url}' does not contain a /d/<id> segment")]
    MissingSheetId { url: String },
    #[error("sheet request timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("sheet source unreachable: {0}")]
    Unreachable(String),
    #[error("sheet source returned HTTP {status}")]
    Status { status: u16 },
    #[error("malformed sheet data: {0}")]
    Malformed(String),
}

/// Failure of an outbound webhook call. Converted into an `Error: ...` history entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed webhook response: {0}")]
    MalformedResponse(String),
    #[error("webhook response is missing the `response` field")]
    MissingResponse,
}

/// Table input that cannot back every UI element; dependent elements are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderInputError {
    #[error("missing expected column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("{} request is empty", .0.label())]
    EmptyPayload(RequestKind),
    #[error("a {} request is still being processed", .pending.label())]
    Locked { pending: RequestKind },
}
