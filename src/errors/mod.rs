//! Canonical save-failure representation.
//!
//! Whatever shape the server used to reject a batch, the adaptation layer turns it into
//! one [`SaveErrorData`] envelope; the reporting helpers render and slice it for the UI.
//!
//! - `adapt` - response classification and normalization
//! - `report` - plain-text report, grouping and summary views

pub mod adapt;
pub mod report;

pub use adapt::{adapt_failure, handle_batch_error, ServerFailure};
pub use report::{generate_error_report, get_error_fields, group_errors_by_table, summarize_errors};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One field-level rejection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationError {
    pub field: String,
    /// Taxonomy code: FIELD_NOT_FOUND, INVALID_TYPE, REQUIRED, ...
    #[serde(alias = "code")]
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        error: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationError {
            field: field.into(),
            error: error.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Lenient decoding of a server entry; a bare string becomes the message.
    pub fn from_json(entry: &Value) -> Self {
        match entry {
            Value::String(message) => ValidationError::new("", "UNKNOWN", message.clone()),
            other => serde_json::from_value(other.clone())
                .unwrap_or_else(|_| ValidationError::new("", "UNKNOWN", other.to_string())),
        }
    }
}

/// One operation the server rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FailedOperation {
    pub error: String,
    pub execution_order: u32,
    pub operation: String,
    pub table: String,
    pub temp_id: String,
    pub validation_errors: Vec<ValidationError>,
}

/// Request details attached to a failure so its report is self-contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    pub url: String,
    pub method: String,
    /// Pretty-printed JSON of the original request
    pub body: String,
    /// RFC 3339
    pub timestamp: String,
}

/// UI-facing error envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveErrorData {
    pub failed: Vec<FailedOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_info: Option<RequestInfo>,
}

impl SaveErrorData {
    pub fn validation_error_count(&self) -> usize {
        self.failed.iter().map(|f| f.validation_errors.len()).sum()
    }
}
