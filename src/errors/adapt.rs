//! Error Adaptation
//!
//! The batch endpoint reports failures in one of three shapes:
//!
//! ```text
//! 1. { success: false, validationErrors: [ {field, error, message, ...}, ... ] }
//! 2. { success: false, data: { failed: [ FailedOperation, ... ], successful?: [...] } }
//! 3. { success: false, error: "..." }            (or no body detail at all)
//! ```
//!
//! [`ServerFailure::classify`] picks the shape once; everything past this module sees
//! either `SaveError::Validation(SaveErrorData)` or a plain message error.

use serde_json::Value;

use super::{FailedOperation, RequestInfo, SaveErrorData, ValidationError};
use crate::protocol::{BatchSaveRequest, SaveError, TransportResponse, BATCH_METHOD};
use crate::wire::generate_temp_id;

const GENERIC_FAILURE: &str = "Batch save failed";

/// Closed set of failure shapes, checked in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFailure {
    /// Non-empty `validationErrors` at the response root
    RootValidation(Vec<Value>),
    /// Non-empty `data.failed`
    FailedOperations {
        failed: Vec<Value>,
        successful: Option<Vec<Value>>,
    },
    /// Anything else; carries the server's message when there is one
    Plain(Option<String>),
}

impl ServerFailure {
    pub fn classify(response: &Value) -> Self {
        if let Some(entries) = non_empty_array(response.get("validationErrors")) {
            return ServerFailure::RootValidation(entries.clone());
        }

        let data = response.get("data");
        if let Some(failed) = non_empty_array(data.and_then(|d| d.get("failed"))) {
            let successful = data
                .and_then(|d| d.get("successful"))
                .and_then(Value::as_array)
                .cloned();
            return ServerFailure::FailedOperations {
                failed: failed.clone(),
                successful,
            };
        }

        ServerFailure::Plain(error_message(response))
    }
}

fn non_empty_array(value: Option<&Value>) -> Option<&Vec<Value>> {
    value
        .and_then(Value::as_array)
        .filter(|entries| !entries.is_empty())
}

/// `error` as a string, `error.message`, or a root `message`.
fn error_message(response: &Value) -> Option<String> {
    match response.get("error") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Object(obj)) => {
            if let Some(Value::String(s)) = obj.get("message") {
                return Some(s.clone());
            }
        }
        _ => {}
    }
    response
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Normalize a failed batch response.
///
/// Validation shapes come back as [`SaveError::Validation`] with `requestInfo`
/// attached; everything else as [`SaveError::Server`].
pub fn handle_batch_error(
    response: &Value,
    table: &str,
    original_request: &BatchSaveRequest,
    url: &str,
) -> SaveError {
    let data = match ServerFailure::classify(response) {
        ServerFailure::RootValidation(entries) => SaveErrorData {
            failed: entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| wrap_validation_entry(idx, entry, table))
                .collect(),
            successful: None,
            request_info: Some(request_info(original_request, url)),
        },
        ServerFailure::FailedOperations { failed, successful } => SaveErrorData {
            failed: failed
                .iter()
                .enumerate()
                .map(|(idx, entry)| decode_failed_entry(idx, entry, table))
                .collect(),
            successful,
            request_info: Some(request_info(original_request, url)),
        },
        ServerFailure::Plain(message) => {
            let message = message.unwrap_or_else(|| GENERIC_FAILURE.to_string());
            tracing::warn!(table, error = %message, "batch_save_failed");
            return SaveError::Server { message };
        }
    };

    tracing::warn!(
        table,
        failed = data.failed.len(),
        validation_errors = data.validation_error_count(),
        "batch_save_rejected"
    );
    SaveError::Validation(data)
}

/// Like [`handle_batch_error`], but a non-2xx reply with no usable detail is reported
/// as a transport failure.
pub fn adapt_failure(
    response: &TransportResponse,
    table: &str,
    original_request: &BatchSaveRequest,
    url: &str,
) -> SaveError {
    let plain_without_detail = matches!(
        ServerFailure::classify(&response.body),
        ServerFailure::Plain(None)
    );
    if !response.is_success_status() && plain_without_detail {
        tracing::warn!(table, status = response.status, "batch_transport_failed");
        return SaveError::Transport {
            message: format!("Server returned HTTP {}", response.status),
        };
    }
    handle_batch_error(&response.body, table, original_request, url)
}

fn wrap_validation_entry(idx: usize, entry: &Value, table: &str) -> FailedOperation {
    let validation = ValidationError::from_json(entry);
    FailedOperation {
        error: if validation.message.is_empty() {
            validation.error.clone()
        } else {
            validation.message.clone()
        },
        execution_order: execution_order(idx),
        operation: string_field(entry, "operation").unwrap_or_else(|| "unknown".to_string()),
        table: string_field(entry, "table").unwrap_or_else(|| table.to_string()),
        temp_id: string_field(entry, "tempId").unwrap_or_else(|| generate_temp_id("error")),
        validation_errors: vec![validation],
    }
}

fn decode_failed_entry(idx: usize, entry: &Value, table: &str) -> FailedOperation {
    serde_json::from_value(entry.clone()).unwrap_or_else(|_| FailedOperation {
        error: entry.to_string(),
        execution_order: execution_order(idx),
        operation: "unknown".to_string(),
        table: table.to_string(),
        temp_id: generate_temp_id("error"),
        validation_errors: Vec::new(),
    })
}

fn execution_order(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}

fn string_field(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn request_info(request: &BatchSaveRequest, url: &str) -> RequestInfo {
    RequestInfo {
        url: url.to_string(),
        method: BATCH_METHOD.to_string(),
        body: request.to_pretty_json(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}
