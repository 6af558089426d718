//! Plain-text rendering and derived views of [`SaveErrorData`].
//!
//! The report is shown on screen and copied into bug reports, so identical input must
//! produce identical text: nothing here reads the clock or iterates a hash map.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::{FailedOperation, RequestInfo, SaveErrorData, ValidationError};

const RULE: &str = "----------------------------------------";

/// Render a failure for display and copy-paste.
///
/// An explicit `request_info` takes precedence over the one embedded in `error_data`.
pub fn generate_error_report(
    error_data: &SaveErrorData,
    request_info: Option<&RequestInfo>,
) -> String {
    let mut out = String::new();
    out.push_str("BATCH SAVE ERROR REPORT\n");
    out.push_str(RULE);
    out.push('\n');

    if let Some(info) = request_info.or(error_data.request_info.as_ref()) {
        out.push_str("\nREQUEST\n");
        out.push_str(&format!("Timestamp: {}\n", info.timestamp));
        out.push_str(&format!("URL: {}\n", info.url));
        out.push_str(&format!("Method: {}\n", info.method));
        out.push_str("Body:\n");
        out.push_str(&pretty_body(&info.body));
        out.push('\n');
    }

    out.push_str(&format!("\nFAILED OPERATIONS ({})\n", error_data.failed.len()));
    for (idx, failed) in error_data.failed.iter().enumerate() {
        out.push('\n');
        render_operation(&mut out, idx + 1, failed);
    }

    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "Summary: {} failed operation(s), {} validation error(s)",
        error_data.failed.len(),
        error_data.validation_error_count()
    ));
    if let Some(successful) = &error_data.successful {
        out.push_str(&format!(", {} successful operation(s)", successful.len()));
    }
    out.push('\n');
    out
}

fn render_operation(out: &mut String, number: usize, failed: &FailedOperation) {
    out.push_str(&format!(
        "#{number} {} {}\n",
        failed.operation.to_uppercase(),
        failed.table
    ));
    out.push_str(&format!("  Temp ID: {}\n", failed.temp_id));
    out.push_str(&format!("  Execution order: {}\n", failed.execution_order));
    if has_meaningful_error(failed) {
        out.push_str(&format!("  Error: {}\n", failed.error));
    }
    for validation in &failed.validation_errors {
        render_validation(out, validation);
    }
}

/// The top-level error is noise when it only repeats the single validation message.
fn has_meaningful_error(failed: &FailedOperation) -> bool {
    if failed.error.trim().is_empty() {
        return false;
    }
    match failed.validation_errors.as_slice() {
        [only] => only.message != failed.error && only.error != failed.error,
        _ => true,
    }
}

fn render_validation(out: &mut String, validation: &ValidationError) {
    let field = if validation.field.is_empty() {
        "(unknown field)"
    } else {
        validation.field.as_str()
    };
    out.push_str(&format!("  - Field: {field}\n"));
    out.push_str(&format!("    Kind: {}\n", validation.error));
    out.push_str(&format!("    Message: {}\n", validation.message));
    if let Some(expected) = &validation.expected {
        out.push_str(&format!("    Expected: {}\n", display_value(expected)));
    }
    if let Some(received) = &validation.received {
        out.push_str(&format!("    Received: {}\n", display_value(received)));
    }
    if let Some(value) = &validation.value {
        out.push_str(&format!("    Value: {}\n", display_value(value)));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| body.to_string())
}

/// Failed operations keyed by table.
pub fn group_errors_by_table(error_data: &SaveErrorData) -> BTreeMap<String, Vec<&FailedOperation>> {
    let mut groups: BTreeMap<String, Vec<&FailedOperation>> = BTreeMap::new();
    for failed in &error_data.failed {
        groups.entry(failed.table.clone()).or_default().push(failed);
    }
    groups
}

/// Every field named by a validation error, deduplicated.
pub fn get_error_fields(error_data: &SaveErrorData) -> BTreeSet<String> {
    error_data
        .failed
        .iter()
        .flat_map(|f| &f.validation_errors)
        .filter(|v| !v.field.is_empty())
        .map(|v| v.field.clone())
        .collect()
}

/// One line for a toast: count plus the first few field messages.
pub fn summarize_errors(error_data: &SaveErrorData) -> String {
    const SHOWN: usize = 3;

    let messages: Vec<String> = error_data
        .failed
        .iter()
        .flat_map(|f| {
            f.validation_errors
                .iter()
                .map(move |v| format!("{}.{}: {}", f.table, v.field, v.message))
        })
        .collect();

    let mut summary = format!("{} operation(s) failed", error_data.failed.len());
    if messages.is_empty() {
        if let Some(first) = error_data.failed.first() {
            summary.push_str(&format!(": {}", first.error));
        }
        return summary;
    }

    summary.push_str(": ");
    summary.push_str(&messages.iter().take(SHOWN).cloned().collect::<Vec<_>>().join("; "));
    if messages.len() > SHOWN {
        summary.push_str(&format!(" (+{} more)", messages.len() - SHOWN));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SaveErrorData {
        SaveErrorData {
            failed: vec![
                FailedOperation {
                    error: "Validation failed".to_string(),
                    execution_order: 1,
                    operation: "create".to_string(),
                    table: "counterparties".to_string(),
                    temp_id: "temp_main_1".to_string(),
                    validation_errors: vec![
                        ValidationError {
                            field: "inn".to_string(),
                            error: "INVALID_TYPE".to_string(),
                            message: "must be text".to_string(),
                            expected: Some(json!("string")),
                            received: Some(json!("number")),
                            value: Some(json!(7707083893_i64)),
                        },
                        ValidationError::new("name", "REQUIRED", "name is required"),
                    ],
                },
                FailedOperation {
                    error: "bik is required".to_string(),
                    execution_order: 2,
                    operation: "create".to_string(),
                    table: "counterparty_banks".to_string(),
                    temp_id: "temp_rel_2".to_string(),
                    validation_errors: vec![ValidationError::new(
                        "bik",
                        "REQUIRED",
                        "bik is required",
                    )],
                },
                FailedOperation {
                    error: String::new(),
                    execution_order: 3,
                    operation: "update".to_string(),
                    table: "counterparty_banks".to_string(),
                    temp_id: "temp_rel_3".to_string(),
                    validation_errors: vec![ValidationError::new("name", "REQUIRED", "x")],
                },
            ],
            successful: None,
            request_info: Some(RequestInfo {
                url: "http://api.test/api/data/batch".to_string(),
                method: "POST".to_string(),
                body: "{\"operations\":[]}".to_string(),
                timestamp: "2026-01-01T00:00:00+00:00".to_string(),
            }),
        }
    }

    #[test]
    fn test_report_is_deterministic() {
        let data = sample();
        assert_eq!(
            generate_error_report(&data, None),
            generate_error_report(&data, None)
        );
    }

    #[test]
    fn test_report_contents() {
        let report = generate_error_report(&sample(), None);
        assert!(report.starts_with("BATCH SAVE ERROR REPORT"));
        assert!(report.contains("URL: http://api.test/api/data/batch"));
        assert!(report.contains("\"operations\": []"));
        assert!(report.contains("#1 CREATE counterparties"));
        assert!(report.contains("  Temp ID: temp_main_1"));
        assert!(report.contains("    Kind: INVALID_TYPE"));
        assert!(report.contains("    Expected: string"));
        assert!(report.contains("    Value: 7707083893"));
        assert!(report.contains("  Error: Validation failed"));
        assert!(report.contains("Summary: 3 failed operation(s), 4 validation error(s)"));
    }

    #[test]
    fn test_report_skips_redundant_error() {
        let report = generate_error_report(&sample(), None);
        assert!(!report.contains("  Error: bik is required"));
        assert!(report.contains("    Message: bik is required"));
    }

    #[test]
    fn test_explicit_request_info_wins() {
        let mut data = sample();
        data.request_info = None;
        let without = generate_error_report(&data, None);
        assert!(!without.contains("REQUEST"));

        let info = RequestInfo {
            url: "http://other".to_string(),
            method: "POST".to_string(),
            body: "not json".to_string(),
            timestamp: "t".to_string(),
        };
        let with = generate_error_report(&sample(), Some(&info));
        assert!(with.contains("URL: http://other"));
        assert!(with.contains("not json"));
    }

    #[test]
    fn test_group_by_table() {
        let data = sample();
        let groups = group_errors_by_table(&data);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["counterparties"].len(), 1);
        assert_eq!(groups["counterparty_banks"].len(), 2);
    }

    #[test]
    fn test_error_fields_deduplicated() {
        let fields = get_error_fields(&sample());
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        assert_eq!(fields, vec!["bik", "inn", "name"]);
    }

    #[test]
    fn test_summary() {
        let summary = summarize_errors(&sample());
        assert!(summary.starts_with("3 operation(s) failed: counterparties.inn: must be text"));
        assert!(summary.ends_with("(+1 more)"));

        let bare = SaveErrorData {
            failed: vec![FailedOperation {
                error: "rejected".to_string(),
                ..FailedOperation::default()
            }],
            ..SaveErrorData::default()
        };
        assert_eq!(summarize_errors(&bare), "1 operation(s) failed: rejected");
    }
}
