//! Batch endpoint request/response types.
//!
//! Mirrors the JSON contract of `POST /api/data/batch`. Field names are camelCase on
//! the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::error::SaveError;
use crate::wire::Record;

/// Sentinel used in [`SaveDependency::depends_on`] to refer to the main entity.
pub const MAIN_ENTITY: &str = "main";

/// Kind of write requested by a [`BatchOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested write inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperation {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub table: String,
    /// Correlation token, unique within one request
    pub temp_id: String,
    /// Wire-encoded field map (never contains `id`)
    pub data: Record,
    /// Key filter, only meaningful for update/delete
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Record>,
}

impl BatchOperation {
    pub fn create(table: impl Into<String>, temp_id: impl Into<String>, data: Record) -> Self {
        BatchOperation {
            op_type: OperationType::Create,
            table: table.into(),
            temp_id: temp_id.into(),
            data,
            where_clause: None,
        }
    }

    pub fn update(
        table: impl Into<String>,
        temp_id: impl Into<String>,
        id: i64,
        data: Record,
    ) -> Self {
        BatchOperation {
            op_type: OperationType::Update,
            table: table.into(),
            temp_id: temp_id.into(),
            data,
            where_clause: Some(id_filter(id)),
        }
    }

    pub fn delete(table: impl Into<String>, temp_id: impl Into<String>, id: i64) -> Self {
        BatchOperation {
            op_type: OperationType::Delete,
            table: table.into(),
            temp_id: temp_id.into(),
            data: Record::new(),
            where_clause: Some(id_filter(id)),
        }
    }
}

fn id_filter(id: i64) -> Record {
    let mut filter = Record::new();
    filter.insert("id".to_string(), Value::from(id));
    filter
}

/// Body of one batch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSaveRequest {
    pub operations: Vec<BatchOperation>,
    pub stop_on_error: bool,
    pub validate_dependencies: bool,
    pub validate_schema: bool,
}

impl BatchSaveRequest {
    pub fn new(operations: Vec<BatchOperation>) -> Self {
        BatchSaveRequest {
            operations,
            stop_on_error: true,
            validate_dependencies: true,
            validate_schema: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Every operation in a request must carry a distinct `tempId`.
    pub fn validate_unique_temp_ids(&self) -> Result<(), SaveError> {
        let mut seen = HashSet::with_capacity(self.operations.len());
        for op in &self.operations {
            if !seen.insert(op.temp_id.as_str()) {
                return Err(SaveError::InvalidRequest {
                    message: format!("duplicate tempId '{}' in batch request", op.temp_id),
                });
            }
        }
        Ok(())
    }

    /// Pretty JSON of the request, as attached to diagnostic reports.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Successful batch envelope.
///
/// Failure envelopes are not deserialized into this type; their shape varies and is
/// handled by [`crate::errors::handle_batch_error`] on the raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSaveResponse {
    pub success: bool,
    /// Single-operation shortcut
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// tempId -> real id
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ids: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchSaveResponse {
    /// Read a success envelope field by field.
    ///
    /// The server has already committed when this runs, so malformed or missing
    /// fields are dropped instead of failing the call: ids that are not integers are
    /// skipped and `ids: null` reads as no ids.
    pub fn from_success_body(body: &Value) -> Self {
        let ids = body
            .get("ids")
            .and_then(Value::as_object)
            .map(|ids| {
                ids.iter()
                    .filter_map(|(temp_id, id)| Some((temp_id.clone(), id.as_i64()?)))
                    .collect()
            })
            .unwrap_or_default();

        BatchSaveResponse {
            success: body.get("success").and_then(Value::as_bool).unwrap_or(false),
            id: body.get("id").and_then(Value::as_i64),
            ids,
            error: body.get("error").and_then(Value::as_str).map(str::to_string),
        }
    }

    /// Real id the server assigned to the operation correlated by `temp_id`.
    pub fn resolved_id(&self, temp_id: &str) -> Option<i64> {
        self.ids.get(temp_id).copied()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, i64>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ordering intent between a related table and its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDependency {
    pub table: String,
    pub depends_on: String,
    /// FK column on the child table
    pub parent_id_field: String,
    pub priority: u32,
}

impl SaveDependency {
    pub fn on_main(table: impl Into<String>, parent_id_field: impl Into<String>) -> Self {
        SaveDependency {
            table: table.into(),
            depends_on: MAIN_ENTITY.to_string(),
            parent_id_field: parent_id_field.into(),
            priority: 1,
        }
    }

    pub fn depends_on_main(&self) -> bool {
        self.depends_on == MAIN_ENTITY
    }
}
