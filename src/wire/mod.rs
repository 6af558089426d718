//! Data Wire Adapter
//!
//! Converts in-memory entity records into the flat column shape the backend stores,
//! and decodes server rows back.
//!
//! ## Encoding rules (`prepare_data_for_server`)
//!
//! | In-memory value | Wire value |
//! |-----------------|------------|
//! | `null`          | key dropped |
//! | key `id`        | dropped (identity travels in `tempId` / `where`) |
//! | array           | unchanged |
//! | object          | JSON string |
//! | bool            | `1` / `0` |
//! | other scalar    | unchanged |
//!
//! Fields registered in a [`WireSchema`] as [`FieldEncoding::Text`] are coerced to a
//! string whatever their runtime type, for columns the backend stores as text even
//! though the UI edits them as numbers (percentage-like codes, for instance).
//!
//! The server does not describe column types in its responses, so
//! `process_data_from_server` takes the array and boolean field lists explicitly.

pub mod temp_id;

pub use temp_id::{generate_temp_id, is_temp_id, TEMP_ID_PREFIX};

use serde_json::Value;
use std::collections::HashMap;

/// One entity's field map.
pub type Record = serde_json::Map<String, Value>;

/// Per-field override of the default encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldEncoding {
    #[default]
    Auto,
    /// Always send the string form
    Text,
}

/// Field-level encoding overrides for one table.
#[derive(Debug, Clone, Default)]
pub struct WireSchema {
    overrides: HashMap<String, FieldEncoding>,
}

impl WireSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.overrides.insert(field.into(), FieldEncoding::Text);
        self
    }

    pub fn set_encoding(&mut self, field: impl Into<String>, encoding: FieldEncoding) {
        self.overrides.insert(field.into(), encoding);
    }

    pub fn encoding(&self, field: &str) -> FieldEncoding {
        self.overrides.get(field).copied().unwrap_or_default()
    }
}

/// Encode an entity for the `data` map of a batch operation.
pub fn prepare_data_for_server(entity: &Record, schema: &WireSchema) -> Record {
    let mut wire = Record::new();

    for (key, value) in entity {
        if key == "id" || value.is_null() {
            continue;
        }

        let encoded = match schema.encoding(key) {
            FieldEncoding::Text => Value::String(text_form(value)),
            FieldEncoding::Auto => encode_value(value),
        };
        wire.insert(key.clone(), encoded);
    }

    wire
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::from(i64::from(*b)),
        Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decode a server row.
///
/// Only keys present in `record` are touched. Array fields accept a native array or a
/// JSON-encoded string; anything unparsable or `null` becomes an empty array. Boolean
/// fields treat `1`, `"1"`, `true` and `"true"` as true and everything else as false.
pub fn process_data_from_server(
    record: &Record,
    array_fields: &[&str],
    bool_fields: &[&str],
) -> Record {
    let mut decoded = record.clone();

    for field in array_fields {
        if let Some(value) = decoded.get_mut(*field) {
            *value = Value::Array(decode_array(value));
        }
    }

    for field in bool_fields {
        if let Some(value) = decoded.get_mut(*field) {
            *value = Value::Bool(decode_bool(value));
        }
    }

    decoded
}

fn decode_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn decode_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s == "1" || s == "true",
        _ => false,
    }
}

/// Server-assigned id of a record: an integer (or numeric string) greater than zero.
///
/// Drafts carry no id or a non-positive placeholder until the server creates them.
pub fn persisted_id(record: &Record) -> Option<i64> {
    let id = match record.get("id")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}
