//! Operation builders for the save paths.
//!
//! Pure functions: they turn records into [`BatchOperation`]s and never touch the
//! network. The orchestrator decides which of them go into which call.

use serde_json::Value;

use super::SaveOptions;
use crate::protocol::{BatchOperation, SaveDependency, SaveError, SaveResult};
use crate::wire::{generate_temp_id, persisted_id, prepare_data_for_server, Record, WireSchema};

/// How a related row points at its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentRef {
    /// Parent already exists server-side
    Id(i64),
    /// Parent is created in the same request
    TempId(String),
}

impl ParentRef {
    fn to_value(&self) -> Value {
        match self {
            ParentRef::Id(id) => Value::from(*id),
            ParentRef::TempId(temp_id) => Value::String(temp_id.clone()),
        }
    }
}

/// `update` for a persisted entity, `create` otherwise.
pub fn main_operation(
    entity: &Record,
    table: &str,
    temp_id: &str,
    schema: &WireSchema,
) -> BatchOperation {
    let data = prepare_data_for_server(entity, schema);
    match persisted_id(entity) {
        Some(id) => BatchOperation::update(table, temp_id, id, data),
        None => BatchOperation::create(table, temp_id, data),
    }
}

/// Related operations for the single-request path: existing rows are updated, new
/// rows created, each linked to `parent` through `parent_id_field`.
pub fn related_operations(
    related: &[Record],
    table: &str,
    parent: &ParentRef,
    parent_id_field: &str,
    schema: &WireSchema,
) -> Vec<BatchOperation> {
    related
        .iter()
        .map(|entity| {
            let mut data = prepare_data_for_server(entity, schema);
            data.insert(parent_id_field.to_string(), parent.to_value());
            let temp_id = generate_temp_id("related");
            match persisted_id(entity) {
                Some(id) => BatchOperation::update(table, temp_id, id, data),
                None => BatchOperation::create(table, temp_id, data),
            }
        })
        .collect()
}

/// Related operations for the second call of the two-step path.
///
/// Always `create`; the parent link is the id resolved in step one and the joined
/// parent's display columns are removed so `data` only holds child-table columns.
pub fn dependent_create_operations(
    related: &[Record],
    table: &str,
    parent_id: i64,
    parent_id_field: &str,
    options: &SaveOptions,
) -> Vec<BatchOperation> {
    related
        .iter()
        .map(|entity| {
            let mut own_columns = entity.clone();
            for field in &options.display_fields {
                own_columns.remove(field);
            }
            let mut data = prepare_data_for_server(&own_columns, &options.related_schema);
            data.insert(parent_id_field.to_string(), Value::from(parent_id));
            BatchOperation::create(table, generate_temp_id("related"), data)
        })
        .collect()
}

/// FK column linking `related_table` rows to the main entity.
///
/// A dependency on the main entity declared for the table wins (lowest `priority`
/// first); otherwise the option's field is used.
pub fn parent_id_field(
    dependencies: &[SaveDependency],
    related_table: &str,
    options: &SaveOptions,
) -> SaveResult<String> {
    dependencies
        .iter()
        .filter(|d| d.table == related_table && d.depends_on_main())
        .min_by_key(|d| d.priority)
        .map(|d| d.parent_id_field.clone())
        .or_else(|| options.parent_id_field.clone())
        .ok_or_else(|| SaveError::InvalidRequest {
            message: format!("no parent id field declared for related table '{related_table}'"),
        })
}
