//! Related-entity list editing.
//!
//! Rows added in the UI get a negative temp id so they can be edited, removed or made
//! primary before the server assigns a real one; `persisted_id` treats them as new.

use serde_json::Value;

use super::has_changes;
use crate::wire::Record;

/// Flag kept exclusive by [`RelatedEntityManager::set_primary`].
pub const PRIMARY_FIELD: &str = "is_primary";

#[derive(Debug, Clone)]
pub struct RelatedEntityManager {
    parent_id_field: String,
    parent_id: Option<i64>,
    defaults: Record,
    original: Vec<Record>,
    entities: Vec<Record>,
    next_temp_id: i64,
}

impl RelatedEntityManager {
    pub fn new(parent_id_field: impl Into<String>) -> Self {
        RelatedEntityManager {
            parent_id_field: parent_id_field.into(),
            parent_id: None,
            defaults: Record::new(),
            original: Vec::new(),
            entities: Vec::new(),
            next_temp_id: -1,
        }
    }

    /// Values injected into every added row.
    pub fn with_defaults(mut self, defaults: Record) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn parent_id_field(&self) -> &str {
        &self.parent_id_field
    }

    pub fn set_parent_id(&mut self, parent_id: Option<i64>) {
        self.parent_id = parent_id;
    }

    /// Replace both snapshots with rows loaded from the cache.
    pub fn load(&mut self, rows: Vec<Record>) {
        self.original = rows.clone();
        self.entities = rows;
    }

    pub fn entities(&self) -> &[Record] {
        &self.entities
    }

    pub fn original(&self) -> &[Record] {
        &self.original
    }

    pub fn has_changes(&self) -> bool {
        has_changes(Some(&self.entities), Some(&self.original))
    }

    /// Append a row and return its temp id.
    pub fn add(&mut self, fields: Record) -> i64 {
        let id = self.next_temp_id;
        self.next_temp_id -= 1;

        let mut row = self.defaults.clone();
        row.extend(fields);
        row.insert(
            self.parent_id_field.clone(),
            self.parent_id.map_or(Value::Null, Value::from),
        );
        row.insert("id".to_string(), Value::from(id));
        self.entities.push(row);
        id
    }

    /// Merge `changes` into the row with `id`. Returns false when no such row exists.
    pub fn update(&mut self, id: i64, changes: Record) -> bool {
        match self.entities.iter_mut().find(|row| row_id(row) == Some(id)) {
            Some(row) => {
                for (key, value) in changes {
                    if key != "id" {
                        row.insert(key, value);
                    }
                }
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.entities.len();
        self.entities.retain(|row| row_id(row) != Some(id));
        self.entities.len() != before
    }

    /// Make `id` the only primary row. Unknown ids leave the list untouched.
    pub fn set_primary(&mut self, id: i64) -> bool {
        if !self.entities.iter().any(|row| row_id(row) == Some(id)) {
            return false;
        }
        for row in &mut self.entities {
            let primary = row_id(row) == Some(id);
            row.insert(PRIMARY_FIELD.to_string(), Value::Bool(primary));
        }
        true
    }

    pub fn primary(&self) -> Option<&Record> {
        self.get_by_field(PRIMARY_FIELD, &Value::Bool(true))
    }

    pub fn get_by_field(&self, field: &str, value: &Value) -> Option<&Record> {
        self.entities.iter().find(|row| row.get(field) == Some(value))
    }

    pub fn filter_by_field(&self, field: &str, value: &Value) -> Vec<&Record> {
        self.entities
            .iter()
            .filter(|row| row.get(field) == Some(value))
            .collect()
    }

    /// Discard in-progress edits.
    pub fn reset_entities(&mut self) {
        self.entities = self.original.clone();
    }

    /// Accept the current list as saved: assign the ids the server resolved (in list
    /// order), point every row at `parent_id`, and make it the new original.
    pub fn commit(&mut self, resolved_ids: &[Option<i64>], parent_id: i64) {
        self.parent_id = Some(parent_id);
        for (row, resolved) in self.entities.iter_mut().zip(resolved_ids) {
            if let Some(id) = resolved {
                row.insert("id".to_string(), Value::from(*id));
            }
            row.insert(self.parent_id_field.clone(), Value::from(parent_id));
        }
        self.original = self.entities.clone();
    }
}

fn row_id(row: &Record) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}
