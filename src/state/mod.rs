//! Entity / Related-Entity State Coordinators
//!
//! Hold the editable draft next to the last-saved snapshot, report whether they
//! differ, and feed the draft to the orchestrator on save. Successful saves move the
//! snapshots forward; failures leave the draft untouched so the user can retry.
//!
//! Coordinators are driven from one logical UI thread through `&mut self`.

pub mod related;

pub use related::{RelatedEntityManager, PRIMARY_FIELD};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::orchestrator::{BatchSaveOrchestrator, SaveOptions, SaveOutcome};
use crate::protocol::{BatchTransport, SaveDependency, SaveError};
use crate::wire::{persisted_id, Record};

/// Structural comparison of draft and snapshot.
///
/// `(None, None)` is unchanged; one side missing is a change. Object key order never
/// matters; array order does.
pub fn has_changes<T: PartialEq + ?Sized>(current: Option<&T>, original: Option<&T>) -> bool {
    match (current, original) {
        (None, None) => false,
        (Some(current), Some(original)) => current != original,
        _ => true,
    }
}

/// Local offline cache / sync engine, consumed read-only.
#[async_trait]
pub trait LocalCache: Send + Sync {
    fn is_initialized(&self) -> bool;

    async fn load_table_data(&self, table: &str) -> anyhow::Result<Vec<Record>>;

    async fn sync(&self) -> anyhow::Result<()>;

    /// Snapshot of every table loaded so far.
    fn table_data(&self) -> HashMap<String, Vec<Record>>;
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Local cache is not initialized")]
    CacheNotReady,

    #[error(transparent)]
    Cache(#[from] anyhow::Error),

    #[error("No record with id {id} in '{table}'")]
    NotFound { table: String, id: i64 },

    #[error(transparent)]
    Save(#[from] SaveError),
}

/// Result of [`EntityCoordinator::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Another load was in flight; this one was dropped
    Skipped,
}

/// Draft and snapshot of one main entity.
#[derive(Debug, Clone)]
pub struct EntityCoordinator {
    table: String,
    original: Option<Record>,
    current: Option<Record>,
    loading: bool,
}

impl EntityCoordinator {
    pub fn new(table: impl Into<String>) -> Self {
        EntityCoordinator {
            table: table.into(),
            original: None,
            current: None,
            loading: false,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn current(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    pub fn original(&self) -> Option<&Record> {
        self.original.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_changes(&self) -> bool {
        has_changes(self.current.as_ref(), self.original.as_ref())
    }

    /// Start editing a record that does not exist yet.
    pub fn start_new(&mut self, defaults: Record) {
        self.original = None;
        self.current = Some(defaults);
    }

    pub fn set_field(&mut self, field: impl Into<String>, value: Value) {
        self.current
            .get_or_insert_with(Record::new)
            .insert(field.into(), value);
    }

    /// Drop unsaved edits.
    pub fn reset(&mut self) {
        self.current = self.original.clone();
    }

    /// Mark a load as in flight. Returns false if one already is.
    pub fn begin_load(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Install loaded data as both draft and snapshot and clear the in-flight flag.
    pub fn finish_load(&mut self, record: Record) {
        self.original = Some(record.clone());
        self.current = Some(record);
        self.loading = false;
    }

    pub fn abort_load(&mut self) {
        self.loading = false;
    }

    /// Load the record with `id` from the local cache.
    ///
    /// Returns [`LoadOutcome::Skipped`] when a load was already marked in flight with
    /// [`Self::begin_load`]. `&mut self` is held across the await, so two `load` calls
    /// on one coordinator cannot overlap; the guard only matters for callers that
    /// fetch on their own between `begin_load` and `finish_load`.
    pub async fn load<C: LocalCache + ?Sized>(
        &mut self,
        cache: &C,
        id: i64,
    ) -> Result<LoadOutcome, StateError> {
        if !self.begin_load() {
            tracing::debug!(table = %self.table, id, "load_skipped_in_flight");
            return Ok(LoadOutcome::Skipped);
        }

        let found = self.fetch(cache, id).await;
        match found {
            Ok(record) => {
                self.finish_load(record);
                Ok(LoadOutcome::Loaded)
            }
            Err(e) => {
                self.abort_load();
                Err(e)
            }
        }
    }

    async fn fetch<C: LocalCache + ?Sized>(&self, cache: &C, id: i64) -> Result<Record, StateError> {
        if !cache.is_initialized() {
            return Err(StateError::CacheNotReady);
        }
        cache
            .load_table_data(&self.table)
            .await?
            .into_iter()
            .find(|row| persisted_id(row) == Some(id))
            .ok_or_else(|| StateError::NotFound {
                table: self.table.clone(),
                id,
            })
    }

    /// Save the draft alone.
    pub async fn save<T: BatchTransport>(
        &mut self,
        orchestrator: &BatchSaveOrchestrator<T>,
        options: &SaveOptions,
    ) -> Result<SaveOutcome, SaveError> {
        let Some(current) = self.current.as_ref() else {
            return Ok(SaveOutcome::default());
        };
        let outcome = orchestrator
            .save_entity(current, &self.table, options)
            .await?;
        self.commit(outcome.main_id);
        Ok(outcome)
    }

    /// Save the draft and `related` with the two-step protocol.
    ///
    /// On [`SaveError::PartialSave`] the main snapshot is committed (the server has
    /// it) while `related` keeps its edits for [`Self::retry_related`]. On
    /// [`SaveError::MainSavedWithoutId`] both drafts stay as they were: the row exists
    /// server-side but without its id a second save would create it again, so the
    /// caller has to reload it first.
    pub async fn save_with_related<T: BatchTransport>(
        &mut self,
        related: &mut RelatedEntityManager,
        orchestrator: &BatchSaveOrchestrator<T>,
        related_table: &str,
        dependencies: &[SaveDependency],
        options: &SaveOptions,
    ) -> Result<SaveOutcome, SaveError> {
        let Some(current) = self.current.as_ref() else {
            return Ok(SaveOutcome::default());
        };
        let result = orchestrator
            .save_entity_with_steps(
                current,
                related.entities(),
                &self.table,
                related_table,
                dependencies,
                options,
            )
            .await;

        match result {
            Ok(outcome) => {
                self.commit(outcome.main_id);
                if let Some(main_id) = outcome.main_id {
                    related.commit(&outcome.related_ids, main_id);
                }
                Ok(outcome)
            }
            Err(err) => {
                if let Some(main_id) = err.committed_main_id() {
                    self.commit(Some(main_id));
                    related.set_parent_id(Some(main_id));
                }
                Err(err)
            }
        }
    }

    /// Resend the related rows after a partial save.
    pub async fn retry_related<T: BatchTransport>(
        &mut self,
        related: &mut RelatedEntityManager,
        orchestrator: &BatchSaveOrchestrator<T>,
        related_table: &str,
        dependencies: &[SaveDependency],
        options: &SaveOptions,
    ) -> Result<Vec<Option<i64>>, SaveError> {
        let Some(main_id) = self.current.as_ref().and_then(persisted_id) else {
            return Err(SaveError::InvalidRequest {
                message: format!("{} has not been saved yet", self.table),
            });
        };
        let ids = orchestrator
            .retry_related(main_id, related.entities(), related_table, dependencies, options)
            .await?;
        related.commit(&ids, main_id);
        Ok(ids)
    }

    fn commit(&mut self, main_id: Option<i64>) {
        if let (Some(current), Some(id)) = (self.current.as_mut(), main_id) {
            current.insert("id".to_string(), Value::from(id));
        }
        self.original.clone_from(&self.current);
    }
}
