//! Batch Save Orchestrator
//!
//! Turns an edited main entity plus its related rows into batch calls.
//!
//! ## Save paths
//!
//! ```text
//! save_entity_with_related   one call:   [main, related...]   related -> main via id or tempId
//! save_entity_with_steps     two calls:  [main]  -> ids[mainTempId] ->  [related creates]
//! ```
//!
//! The two-step path exists because the child's foreign key is unknown until the
//! parent row exists. Its two calls commit independently: when the second fails the
//! main entity stays saved and the failure comes back as [`SaveError::PartialSave`],
//! so callers can offer [`BatchSaveOrchestrator::retry_related`] instead of
//! resubmitting the form. A first call that succeeds without returning the main id
//! ends in [`SaveError::MainSavedWithoutId`]; both report `main_committed()`.
//!
//! Execution order is fixed: main entity first, then related rows in slice order.
//! [`SaveDependency`] is consulted for the parent link column only.

pub mod plan;

pub use plan::ParentRef;

use crate::config::{BatchConfig, Config};
use crate::errors::adapt_failure;
use crate::protocol::{
    BatchOperation, BatchSaveRequest, BatchSaveResponse, BatchTransport, HttpTransport,
    SaveDependency, SaveError, SaveResult,
};
use crate::wire::{generate_temp_id, persisted_id, Record, WireSchema};

/// Per-call knobs.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Encoding overrides for the main table
    pub main_schema: WireSchema,
    /// Encoding overrides for the related table
    pub related_schema: WireSchema,
    /// FK column on related rows, used when no dependency declares one
    pub parent_id_field: Option<String>,
    /// Joined parent columns shown in the UI but not stored on the child table
    pub display_fields: Vec<String>,
    pub stop_on_error: Option<bool>,
    pub validate_schema: Option<bool>,
    pub validate_dependencies: Option<bool>,
}

impl SaveOptions {
    pub fn with_parent_id_field(mut self, field: impl Into<String>) -> Self {
        self.parent_id_field = Some(field.into());
        self
    }

    pub fn with_display_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.display_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Ids the server resolved for a successful save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub main_id: Option<i64>,
    /// One entry per related record, in input order
    pub related_ids: Vec<Option<i64>>,
}

pub struct BatchSaveOrchestrator<T: BatchTransport> {
    transport: T,
    batch: BatchConfig,
}

impl BatchSaveOrchestrator<HttpTransport> {
    pub fn from_config(config: &Config) -> SaveResult<Self> {
        Ok(Self::new(HttpTransport::new(&config.api)?, config.batch.clone()))
    }
}

impl<T: BatchTransport> BatchSaveOrchestrator<T> {
    pub fn new(transport: T, batch: BatchConfig) -> Self {
        BatchSaveOrchestrator { transport, batch }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Save a single entity.
    pub async fn save_entity(
        &self,
        entity: &Record,
        table: &str,
        options: &SaveOptions,
    ) -> SaveResult<SaveOutcome> {
        self.save_entity_with_related(entity, &[], table, "", &[], options)
            .await
    }

    /// Save the main entity and its related rows in one call.
    ///
    /// Relies on the server substituting the main operation's `tempId` when the main
    /// entity is new. Related rows need a parent link column, taken from
    /// `dependencies` or `options`; without one nothing is sent.
    pub async fn save_entity_with_related(
        &self,
        entity: &Record,
        related: &[Record],
        main_table: &str,
        related_table: &str,
        dependencies: &[SaveDependency],
        options: &SaveOptions,
    ) -> SaveResult<SaveOutcome> {
        let parent_field = if related.is_empty() {
            None
        } else {
            Some(plan::parent_id_field(dependencies, related_table, options)?)
        };

        let main_temp_id = generate_temp_id(&self.batch.temp_id_prefix);
        let main_op = plan::main_operation(entity, main_table, &main_temp_id, &options.main_schema);

        let related_ops = match parent_field {
            Some(field) => {
                let parent = match persisted_id(entity) {
                    Some(id) => ParentRef::Id(id),
                    None => ParentRef::TempId(main_temp_id.clone()),
                };
                plan::related_operations(
                    related,
                    related_table,
                    &parent,
                    &field,
                    &options.related_schema,
                )
            }
            None => Vec::new(),
        };
        let related_temp_ids: Vec<String> =
            related_ops.iter().map(|op| op.temp_id.clone()).collect();

        let mut operations = Vec::with_capacity(related_ops.len() + 1);
        operations.push(main_op);
        operations.extend(related_ops);

        let response = self
            .submit(self.request(operations, options), main_table)
            .await?;

        let outcome = SaveOutcome {
            main_id: resolve_main_id(&response, &main_temp_id, entity),
            related_ids: related_temp_ids
                .iter()
                .zip(related)
                .map(|(temp_id, record)| {
                    response.resolved_id(temp_id).or_else(|| persisted_id(record))
                })
                .collect(),
        };
        tracing::info!(
            table = main_table,
            main_id = ?outcome.main_id,
            related = related.len(),
            "entity_saved"
        );
        Ok(outcome)
    }

    /// Save the main entity, then its related rows in a second call.
    pub async fn save_entity_with_steps(
        &self,
        entity: &Record,
        related: &[Record],
        main_table: &str,
        related_table: &str,
        dependencies: &[SaveDependency],
        options: &SaveOptions,
    ) -> SaveResult<SaveOutcome> {
        // Resolve before the first call so a misconfiguration commits nothing.
        let parent_field = if related.is_empty() {
            None
        } else {
            Some(plan::parent_id_field(dependencies, related_table, options)?)
        };

        let main_temp_id = generate_temp_id(&self.batch.temp_id_prefix);
        let main_op = plan::main_operation(entity, main_table, &main_temp_id, &options.main_schema);
        let response = self
            .submit(self.request(vec![main_op], options), main_table)
            .await?;
        let main_id = resolve_main_id(&response, &main_temp_id, entity);
        tracing::info!(table = main_table, main_id = ?main_id, "main_entity_saved");

        let Some(parent_field) = parent_field else {
            return Ok(SaveOutcome {
                main_id,
                related_ids: Vec::new(),
            });
        };

        let Some(main_id) = main_id else {
            tracing::warn!(table = main_table, temp_id = %main_temp_id, "main_id_unresolved");
            return Err(SaveError::MainSavedWithoutId {
                table: main_table.to_string(),
                temp_id: main_temp_id,
            });
        };

        let related_ids = self
            .save_dependents(main_id, related, related_table, &parent_field, options)
            .await
            .map_err(|source| SaveError::PartialSave {
                main_id,
                source: Box::new(source),
            })?;

        Ok(SaveOutcome {
            main_id: Some(main_id),
            related_ids,
        })
    }

    /// Resend only the related rows of a partially saved entity.
    pub async fn retry_related(
        &self,
        main_id: i64,
        related: &[Record],
        related_table: &str,
        dependencies: &[SaveDependency],
        options: &SaveOptions,
    ) -> SaveResult<Vec<Option<i64>>> {
        if related.is_empty() {
            return Ok(Vec::new());
        }
        let parent_field = plan::parent_id_field(dependencies, related_table, options)?;
        self.save_dependents(main_id, related, related_table, &parent_field, options)
            .await
    }

    async fn save_dependents(
        &self,
        main_id: i64,
        related: &[Record],
        related_table: &str,
        parent_field: &str,
        options: &SaveOptions,
    ) -> SaveResult<Vec<Option<i64>>> {
        let operations =
            plan::dependent_create_operations(related, related_table, main_id, parent_field, options);
        let temp_ids: Vec<String> = operations.iter().map(|op| op.temp_id.clone()).collect();

        let response = self
            .submit(self.request(operations, options), related_table)
            .await?;
        tracing::info!(
            table = related_table,
            parent_id = main_id,
            count = temp_ids.len(),
            "related_entities_saved"
        );
        Ok(temp_ids
            .iter()
            .map(|temp_id| response.resolved_id(temp_id))
            .collect())
    }

    fn request(&self, operations: Vec<BatchOperation>, options: &SaveOptions) -> BatchSaveRequest {
        let mut request = self.batch.request(operations);
        if let Some(stop) = options.stop_on_error {
            request.stop_on_error = stop;
        }
        if let Some(validate) = options.validate_schema {
            request.validate_schema = validate;
        }
        if let Some(validate) = options.validate_dependencies {
            request.validate_dependencies = validate;
        }
        request
    }

    async fn submit(&self, request: BatchSaveRequest, table: &str) -> SaveResult<BatchSaveResponse> {
        request.validate_unique_temp_ids()?;
        let url = self.transport.endpoint();
        tracing::debug!(table, operations = request.len(), url = %url, "batch_request");

        let response = self.transport.post_batch(&request).await?;
        if !response.is_success() {
            return Err(adapt_failure(&response, table, &request, &url));
        }
        Ok(BatchSaveResponse::from_success_body(&response.body))
    }
}

/// `ids[tempId]`, then the single-op `id`, then the id the entity already had.
fn resolve_main_id(response: &BatchSaveResponse, main_temp_id: &str, entity: &Record) -> Option<i64> {
    response
        .resolved_id(main_temp_id)
        .or(response.id)
        .or_else(|| persisted_id(entity))
}
