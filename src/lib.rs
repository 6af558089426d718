//! # batchsave
//!
//! Batch save orchestration for an offline-capable business-data editor: reference
//! data (counterparties, banks, fields, equipment, harvested products) is edited
//! locally and written to the remote API through one batch endpoint.
//!
//! ## Pipeline
//!
//! ```text
//! EntityCoordinator / RelatedEntityManager   draft + snapshot, has_changes
//!     ↓
//! BatchSaveOrchestrator                      one call, or main-then-related
//!     ↓
//! wire::prepare_data_for_server              entity → flat wire columns
//!     ↓
//! BatchTransport (HttpTransport)             POST /api/data/batch
//!     ↓
//! errors::handle_batch_error                 3 failure shapes → SaveErrorData
//!     ↓
//! errors::generate_error_report              copyable plain-text diagnostics
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use batchsave::{BatchSaveOrchestrator, Config, SaveDependency, SaveOptions};
//!
//! let config = Config::load()?;
//! let orchestrator = BatchSaveOrchestrator::from_config(&config)?;
//!
//! let deps = [SaveDependency::on_main("counterparty_banks", "counterparty_id")];
//! match orchestrator
//!     .save_entity_with_steps(&entity, &banks, "counterparties", "counterparty_banks", &deps, &SaveOptions::default())
//!     .await
//! {
//!     Ok(outcome) => println!("saved as {:?}", outcome.main_id),
//!     Err(e) => eprintln!("{}", e.report()),
//! }
//! ```

pub mod config;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod protocol;
pub mod state;
pub mod wire;

pub use config::Config;
pub use errors::{
    generate_error_report, get_error_fields, group_errors_by_table, handle_batch_error,
    FailedOperation, RequestInfo, SaveErrorData, ValidationError,
};
pub use orchestrator::{BatchSaveOrchestrator, SaveOptions, SaveOutcome};
pub use protocol::{
    BatchOperation, BatchSaveRequest, BatchSaveResponse, BatchTransport, HttpTransport,
    OperationType, SaveDependency, SaveError, SaveResult, TransportResponse,
};
pub use state::{has_changes, EntityCoordinator, LocalCache, RelatedEntityManager};
pub use wire::{
    generate_temp_id, is_temp_id, prepare_data_for_server, process_data_from_server, Record,
    WireSchema,
};
