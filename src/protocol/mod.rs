//! Batch Save Protocol
//!
//! Client side of the batch write endpoint: request/response types, error type and
//! the transport seam.
//!
//! # Wire Contract
//!
//! ```text
//! POST {api_base_url}/api/data/batch
//!   body:     BatchSaveRequest  { operations, stopOnError, validateDependencies, validateSchema }
//!   response: BatchSaveResponse { success, id?, ids?, error?, validationErrors?, data.failed? }
//! ```
//!
//! A non-2xx status and `success: false` are both failures.
//!
//! # Module Structure
//!
//! - `batch` - Operation, request, response and dependency types
//! - `error` - `SaveError`
//! - `transport` - `BatchTransport` trait and the reqwest implementation

pub mod batch;
pub mod error;
pub mod transport;

pub use batch::{
    BatchOperation, BatchSaveRequest, BatchSaveResponse, OperationType, SaveDependency,
    MAIN_ENTITY,
};
pub use error::{SaveError, SaveResult};
pub use transport::{BatchTransport, HttpTransport, TransportResponse};

/// Default path of the batch endpoint, relative to the API base URL
pub const BATCH_PATH: &str = "/api/data/batch";

/// HTTP method used for batch calls, as recorded in diagnostics
pub const BATCH_METHOD: &str = "POST";
