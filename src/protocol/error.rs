//! Error types for batch save calls.

use crate::errors::SaveErrorData;

/// Failure of a save call.
///
/// Every variant reaches the caller; nothing in this crate swallows or retries.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SaveError {
    /// Network failure or non-2xx response without a structured body
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// `success: false` envelope without validation detail
    #[error("Server error: {message}")]
    Server { message: String },

    /// Structured per-field rejection
    #[error("Validation failed: {} operation(s) rejected", .0.failed.len())]
    Validation(SaveErrorData),

    /// Main entity committed, related rows were rejected
    #[error("Main entity saved with id {main_id}, related entities failed: {source}")]
    PartialSave {
        main_id: i64,
        source: Box<SaveError>,
    },

    /// Main entity committed but the response carried no id for it, so the related
    /// rows could not be linked and were not sent
    #[error("{table} saved but the server returned no id for {temp_id}; related rows were not sent")]
    MainSavedWithoutId { table: String, temp_id: String },

    /// Request violates the batch contract before it is sent
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

pub type SaveResult<T> = Result<T, SaveError>;

impl SaveError {
    /// Short tag used by the UI to choose between the rich modal and a toast.
    pub fn kind(&self) -> &'static str {
        match self {
            SaveError::Transport { .. } => "transport",
            SaveError::Server { .. } => "server",
            SaveError::Validation(_) => "validation",
            SaveError::PartialSave { .. } => "partial",
            SaveError::MainSavedWithoutId { .. } => "main_saved_without_id",
            SaveError::InvalidRequest { .. } => "invalid_request",
            SaveError::Serialization { .. } => "serialization",
        }
    }

    /// Structured validation payload, looking through a partial save.
    pub fn validation_data(&self) -> Option<&SaveErrorData> {
        match self {
            SaveError::Validation(data) => Some(data),
            SaveError::PartialSave { source, .. } => source.validation_data(),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.validation_data().is_some()
    }

    /// Id of the main entity if it was committed before the failure.
    pub fn committed_main_id(&self) -> Option<i64> {
        match self {
            SaveError::PartialSave { main_id, .. } => Some(*main_id),
            _ => None,
        }
    }

    /// True when the server holds the main entity despite the error.
    pub fn main_committed(&self) -> bool {
        matches!(
            self,
            SaveError::PartialSave { .. } | SaveError::MainSavedWithoutId { .. }
        )
    }

    /// Copyable diagnostic text: the full report for validation failures, the
    /// message otherwise.
    pub fn report(&self) -> String {
        match self.validation_data() {
            Some(data) => crate::errors::generate_error_report(data, None),
            None => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(e: serde_json::Error) -> Self {
        SaveError::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for SaveError {
    fn from(e: reqwest::Error) -> Self {
        SaveError::Transport {
            message: e.to_string(),
        }
    }
}
