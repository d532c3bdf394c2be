use std::time::Duration;
use thiserror::Error;

pub type RecommenderResult<T> = Result<T, RecommenderError>;

#[derive(Error, Debug)]
pub enum RecommenderError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Candidate not found: {0}")]
    CandidateNotFound(String),

    /// The persisted sufficient statistics for an investor could not be decoded.
    /// Never resolved implicitly; the caller must repair or reset the state.
    #[error("Bandit state corrupted for investor {investor_id}: {reason}")]
    StateCorrupted { investor_id: String, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Version conflict for investor {investor_id}: expected {expected:?}, found {found:?}")]
    VersionConflict {
        investor_id: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RecommenderError {
    pub fn corrupted(investor_id: &str, reason: impl Into<String>) -> Self {
        Self::StateCorrupted {
            investor_id: investor_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable identifier used in API error bodies and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::CandidateNotFound(_) => "candidate_not_found",
            Self::StateCorrupted { .. } => "state_corrupted",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::VersionConflict { .. } => "version_conflict",
            Self::Timeout(_) => "timeout",
            Self::Store(_) => "store",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}
