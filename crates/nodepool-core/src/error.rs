//! Error kinds reported by the scale-in pipeline.

use std::fmt;

use thiserror::Error;

use crate::types::PoolIdentifierKey;

/// Result type alias for scale-in operations.
pub type ScaleInResult<T> = Result<T, ScaleInError>;

/// Errors that can occur while selecting, resolving, filtering, or draining
/// nodes for removal.
#[derive(Debug, Error)]
pub enum ScaleInError {
    #[error("invalid scale-in request: {0}")]
    Validation(String),

    #[error("no eligible nodes found for {key} with value {value:?}")]
    NoEligibleNodes { key: PoolIdentifierKey, value: String },

    #[error("unsupported scale in node identification strategy: {0:?}")]
    UnsupportedStrategy(String),

    #[error("remote provider ID function not found: {0}")]
    UnsupportedProvider(String),

    #[error("unsupported pool identifier key: {0:?}")]
    UnsupportedPoolKey(String),

    #[error("failed to resolve remote ID for node {node_id}: {reason}")]
    Resolution { node_id: String, reason: String },

    #[error("busy-node oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("failed to drain node {node_id}: {reason}")]
    Drain { node_id: String, reason: String },

    #[error("context done while monitoring drain of node {node_id}")]
    Cancelled { node_id: String },

    /// Nothing was left to drain. `causes` holds the per-node failures that
    /// removed candidates along the way; it is empty when every candidate
    /// was busy.
    #[error("failed to identify nodes for removal")]
    NoRemovableNodes { causes: AggregateError },

    #[error("control plane error: {0}")]
    ControlPlane(String),
}

impl ScaleInError {
    /// Whether this error aborts the pipeline rather than being collected
    /// alongside a partial result.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ScaleInError::Resolution { .. }
                | ScaleInError::Drain { .. }
                | ScaleInError::Cancelled { .. }
        )
    }

    /// Internal ID of the node this error concerns, for per-node kinds.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            ScaleInError::Resolution { node_id, .. }
            | ScaleInError::Drain { node_id, .. }
            | ScaleInError::Cancelled { node_id } => Some(node_id),
            _ => None,
        }
    }
}

/// Independent per-node failures collected alongside a partial success.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<ScaleInError>,
}

impl AggregateError {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more failure.
    pub fn push(&mut self, err: ScaleInError) {
        self.errors.push(err);
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Recorded failures in the order they were pushed.
    pub fn errors(&self) -> &[ScaleInError] {
        &self.errors
    }

    /// Consume the aggregate, returning its failures.
    pub fn into_errors(self) -> Vec<ScaleInError> {
        self.errors
    }

    /// Merge another aggregate into this one.
    pub fn extend_from(&mut self, other: AggregateError) {
        self.errors.extend(other.errors);
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// `None` when nothing was collected.
    pub fn into_option(self) -> Option<AggregateError> {
        self.into_result().err()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no errors occurred"),
            1 => write!(f, "1 error occurred:\n\t* {}", self.errors[0]),
            n => {
                write!(f, "{n} errors occurred:")?;
                for err in &self.errors {
                    write!(f, "\n\t* {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AggregateError {}

impl FromIterator<ScaleInError> for AggregateError {
    fn from_iter<I: IntoIterator<Item = ScaleInError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl Extend<ScaleInError> for AggregateError {
    fn extend<I: IntoIterator<Item = ScaleInError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}
