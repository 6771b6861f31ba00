//! Shared error taxonomy for the ESA CCI virtual store.

use thiserror::Error;

pub type EsaCciResult<T> = Result<T, EsaCciError>;

/// Primary error type, shared across every crate in the workspace.
#[derive(Debug, Error)]
pub enum EsaCciError {
    #[error("dataset not found: {0}")]
    NotFound(String),

    #[error("metadata unavailable for {dataset_id}: {reason}")]
    MetadataUnavailable { dataset_id: String, reason: String },

    #[error("granule unavailable for {dataset_id} at {context}: {reason}")]
    GranuleUnavailable {
        dataset_id: String,
        context: String,
        reason: String,
    },

    #[error("store is read-only: cannot {operation} key '{key}'")]
    ReadOnly { operation: &'static str, key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },
}

impl EsaCciError {
    pub fn metadata_unavailable(dataset_id: impl Into<String>, reason: impl Into<String>) -> Self {
        EsaCciError::MetadataUnavailable {
            dataset_id: dataset_id.into(),
            reason: reason.into(),
        }
    }

    pub fn granule_unavailable(
        dataset_id: impl Into<String>,
        context: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        EsaCciError::GranuleUnavailable {
            dataset_id: dataset_id.into(),
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        EsaCciError::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error kind should abort metadata merge, vs. degrade it to
    /// an empty/partial field at the description-document layer.
    pub fn is_fatal_for_metadata_merge(&self) -> bool {
        !matches!(self, EsaCciError::MetadataUnavailable { .. })
    }
}

impl From<reqwest::Error> for EsaCciError {
    fn from(err: reqwest::Error) -> Self {
        EsaCciError::Transport {
            url: err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EsaCciError {
    fn from(err: serde_json::Error) -> Self {
        EsaCciError::InvalidArgument(format!("JSON error: {err}"))
    }
}

impl From<quick_xml::Error> for EsaCciError {
    fn from(err: quick_xml::Error) -> Self {
        EsaCciError::MetadataUnavailable {
            dataset_id: "<unknown>".to_string(),
            reason: format!("XML error: {err}"),
        }
    }
}
