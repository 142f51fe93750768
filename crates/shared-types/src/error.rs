//! Error taxonomy shared by the signing core

use thiserror::Error;

use crate::types::{DocumentStatus, FieldType};

pub type Result<T> = std::result::Result<T, DocsignError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocsignError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("unsupported asset format: {0}")]
    UnsupportedAssetFormat(String),

    #[error("no page geometry for page {page}")]
    MissingPageGeometry { page: u32 },

    #[error("integrity mismatch at record {index} ({reason}): expected {expected}, found {found}")]
    IntegrityMismatch {
        index: usize,
        reason: String,
        expected: String,
        found: String,
    },

    #[error("signing requested with no valued fields")]
    EmptyFieldSet,

    #[error("required field {0} has no value")]
    MissingRequiredValue(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("field {0} already has a value; its position is fixed")]
    FieldFinalized(String),

    #[error("document {0} has no content loaded")]
    DocumentNotLoaded(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("{field_type} field cannot render a {value_kind} value")]
    ValueTypeMismatch {
        field_type: FieldType,
        value_kind: &'static str,
    },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DocsignError {
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        DocsignError::InvalidGeometry(message.into())
    }

    /// True for failures that indicate the document or its audit trail was
    /// altered outside the recorded action sequence.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, DocsignError::IntegrityMismatch { .. })
    }
}

impl From<serde_json::Error> for DocsignError {
    fn from(e: serde_json::Error) -> Self {
        DocsignError::Serialization(e.to_string())
    }
}
