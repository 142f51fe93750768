//! Document signing core logic
//!
//! Ties field placement, the embedding pass and the audit chain together
//! into a per-document lifecycle.

pub mod config;
pub mod document;
pub mod signing;
pub mod store;

pub use config::SigningConfig;
pub use document::SigningDocument;
pub use signing::sign_document;
pub use store::{AuditStore, InMemoryAuditStore};

pub use shared_pdf::{EmbedStyle, Fit};
pub use shared_types::{
    Actor, AuditAction, AuditLog, AuditRecord, ChainReport, DocsignError, DocumentStatus, Field,
    FieldType, FieldValue, NormalizedPosition, PageGeometry, Result, TargetRect,
};
