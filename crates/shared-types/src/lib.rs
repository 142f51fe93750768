//! Shared data model for field placement, signing and auditing

pub mod audit;
pub mod error;
pub mod types;

pub use audit::{digests_match, hash_document, Actor, AuditAction, AuditLog, AuditRecord, ChainReport};
pub use error::{DocsignError, Result};
pub use types::{
    ContainerSize, DocumentStatus, Field, FieldType, FieldValue, NormalizedPosition, PageGeometry,
    PixelRect, TargetRect,
};
