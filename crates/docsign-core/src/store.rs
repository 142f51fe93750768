//! Audit record persistence boundary

use chrono::{DateTime, FixedOffset};
use shared_types::{AuditRecord, DocsignError, Result};

/// Append-only storage for audit records
pub trait AuditStore {
    /// Store a record. Records are never updated or removed.
    fn append(&mut self, record: AuditRecord) -> Result<()>;

    fn contains(&self, record_id: &str) -> bool;

    /// All records of a document, newest first
    fn records_desc(&self, document_id: &str) -> Vec<AuditRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: Vec<AuditRecord>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&mut self, record: AuditRecord) -> Result<()> {
        if self.contains(&record.record_id) {
            tracing::warn!(record_id = %record.record_id, "duplicate audit record rejected");
            return Err(DocsignError::IntegrityMismatch {
                index: self.records.len(),
                reason: "record id already stored".to_string(),
                expected: "a new record id".to_string(),
                found: record.record_id,
            });
        }
        self.records.push(record);
        Ok(())
    }

    fn contains(&self, record_id: &str) -> bool {
        self.records.iter().any(|r| r.record_id == record_id)
    }

    fn records_desc(&self, document_id: &str) -> Vec<AuditRecord> {
        let mut matching: Vec<(usize, Option<DateTime<FixedOffset>>, &AuditRecord)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.document_id == document_id)
            .map(|(i, r)| (i, DateTime::parse_from_rfc3339(&r.timestamp).ok(), r))
            .collect();
        // Same-instant records keep append order, reversed
        matching.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
        matching.into_iter().map(|(_, _, r)| r.clone()).collect()
    }
}
