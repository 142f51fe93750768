//! Tamper-evident audit log for document mutations
//!
//! Every record carries the SHA-256 digest of the document bytes before and
//! after the action it describes. Adjacent records link up: the `hash_after`
//! of one record is the `hash_before` of the next, so any change to the bytes
//! that happened outside the recorded sequence shows up as a broken link.
//! Records are additionally chained through `previous_record_hash`, which
//! covers edits to the log itself.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{DocsignError, Result};

const NO_DIGEST: &str = "<none>";

/// Types of auditable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Uploaded,
    FieldAdded,
    FieldModified,
    FieldDeleted,
    Signed,
    Downloaded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Uploaded => "uploaded",
            AuditAction::FieldAdded => "field_added",
            AuditAction::FieldModified => "field_modified",
            AuditAction::FieldDeleted => "field_deleted",
            AuditAction::Signed => "signed",
            AuditAction::Downloaded => "downloaded",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed an audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Actor {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            ip_hash: None,
            user_agent: None,
        }
    }

    /// Attach the client address. Only its digest is kept.
    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip_hash = Some(hash_document(ip.as_bytes()));
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }
}

/// A single audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub record_id: String,
    pub document_id: String,
    pub action: AuditAction,
    pub hash_before: Option<String>,
    pub hash_after: Option<String>,
    pub timestamp: String,
    pub actor: Actor,
    pub details: Option<String>,
    pub previous_record_hash: Option<String>,
}

impl AuditRecord {
    fn new(
        document_id: &str,
        action: AuditAction,
        actor: Actor,
        hash_before: Option<String>,
        hash_after: Option<String>,
        details: Option<String>,
        previous_record_hash: Option<String>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            action,
            hash_before,
            hash_after,
            timestamp: Utc::now().to_rfc3339(),
            actor,
            details,
            previous_record_hash,
        }
    }

    /// Compute the hash of this record (for chain linking)
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        update_field(&mut hasher, Some(&self.record_id));
        update_field(&mut hasher, Some(&self.document_id));
        update_field(&mut hasher, Some(self.action.as_str()));
        update_field(&mut hasher, self.hash_before.as_deref());
        update_field(&mut hasher, self.hash_after.as_deref());
        update_field(&mut hasher, Some(&self.timestamp));
        update_field(&mut hasher, Some(&self.actor.email));
        update_field(&mut hasher, self.actor.ip_hash.as_deref());
        update_field(&mut hasher, self.actor.user_agent.as_deref());
        update_field(&mut hasher, self.details.as_deref());
        update_field(&mut hasher, self.previous_record_hash.as_deref());
        hex::encode(hasher.finalize())
    }
}

// Length-prefixed so that adjacent fields cannot be shifted into each other.
fn update_field(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update((v.len() as u64).to_be_bytes());
            hasher.update(v.as_bytes());
        }
        None => hasher.update([0u8]),
    }
}

/// Outcome of a successful chain verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    pub records: usize,
    /// Number of before/after digest pairs that were compared
    pub links_checked: usize,
    /// Digest the document must currently have
    pub tip: Option<String>,
}

/// Append-only chain of audit records for one document
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    document_id: String,
    created_at: String,
    records: Vec<AuditRecord>,
}

impl AuditLog {
    /// Create a new audit log for a document
    pub fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
            records: Vec::new(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the hash of the last record (for linking)
    pub fn last_record_hash(&self) -> Option<String> {
        self.records.last().map(|r| r.compute_hash())
    }

    /// Digest the next `hash_before` is expected to carry.
    pub fn tip_digest(&self) -> Option<&str> {
        self.records
            .iter()
            .rev()
            .find_map(|r| r.hash_after.as_deref().or(r.hash_before.as_deref()))
    }

    fn append(
        &mut self,
        action: AuditAction,
        actor: Actor,
        hash_before: Option<String>,
        hash_after: Option<String>,
        details: Option<String>,
    ) -> &AuditRecord {
        let previous = self.last_record_hash();
        let record = AuditRecord::new(
            &self.document_id,
            action,
            actor,
            hash_before,
            hash_after,
            details,
            previous,
        );
        tracing::info!(
            document_id = %self.document_id,
            action = %record.action,
            index = self.records.len(),
            "audit record appended"
        );
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// Record the initial upload of the document.
    pub fn record_upload(
        &mut self,
        actor: Actor,
        bytes: &[u8],
        details: Option<String>,
    ) -> &AuditRecord {
        let after = hash_document(bytes);
        self.append(AuditAction::Uploaded, actor, None, Some(after), details)
    }

    /// Record an action that did not change the document bytes
    /// (field placement edits are stored beside the document).
    pub fn record_unchanged(
        &mut self,
        action: AuditAction,
        actor: Actor,
        bytes: &[u8],
        details: Option<String>,
    ) -> &AuditRecord {
        let digest = hash_document(bytes);
        self.append(action, actor, Some(digest.clone()), Some(digest), details)
    }

    /// Record an action that turned `before` into `after`.
    pub fn record_mutation(
        &mut self,
        action: AuditAction,
        actor: Actor,
        before: &[u8],
        after: &[u8],
        details: Option<String>,
    ) -> &AuditRecord {
        let hash_before = hash_document(before);
        let hash_after = hash_document(after);
        self.append(action, actor, Some(hash_before), Some(hash_after), details)
    }

    pub fn record_download(
        &mut self,
        actor: Actor,
        bytes: &[u8],
        details: Option<String>,
    ) -> &AuditRecord {
        let digest = hash_document(bytes);
        self.append(AuditAction::Downloaded, actor, Some(digest), None, details)
    }

    /// Record a file supplied from outside the system replacing the document.
    ///
    /// The record has no `hash_before`, so verification reports the chain as
    /// broken at this point.
    pub fn record_external_replacement(
        &mut self,
        actor: Actor,
        bytes: &[u8],
        details: Option<String>,
    ) -> &AuditRecord {
        let after = hash_document(bytes);
        self.append(AuditAction::Uploaded, actor, None, Some(after), details)
    }

    /// Verify the integrity of the chain
    pub fn verify(&self) -> Result<ChainReport> {
        let mut carried: Option<&str> = None;
        let mut previous_record_hash: Option<String> = None;
        let mut links_checked = 0;

        for (index, record) in self.records.iter().enumerate() {
            match (&record.previous_record_hash, &previous_record_hash) {
                (None, None) => {}
                (Some(found), Some(expected)) if digests_match(found, expected) => {}
                (found, expected) => {
                    return Err(mismatch(
                        index,
                        "previous_record_hash does not match the preceding record",
                        expected.as_deref(),
                        found.as_deref(),
                    ));
                }
            }

            if record.document_id != self.document_id {
                return Err(mismatch(
                    index,
                    "record belongs to another document",
                    Some(&self.document_id),
                    Some(&record.document_id),
                ));
            }

            if record.action == AuditAction::Signed
                && (record.hash_before.is_none() || record.hash_after.is_none())
            {
                return Err(mismatch(
                    index,
                    "signed record must carry both digests",
                    record.hash_before.as_deref(),
                    record.hash_after.as_deref(),
                ));
            }

            match (carried, record.hash_before.as_deref()) {
                (Some(expected), Some(found)) => {
                    if !digests_match(expected, found) {
                        return Err(mismatch(
                            index,
                            "hash_before does not continue the chain",
                            Some(expected),
                            Some(found),
                        ));
                    }
                    links_checked += 1;
                }
                (Some(expected), None) if record.hash_after.is_some() => {
                    return Err(mismatch(
                        index,
                        "document replaced outside the recorded sequence",
                        Some(expected),
                        None,
                    ));
                }
                _ => {}
            }

            if let Some(next) = record.hash_after.as_deref().or(record.hash_before.as_deref()) {
                carried = Some(next);
            }
            previous_record_hash = Some(record.compute_hash());
        }

        Ok(ChainReport {
            records: self.records.len(),
            links_checked,
            tip: carried.map(str::to_string),
        })
    }

    /// Verify the chain and that `current` is the document the chain ends with.
    pub fn verify_against(&self, current: &[u8]) -> Result<ChainReport> {
        let report = self.verify()?;
        let actual = hash_document(current);
        match report.tip.as_deref() {
            Some(tip) if digests_match(tip, &actual) => Ok(report),
            tip => Err(mismatch(
                self.records.len(),
                "current document does not match the chain tip",
                tip,
                Some(&actual),
            )),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Generate a summary for display
    pub fn summary(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| {
                format!(
                    "[{}] {} - {}",
                    r.timestamp.split('T').next().unwrap_or(&r.timestamp),
                    r.actor.email,
                    r.action
                )
            })
            .collect()
    }
}

fn mismatch(
    index: usize,
    reason: &str,
    expected: Option<&str>,
    found: Option<&str>,
) -> DocsignError {
    tracing::warn!(index, reason, "audit chain verification failed");
    DocsignError::IntegrityMismatch {
        index,
        reason: reason.to_string(),
        expected: expected.unwrap_or(NO_DIGEST).to_string(),
        found: found.unwrap_or(NO_DIGEST).to_string(),
    }
}

/// Compute SHA-256 hash of document bytes
pub fn hash_document(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of two hex digests
pub fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alice() -> Actor {
        Actor::new("alice@example.com")
    }

    #[test]
    fn test_chain_integrity() {
        let mut log = AuditLog::new("test-doc-123");
        let original = b"%PDF-1.7 original".to_vec();
        let signed = b"%PDF-1.7 signed".to_vec();

        log.record_upload(alice(), &original, None);
        log.record_unchanged(
            AuditAction::FieldAdded,
            alice(),
            &original,
            Some("Signature field on page 1".to_string()),
        );
        log.record_mutation(AuditAction::Signed, alice(), &original, &signed, None);
        log.record_download(alice(), &signed, None);

        let report = log.verify().unwrap();
        assert_eq!(report.records, 4);
        assert_eq!(report.links_checked, 3);
        assert_eq!(report.tip, Some(hash_document(&signed)));
        assert!(log.verify_against(&signed).is_ok());
    }

    #[test]
    fn test_five_mutations_link_up() {
        let mut log = AuditLog::new("doc");
        let mut bytes = b"v0".to_vec();
        log.record_upload(alice(), &bytes, None);

        for i in 1..=5u8 {
            let before = bytes.clone();
            bytes.push(i);
            log.record_mutation(AuditAction::Signed, alice(), &before, &bytes, None);
        }

        log.verify().unwrap();
        for pair in log.records().windows(2) {
            assert_eq!(pair[0].hash_after, pair[1].hash_before);
        }
    }

    #[test]
    fn test_byte_flip_between_records_detected() {
        let mut log = AuditLog::new("doc");
        let mut bytes = vec![0u8; 32];
        log.record_upload(alice(), &bytes, None);

        for i in 0..5usize {
            if i == 3 {
                // Altered while nobody was recording
                bytes[7] ^= 0x01;
            }
            let before = bytes.clone();
            bytes[i] = 0xff;
            log.record_mutation(AuditAction::Signed, alice(), &before, &bytes, None);
        }

        let err = log.verify().unwrap_err();
        match err {
            DocsignError::IntegrityMismatch { index, .. } => assert_eq!(index, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stored_document_tamper_detected() {
        let mut log = AuditLog::new("doc");
        let bytes = b"%PDF-1.7 body".to_vec();
        log.record_upload(alice(), &bytes, None);

        let mut tampered = bytes.clone();
        tampered[3] = b'X';
        let err = log.verify_against(&tampered).unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn test_external_replacement_breaks_chain() {
        let mut log = AuditLog::new("doc");
        log.record_upload(alice(), b"first", None);
        log.record_external_replacement(alice(), b"second", Some("re-uploaded".into()));

        match log.verify().unwrap_err() {
            DocsignError::IntegrityMismatch {
                index, found, ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(found, NO_DIGEST);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_record_tamper_detection() {
        let mut log = AuditLog::new("test-doc-123");
        log.record_upload(alice(), b"a", None);
        log.record_unchanged(AuditAction::FieldAdded, alice(), b"a", None);

        // Tamper with the first record
        log.records[0].actor.email = "mallory@example.com".to_string();

        assert!(log.verify().is_err());
    }

    #[test]
    fn test_signed_record_needs_both_digests() {
        let mut log = AuditLog::new("doc");
        log.record_upload(alice(), b"a", None);
        log.record_mutation(AuditAction::Signed, alice(), b"a", b"b", None);
        log.records[1].hash_after = None;
        // Re-link so only the missing digest is at fault
        let hash = log.records[0].compute_hash();
        log.records[1].previous_record_hash = Some(hash);

        let err = log.verify().unwrap_err();
        assert!(err.to_string().contains("signed record must carry both digests"));
    }

    #[test]
    fn test_download_keeps_chain() {
        let mut log = AuditLog::new("doc");
        log.record_upload(alice(), b"a", None);
        log.record_download(alice(), b"a", None);
        log.record_unchanged(AuditAction::FieldAdded, alice(), b"a", None);
        assert_eq!(log.tip_digest(), Some(hash_document(b"a").as_str()));
        assert!(log.verify().is_ok());
    }

    #[test]
    fn test_digests_match() {
        let a = hash_document(b"x");
        assert!(digests_match(&a, &hash_document(b"x")));
        assert!(!digests_match(&a, &hash_document(b"y")));
        assert!(!digests_match(&a, &a[..10]));
    }

    #[test]
    fn test_actor_ip_is_hashed() {
        let actor = Actor::new("bob@example.com").with_ip("203.0.113.9");
        let ip_hash = actor.ip_hash.unwrap();
        assert_eq!(ip_hash.len(), 64);
        assert!(!ip_hash.contains("203"));
    }
}
