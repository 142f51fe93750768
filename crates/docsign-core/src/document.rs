//! A document moving through placement, signing and completion

use shared_pdf::{clamp, page_geometries};
use shared_types::{
    Actor, AuditAction, AuditLog, AuditRecord, ChainReport, DocsignError, DocumentStatus, Field,
    FieldValue, NormalizedPosition, PageGeometry, Result,
};
use uuid::Uuid;

use crate::config::SigningConfig;
use crate::signing::sign_document;
use crate::store::AuditStore;

/// Document bytes, placed fields and the audit log that records every change.
///
/// All mutation goes through `&mut self`; a failed operation leaves the
/// bytes, status, fields and log as they were.
#[derive(Debug, Clone)]
pub struct SigningDocument {
    id: String,
    bytes: Vec<u8>,
    status: DocumentStatus,
    fields: Vec<Field>,
    geometries: Vec<PageGeometry>,
    audit: AuditLog,
}

impl SigningDocument {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            audit: AuditLog::new(&id),
            id,
            bytes: Vec::new(),
            status: DocumentStatus::Created,
            fields: Vec::new(),
            geometries: Vec::new(),
        }
    }

    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn geometries(&self) -> &[PageGeometry] {
        &self.geometries
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    fn ensure_transition(&self, next: DocumentStatus) -> Result<()> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(DocsignError::InvalidTransition {
                from: self.status,
                to: next,
            })
        }
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.status.accepts_field_edits() {
            Ok(())
        } else {
            Err(DocsignError::InvalidTransition {
                from: self.status,
                to: DocumentStatus::PendingSignature,
            })
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.status == DocumentStatus::Created {
            return Err(DocsignError::DocumentNotLoaded(self.id.clone()));
        }
        Ok(())
    }

    fn geometry(&self, page: u32) -> Result<&PageGeometry> {
        self.geometries
            .iter()
            .find(|g| g.page_number == page)
            .ok_or(DocsignError::MissingPageGeometry { page })
    }

    fn field_index(&self, field_id: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.id == field_id)
            .ok_or_else(|| DocsignError::FieldNotFound(field_id.to_string()))
    }

    /// Attach the uploaded bytes and their page sizes. Records the upload.
    pub fn load(
        &mut self,
        bytes: Vec<u8>,
        geometries: Vec<PageGeometry>,
        actor: Actor,
    ) -> Result<&AuditRecord> {
        self.ensure_transition(DocumentStatus::Draft)?;
        for g in &geometries {
            let valid = |v: f64| v.is_finite() && v > 0.0;
            if g.page_number == 0 || !valid(g.width_units) || !valid(g.height_units) {
                return Err(DocsignError::invalid_geometry(format!(
                    "page {} has geometry {}x{}",
                    g.page_number, g.width_units, g.height_units
                )));
            }
        }

        let details = format!("{} bytes, {} pages", bytes.len(), geometries.len());
        self.bytes = bytes;
        self.geometries = geometries;
        self.status = DocumentStatus::Draft;
        Ok(self.audit.record_upload(actor, &self.bytes, Some(details)))
    }

    /// Load a PDF, reading page sizes from its MediaBoxes
    pub fn load_pdf(&mut self, bytes: Vec<u8>, actor: Actor) -> Result<&AuditRecord> {
        let geometries = page_geometries(&bytes)?;
        self.load(bytes, geometries, actor)
    }

    /// Place a field. The position is clamped to the page first.
    pub fn add_field(&mut self, field: Field, actor: Actor) -> Result<String> {
        self.ensure_editable()?;
        let mut field = field;
        field.position = clamp(&field.position);
        field.position.validate()?;
        self.geometry(field.page_number())?;

        let id = field.id.clone();
        let details = format!(
            "{} field {} on page {}",
            field.field_type,
            id,
            field.page_number()
        );
        self.fields.push(field);
        self.status = DocumentStatus::PendingSignature;
        self.audit
            .record_unchanged(AuditAction::FieldAdded, actor, &self.bytes, Some(details));
        Ok(id)
    }

    fn update_position(
        &mut self,
        field_id: &str,
        actor: Actor,
        change: impl FnOnce(&NormalizedPosition) -> NormalizedPosition,
        what: &str,
    ) -> Result<&AuditRecord> {
        self.ensure_editable()?;
        let index = self.field_index(field_id)?;
        if self.fields[index].has_value() {
            return Err(DocsignError::FieldFinalized(field_id.to_string()));
        }

        let position = clamp(&change(&self.fields[index].position));
        self.geometry(position.page_number)?;
        self.fields[index].position = position;

        let details = format!("{} field {}", what, field_id);
        Ok(self.audit.record_unchanged(
            AuditAction::FieldModified,
            actor,
            &self.bytes,
            Some(details),
        ))
    }

    /// Move an unvalued field. Coordinates are fractions of the page.
    pub fn move_field(
        &mut self,
        field_id: &str,
        x_percent: f64,
        y_percent: f64,
        actor: Actor,
    ) -> Result<&AuditRecord> {
        self.update_position(
            field_id,
            actor,
            |p| NormalizedPosition {
                x_percent,
                y_percent,
                ..*p
            },
            "moved",
        )
    }

    pub fn resize_field(
        &mut self,
        field_id: &str,
        width_percent: f64,
        height_percent: f64,
        actor: Actor,
    ) -> Result<&AuditRecord> {
        self.update_position(
            field_id,
            actor,
            |p| NormalizedPosition {
                width_percent,
                height_percent,
                ..*p
            },
            "resized",
        )
    }

    /// Fill in a field. Its geometry is fixed from now on.
    pub fn set_field_value(
        &mut self,
        field_id: &str,
        value: FieldValue,
        actor: Actor,
    ) -> Result<&AuditRecord> {
        self.ensure_editable()?;
        let index = self.field_index(field_id)?;
        let details = format!("set {} value on field {}", value.kind(), field_id);
        self.fields[index].value = Some(value);
        Ok(self.audit.record_unchanged(
            AuditAction::FieldModified,
            actor,
            &self.bytes,
            Some(details),
        ))
    }

    pub fn delete_field(&mut self, field_id: &str, actor: Actor) -> Result<&AuditRecord> {
        self.ensure_editable()?;
        let index = self.field_index(field_id)?;
        let removed = self.fields.remove(index);
        let details = format!("{} field {}", removed.field_type, removed.id);
        Ok(self.audit.record_unchanged(
            AuditAction::FieldDeleted,
            actor,
            &self.bytes,
            Some(details),
        ))
    }

    /// Embed every valued field and record the before/after digests.
    pub fn sign(&mut self, actor: Actor, config: &SigningConfig) -> Result<&AuditRecord> {
        self.ensure_transition(DocumentStatus::Signed)?;
        let signed = sign_document(&self.bytes, &self.geometries, &self.fields, config)?;

        let embedded = self.fields.iter().filter(|f| f.has_value()).count();
        let before = std::mem::replace(&mut self.bytes, signed);
        self.status = DocumentStatus::Signed;
        Ok(self.audit.record_mutation(
            AuditAction::Signed,
            actor,
            &before,
            &self.bytes,
            Some(format!("{} fields embedded", embedded)),
        ))
    }

    pub fn record_download(&mut self, actor: Actor) -> Result<&AuditRecord> {
        self.ensure_loaded()?;
        Ok(self.audit.record_download(actor, &self.bytes, None))
    }

    pub fn complete(&mut self) -> Result<()> {
        self.ensure_transition(DocumentStatus::Completed)?;
        self.status = DocumentStatus::Completed;
        tracing::info!(document_id = %self.id, "document completed");
        Ok(())
    }

    /// Swap in bytes produced outside this document's recorded actions.
    ///
    /// The replacement is logged without a `hash_before`, so `verify` will
    /// report the chain as broken from here on.
    pub fn replace_with_external(&mut self, bytes: Vec<u8>, actor: Actor) -> Result<&AuditRecord> {
        self.ensure_loaded()?;
        self.bytes = bytes;
        tracing::warn!(document_id = %self.id, "document bytes replaced externally");
        Ok(self.audit.record_external_replacement(
            actor,
            &self.bytes,
            Some("external replacement".to_string()),
        ))
    }

    /// Verify the audit chain and that it ends with the current bytes
    pub fn verify(&self) -> Result<ChainReport> {
        self.audit.verify_against(&self.bytes)
    }

    /// Hand records the store has not seen yet to `store`, oldest first.
    /// Returns how many were appended.
    pub fn publish_audit(&self, store: &mut dyn AuditStore) -> Result<usize> {
        let mut appended = 0;
        for record in self.audit.records() {
            if !store.contains(&record.record_id) {
                store.append(record.clone())?;
                appended += 1;
            }
        }
        Ok(appended)
    }
}
