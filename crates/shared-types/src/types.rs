//! Placement and field records shared between the editor, the embedding
//! pass and the audit trail.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DocsignError, Result};

/// Slack allowed on the `x + width <= 1` style invariants
pub const POSITION_TOLERANCE: f64 = 1e-9;

/// Resolution-independent placement of a field on a page.
///
/// All four percentages are fractions of the page (0.0 to 1.0) measured from
/// the top-left corner, the same way the editing surface measures them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPosition {
    pub page_number: u32,
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
}

impl NormalizedPosition {
    pub fn new(
        page_number: u32,
        x_percent: f64,
        y_percent: f64,
        width_percent: f64,
        height_percent: f64,
    ) -> Self {
        Self {
            page_number,
            x_percent,
            y_percent,
            width_percent,
            height_percent,
        }
    }

    /// Check the position stays on its page.
    pub fn validate(&self) -> Result<()> {
        if self.page_number == 0 {
            return Err(DocsignError::invalid_geometry("page numbers start at 1"));
        }
        let parts = [
            ("x_percent", self.x_percent),
            ("y_percent", self.y_percent),
            ("width_percent", self.width_percent),
            ("height_percent", self.height_percent),
        ];
        for (name, value) in parts {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DocsignError::invalid_geometry(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.x_percent + self.width_percent > 1.0 + POSITION_TOLERANCE {
            return Err(DocsignError::invalid_geometry(format!(
                "field extends past the right edge ({} + {})",
                self.x_percent, self.width_percent
            )));
        }
        if self.y_percent + self.height_percent > 1.0 + POSITION_TOLERANCE {
            return Err(DocsignError::invalid_geometry(format!(
                "field extends past the bottom edge ({} + {})",
                self.y_percent, self.height_percent
            )));
        }
        Ok(())
    }
}

/// Rectangle on the editing surface, in pixels, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

/// Size of one page of the target document, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page_number: u32,
    pub width_units: f64,
    pub height_units: f64,
    /// Lower-left corner of the MediaBox
    #[serde(default)]
    pub origin_x: f64,
    #[serde(default)]
    pub origin_y: f64,
}

impl PageGeometry {
    pub fn new(page_number: u32, width_units: f64, height_units: f64) -> Self {
        Self {
            page_number,
            width_units,
            height_units,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }

    pub fn with_origin(mut self, origin_x: f64, origin_y: f64) -> Self {
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        self
    }

    pub fn letter(page_number: u32) -> Self {
        Self::new(page_number, 612.0, 792.0)
    }

    pub fn a4(page_number: u32) -> Self {
        Self::new(page_number, 595.0, 842.0)
    }
}

/// Rectangle in target-document units, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl TargetRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn shorter_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Signature,
    Text,
    Date,
    Checkbox,
    Radio,
    Image,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Signature => "signature",
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Image => "image",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = DocsignError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "signature" => Ok(FieldType::Signature),
            "text" => Ok(FieldType::Text),
            "date" => Ok(FieldType::Date),
            "checkbox" => Ok(FieldType::Checkbox),
            "radio" => Ok(FieldType::Radio),
            "image" => Ok(FieldType::Image),
            other => Err(DocsignError::Serialization(format!(
                "unknown field type: {}",
                other
            ))),
        }
    }
}

/// Value captured for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Raw PNG or JPEG bytes
    Image(Vec<u8>),
    Text(String),
    Date(NaiveDate),
    Bool(bool),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Image(_) => "image",
            FieldValue::Text(_) => "text",
            FieldValue::Date(_) => "date",
            FieldValue::Bool(_) => "bool",
        }
    }

    /// Whether a checkbox or radio with this value should be marked.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Text(s) => {
                let s = s.trim().to_lowercase();
                !s.is_empty() && !matches!(s.as_str(), "false" | "0" | "no" | "off")
            }
            FieldValue::Image(bytes) => !bytes.is_empty(),
            FieldValue::Date(_) => true,
        }
    }
}

/// A placed field owned by a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub field_type: FieldType,
    pub position: NormalizedPosition,
    #[serde(default)]
    pub value: Option<FieldValue>,
    #[serde(default)]
    pub required: bool,
}

impl Field {
    pub fn new(field_type: FieldType, position: NormalizedPosition) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            field_type,
            position,
            value: None,
            required: false,
        }
    }

    pub fn with_value(mut self, value: FieldValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn page_number(&self) -> u32 {
        self.position.page_number
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Lifecycle of a document going through signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Created,
    Draft,
    PendingSignature,
    Signed,
    Completed,
}

impl DocumentStatus {
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Created, Draft)
                | (Draft, PendingSignature)
                | (PendingSignature, PendingSignature)
                | (PendingSignature, Signed)
                | (Signed, Completed)
        )
    }

    /// Fields may only be placed, moved or removed before signing.
    pub fn accepts_field_edits(self) -> bool {
        matches!(
            self,
            DocumentStatus::Draft | DocumentStatus::PendingSignature
        )
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Created => write!(f, "created"),
            DocumentStatus::Draft => write!(f, "draft"),
            DocumentStatus::PendingSignature => write!(f, "pending_signature"),
            DocumentStatus::Signed => write!(f, "signed"),
            DocumentStatus::Completed => write!(f, "completed"),
        }
    }
}
