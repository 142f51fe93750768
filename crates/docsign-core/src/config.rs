//! Signing configuration
//!
//! Loaded from TOML. Every key is optional:
//!
//! ```toml
//! enforce_required = true
//!
//! [style]
//! font_size_cap = 14.0
//! text_inset = 2.0
//! date_format = "%m/%d/%Y"
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared_pdf::EmbedStyle;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Text and date rendering
    #[serde(default)]
    pub style: EmbedStyle,
    /// Refuse to sign while a required field is empty
    #[serde(default = "default_enforce_required")]
    pub enforce_required: bool,
}

fn default_enforce_required() -> bool {
    true
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            style: EmbedStyle::default(),
            enforce_required: default_enforce_required(),
        }
    }
}

impl SigningConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or a value fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail later during signing
    pub fn validate(&self) -> anyhow::Result<()> {
        let style = &self.style;
        if !(style.font_size_cap.is_finite() && style.font_size_cap > 0.0) {
            anyhow::bail!("font_size_cap must be positive, got {}", style.font_size_cap);
        }
        if !(style.text_inset.is_finite() && style.text_inset >= 0.0) {
            anyhow::bail!("text_inset must not be negative, got {}", style.text_inset);
        }
        shared_pdf::format_date(chrono::NaiveDate::MIN, &style.date_format)
            .context("date_format is not a valid chrono pattern")?;
        Ok(())
    }
}
