//! The signing pass: embed every valued field into the document

use std::collections::BTreeMap;

use shared_pdf::{embed, to_page_space, write_canvases, PageCanvas};
use shared_types::{DocsignError, Field, PageGeometry, Result};
use tracing::instrument;

use crate::config::SigningConfig;

/// Embed all valued fields into `pdf_bytes` and return the new bytes.
///
/// Fields are drawn in the order given, each page collecting its own
/// operations. Any failure aborts the whole pass and nothing is returned.
#[instrument(skip_all, fields(bytes = pdf_bytes.len(), fields = fields.len()))]
pub fn sign_document(
    pdf_bytes: &[u8],
    geometries: &[PageGeometry],
    fields: &[Field],
    config: &SigningConfig,
) -> Result<Vec<u8>> {
    if config.enforce_required {
        if let Some(missing) = fields.iter().find(|f| f.required && !f.has_value()) {
            return Err(DocsignError::MissingRequiredValue(missing.id.clone()));
        }
    }

    let valued: Vec<&Field> = fields.iter().filter(|f| f.has_value()).collect();
    if valued.is_empty() {
        return Err(DocsignError::EmptyFieldSet);
    }

    let mut canvases: BTreeMap<u32, PageCanvas> = BTreeMap::new();
    for field in valued {
        let page = field.page_number();
        let geometry = geometries
            .iter()
            .find(|g| g.page_number == page)
            .ok_or(DocsignError::MissingPageGeometry { page })?;
        let rect = to_page_space(&field.position, geometry)?;

        let canvas = canvases
            .remove(&page)
            .unwrap_or_else(|| PageCanvas::new(page));
        canvases.insert(page, embed(canvas, field, rect, &config.style)?);
    }

    let canvases: Vec<PageCanvas> = canvases.into_values().collect();
    let draws: usize = canvases.iter().map(PageCanvas::draw_count).sum();
    let signed = write_canvases(pdf_bytes, &canvases)?;

    tracing::info!(
        pages = canvases.len(),
        draws,
        output_bytes = signed.len(),
        "signing pass complete"
    );
    Ok(signed)
}
