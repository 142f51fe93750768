//! Coordinate transformation between the editing surface and PDF user space
//!
//! The editor works in pixels with a top-left origin, and stores placements
//! as fractions of the page. PDF user space is measured in points from the
//! bottom-left corner with Y increasing upward, and positions boxes by their
//! lower-left corner.

use shared_types::{
    ContainerSize, DocsignError, NormalizedPosition, PageGeometry, PixelRect, Result, TargetRect,
};

fn require_positive(what: &str, width: f64, height: f64) -> Result<()> {
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(DocsignError::invalid_geometry(format!(
            "{} must have positive dimensions, got {}x{}",
            what, width, height
        )));
    }
    Ok(())
}

/// Convert a pixel rectangle on the editing surface to page fractions
pub fn to_normalized(
    rect: PixelRect,
    container: ContainerSize,
    page_number: u32,
) -> Result<NormalizedPosition> {
    require_positive("container", container.width, container.height)?;
    Ok(NormalizedPosition {
        page_number,
        x_percent: rect.x / container.width,
        y_percent: rect.y / container.height,
        width_percent: rect.width / container.width,
        height_percent: rect.height / container.height,
    })
}

/// Convert page fractions back to pixels. Both spaces share the top-left
/// origin, so there is no axis flip.
pub fn to_pixels(position: &NormalizedPosition, container: ContainerSize) -> PixelRect {
    PixelRect {
        x: position.x_percent * container.width,
        y: position.y_percent * container.height,
        width: position.width_percent * container.width,
        height: position.height_percent * container.height,
    }
}

/// Convert page fractions to a PDF rectangle anchored at its lower-left corner
pub fn to_target_units(
    position: &NormalizedPosition,
    page_width: f64,
    page_height: f64,
) -> Result<TargetRect> {
    require_positive("page", page_width, page_height)?;
    position.validate()?;

    let height = position.height_percent * page_height;
    // Flip Y, then drop by the box height to reach the lower-left corner
    let y = page_height - (position.y_percent * page_height) - height;

    Ok(TargetRect {
        x: position.x_percent * page_width,
        y,
        width: position.width_percent * page_width,
        height,
    })
}

/// Like [`to_target_units`], offset by the page's MediaBox origin
pub fn to_page_space(position: &NormalizedPosition, page: &PageGeometry) -> Result<TargetRect> {
    let rect = to_target_units(position, page.width_units, page.height_units)?;
    Ok(rect.translate(page.origin_x, page.origin_y))
}

/// Convert a PDF rectangle back to page fractions (for overlaying existing
/// content in the editor)
pub fn from_target_units(
    rect: &TargetRect,
    page_width: f64,
    page_height: f64,
    page_number: u32,
) -> Result<NormalizedPosition> {
    require_positive("page", page_width, page_height)?;
    let top = page_height - (rect.y + rect.height);
    Ok(NormalizedPosition {
        page_number,
        x_percent: rect.x / page_width,
        y_percent: top / page_height,
        width_percent: rect.width / page_width,
        height_percent: rect.height / page_height,
    })
}

/// Re-project a position onto its page.
///
/// Size is capped first; a size of 1 or more pins the offset to 0. The offset
/// is then kept on the page and the size reduced to whatever room is left, so
/// the box shrinks rather than slides when it hangs over an edge.
pub fn clamp(position: &NormalizedPosition) -> NormalizedPosition {
    let (x_percent, width_percent) = clamp_axis(position.x_percent, position.width_percent);
    let (y_percent, height_percent) = clamp_axis(position.y_percent, position.height_percent);
    NormalizedPosition {
        page_number: position.page_number,
        x_percent,
        y_percent,
        width_percent,
        height_percent,
    }
}

fn clamp_axis(offset: f64, size: f64) -> (f64, f64) {
    let size = finite_or_zero(size).clamp(0.0, 1.0);
    let offset = if size >= 1.0 {
        0.0
    } else {
        finite_or_zero(offset).clamp(0.0, 1.0)
    };
    (offset, size.min(1.0 - offset))
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
