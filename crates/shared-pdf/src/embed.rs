//! Per-field-type rendering onto a page canvas

use std::fmt::Write;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use shared_types::{DocsignError, Field, FieldType, FieldValue, Result, TargetRect};

use crate::asset::{decode_data_url, RasterImage};
use crate::canvas::{DrawOp, PageCanvas};
use crate::fit::fit;

/// Text is sized to this share of the field height, up to the cap
pub const TEXT_HEIGHT_RATIO: f64 = 0.7;
/// Check mark side as a share of the field's shorter side
pub const CHECK_MARK_RATIO: f64 = 0.6;
/// Radio dot radius as a share of the field's shorter side
pub const RADIO_RADIUS_RATIO: f64 = 0.3;

/// Tunables for text rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedStyle {
    #[serde(default = "default_font_size_cap")]
    pub font_size_cap: f64,
    /// Left padding between the field edge and the text, in points
    #[serde(default = "default_text_inset")]
    pub text_inset: f64,
    /// chrono pattern used to render date values
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_font_size_cap() -> f64 {
    14.0
}

fn default_text_inset() -> f64 {
    2.0
}

fn default_date_format() -> String {
    "%m/%d/%Y".to_string()
}

impl Default for EmbedStyle {
    fn default() -> Self {
        Self {
            font_size_cap: default_font_size_cap(),
            text_inset: default_text_inset(),
            date_format: default_date_format(),
        }
    }
}

/// Draw one field into `canvas` at `rect` (PDF units, lower-left anchored).
///
/// Fields without a value, unchecked checkboxes and unselected radios leave
/// the canvas untouched.
pub fn embed(
    canvas: PageCanvas,
    field: &Field,
    rect: TargetRect,
    style: &EmbedStyle,
) -> Result<PageCanvas> {
    let Some(value) = &field.value else {
        return Ok(canvas);
    };

    tracing::debug!(
        field_id = %field.id,
        field_type = %field.field_type,
        page = canvas.page_number(),
        "embedding field"
    );

    match (field.field_type, value) {
        (FieldType::Signature | FieldType::Image, FieldValue::Image(bytes)) => {
            draw_image(canvas, bytes, rect)
        }
        // Signature pads hand over the drawing as a data URL
        (FieldType::Signature | FieldType::Image, FieldValue::Text(text))
            if text.trim_start().starts_with("data:") =>
        {
            draw_image(canvas, &decode_data_url(text.trim())?, rect)
        }
        // Typed signature
        (FieldType::Signature, FieldValue::Text(text)) => draw_text(canvas, text, rect, style),
        (FieldType::Text, FieldValue::Text(text)) => draw_text(canvas, text, rect, style),
        (FieldType::Text | FieldType::Date, FieldValue::Date(date)) => {
            let text = format_date(*date, &style.date_format)?;
            draw_text(canvas, &text, rect, style)
        }
        (FieldType::Date, FieldValue::Text(raw)) => {
            let text = match parse_date(raw) {
                Some(date) => format_date(date, &style.date_format)?,
                None => raw.clone(),
            };
            draw_text(canvas, &text, rect, style)
        }
        (FieldType::Checkbox, value) => {
            if !value.is_truthy() {
                return Ok(canvas);
            }
            draw_check_mark(canvas, rect)
        }
        (FieldType::Radio, value) => {
            if !value.is_truthy() {
                return Ok(canvas);
            }
            draw_radio_dot(canvas, rect)
        }
        (field_type, value) => Err(DocsignError::ValueTypeMismatch {
            field_type,
            value_kind: value.kind(),
        }),
    }
}

fn require_area(rect: &TargetRect) -> Result<()> {
    if !(rect.width > 0.0 && rect.height > 0.0) {
        return Err(DocsignError::invalid_geometry(format!(
            "field rectangle has no area ({}x{})",
            rect.width, rect.height
        )));
    }
    Ok(())
}

fn draw_image(canvas: PageCanvas, bytes: &[u8], rect: TargetRect) -> Result<PageCanvas> {
    require_area(&rect)?;
    let image = RasterImage::decode(bytes)?;
    let fitted = fit(
        image.width as f64,
        image.height as f64,
        rect.width,
        rect.height,
    )?;
    let placed = TargetRect::new(
        rect.x + fitted.offset_x,
        rect.y + fitted.offset_y,
        fitted.width,
        fitted.height,
    );
    Ok(canvas.push(DrawOp::Image {
        rect: placed,
        image,
    }))
}

fn draw_text(
    canvas: PageCanvas,
    text: &str,
    rect: TargetRect,
    style: &EmbedStyle,
) -> Result<PageCanvas> {
    if text.trim().is_empty() {
        return Ok(canvas);
    }
    require_area(&rect)?;
    let font_size = (rect.height * TEXT_HEIGHT_RATIO).min(style.font_size_cap);
    Ok(canvas.push(DrawOp::Text {
        x: rect.x + style.text_inset,
        y: rect.y + (rect.height - font_size) / 2.0,
        font_size,
        text: text.to_string(),
        clip: rect,
    }))
}

fn draw_check_mark(canvas: PageCanvas, rect: TargetRect) -> Result<PageCanvas> {
    require_area(&rect)?;
    let side = rect.shorter_side() * CHECK_MARK_RATIO;
    let (cx, cy) = rect.center();
    Ok(canvas.push(DrawOp::CheckMark {
        rect: TargetRect::new(cx - side / 2.0, cy - side / 2.0, side, side),
    }))
}

fn draw_radio_dot(canvas: PageCanvas, rect: TargetRect) -> Result<PageCanvas> {
    require_area(&rect)?;
    let (cx, cy) = rect.center();
    Ok(canvas.push(DrawOp::Dot {
        cx,
        cy,
        radius: rect.shorter_side() * RADIO_RADIUS_RATIO,
    }))
}

/// Render a date with a fixed pattern, independent of the host locale
pub fn format_date(date: NaiveDate, pattern: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(pattern))
        .map_err(|_| DocsignError::Serialization(format!("invalid date format: {}", pattern)))?;
    Ok(out)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::test_images::png;
    use pretty_assertions::assert_eq;
    use shared_types::NormalizedPosition;

    fn field(field_type: FieldType, value: Option<FieldValue>) -> Field {
        let mut f = Field::new(field_type, NormalizedPosition::new(1, 0.1, 0.1, 0.2, 0.1));
        f.value = value;
        f
    }

    fn rect() -> TargetRect {
        TargetRect::new(100.0, 200.0, 120.0, 40.0)
    }

    fn run(f: &Field) -> Result<PageCanvas> {
        embed(PageCanvas::new(1), f, rect(), &EmbedStyle::default())
    }

    #[test]
    fn test_unvalued_field_skipped() {
        for ty in [
            FieldType::Signature,
            FieldType::Text,
            FieldType::Date,
            FieldType::Checkbox,
            FieldType::Radio,
            FieldType::Image,
        ] {
            assert_eq!(run(&field(ty, None)).unwrap().draw_count(), 0);
        }
    }

    #[test]
    fn test_falsy_marks_draw_nothing() {
        for ty in [FieldType::Checkbox, FieldType::Radio] {
            for value in [
                FieldValue::Bool(false),
                FieldValue::Text("off".into()),
                FieldValue::Text(String::new()),
            ] {
                let canvas = run(&field(ty, Some(value))).unwrap();
                assert_eq!(canvas.draw_count(), 0, "{:?}", ty);
            }
        }
    }

    #[test]
    fn test_checkbox_mark_is_centered() {
        let canvas = run(&field(FieldType::Checkbox, Some(FieldValue::Bool(true)))).unwrap();
        match &canvas.ops()[0] {
            DrawOp::CheckMark { rect: mark } => {
                assert!((mark.width - 24.0).abs() < 1e-9);
                assert!((mark.height - 24.0).abs() < 1e-9);
                assert!((mark.x - 148.0).abs() < 1e-9);
                assert!((mark.y - 208.0).abs() < 1e-9);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_radio_dot_radius() {
        let canvas = run(&field(FieldType::Radio, Some(FieldValue::Bool(true)))).unwrap();
        assert_eq!(canvas.draw_count(), 1);
        match &canvas.ops()[0] {
            DrawOp::Dot { cx, cy, radius } => {
                assert_eq!((*cx, *cy), (160.0, 220.0));
                assert!((radius - 12.0).abs() < 1e-9);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_text_font_size_capped_and_centered() {
        let canvas = run(&field(FieldType::Text, Some(FieldValue::Text("Hi".into())))).unwrap();
        match &canvas.ops()[0] {
            DrawOp::Text {
                x, y, font_size, ..
            } => {
                // 40 * 0.7 = 28, capped at 14
                assert_eq!(*font_size, 14.0);
                assert_eq!(*x, 102.0);
                assert_eq!(*y, 200.0 + (40.0 - 14.0) / 2.0);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_small_text_uses_ratio() {
        let f = field(FieldType::Text, Some(FieldValue::Text("Hi".into())));
        let small = TargetRect::new(0.0, 0.0, 50.0, 10.0);
        let canvas = embed(PageCanvas::new(1), &f, small, &EmbedStyle::default()).unwrap();
        match &canvas.ops()[0] {
            DrawOp::Text { font_size, .. } => assert!((font_size - 7.0).abs() < 1e-9),
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_signature_data_url_drawn_as_image() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(png(30, 10, 255));
        let url = format!("data:image/png;base64,{}", encoded);

        for ty in [FieldType::Signature, FieldType::Image] {
            let canvas = run(&field(ty, Some(FieldValue::Text(url.clone())))).unwrap();
            assert_eq!(canvas.draw_count(), 1);
            assert!(!canvas.has_text());
            match &canvas.ops()[0] {
                DrawOp::Image { rect: placed, image } => {
                    assert_eq!((image.width, image.height), (30, 10));
                    // 3:1 asset in a 120x40 box fills it exactly
                    assert!((placed.width - 120.0).abs() < 1e-9);
                    assert!((placed.height - 40.0).abs() < 1e-9);
                }
                other => panic!("unexpected op: {other:?}"),
            }
        }
    }

    #[test]
    fn test_bad_data_url_rejected() {
        for url in ["data:image/png;base64,!!!", "data:image/svg+xml,<svg/>"] {
            let err = run(&field(
                FieldType::Signature,
                Some(FieldValue::Text(url.to_string())),
            ))
            .unwrap_err();
            assert!(matches!(err, DocsignError::UnsupportedAssetFormat(_)));
        }
    }

    #[test]
    fn test_date_formatting() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let canvas = run(&field(FieldType::Date, Some(FieldValue::Date(date)))).unwrap();
        match &canvas.ops()[0] {
            DrawOp::Text { text, .. } => assert_eq!(text, "03/09/2024"),
            other => panic!("unexpected op: {other:?}"),
        }

        let canvas = run(&field(
            FieldType::Date,
            Some(FieldValue::Text("2024-12-25T10:00:00Z".into())),
        ))
        .unwrap();
        match &canvas.ops()[0] {
            DrawOp::Text { text, .. } => assert_eq!(text, "12/25/2024"),
            other => panic!("unexpected op: {other:?}"),
        }

        let canvas = run(&field(
            FieldType::Date,
            Some(FieldValue::Text("next Tuesday".into())),
        ))
        .unwrap();
        match &canvas.ops()[0] {
            DrawOp::Text { text, .. } => assert_eq!(text, "next Tuesday"),
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_signature_image_is_fitted() {
        // 3:1 asset into a 120x40 box fills it exactly
        let f = field(FieldType::Signature, Some(FieldValue::Image(png(300, 100, 255))));
        let canvas = run(&f).unwrap();
        match &canvas.ops()[0] {
            DrawOp::Image { rect: placed, image } => {
                assert_eq!((image.width, image.height), (300, 100));
                assert!((placed.width - 120.0).abs() < 1e-9);
                assert!((placed.height - 40.0).abs() < 1e-9);
                assert!((placed.x - 100.0).abs() < 1e-9);
                assert!((placed.y - 200.0).abs() < 1e-9);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_typed_signature_renders_text() {
        let f = field(FieldType::Signature, Some(FieldValue::Text("Jane Doe".into())));
        let canvas = run(&f).unwrap();
        assert!(canvas.has_text());
    }

    #[test]
    fn test_bad_image_rejected() {
        let f = field(FieldType::Image, Some(FieldValue::Image(b"nope".to_vec())));
        assert!(matches!(
            run(&f),
            Err(DocsignError::UnsupportedAssetFormat(_))
        ));
    }

    #[test]
    fn test_value_type_mismatch() {
        let f = field(FieldType::Image, Some(FieldValue::Bool(true)));
        assert_eq!(
            run(&f).unwrap_err(),
            DocsignError::ValueTypeMismatch {
                field_type: FieldType::Image,
                value_kind: "bool"
            }
        );
    }

    #[test]
    fn test_invalid_date_pattern_is_an_error() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert!(format_date(date, "%Q").is_err());
    }
}
