//! Per-page accumulator of drawing instructions
//!
//! The embedding pass folds fields into a `PageCanvas` by value; the writer
//! turns the finished canvases into content streams.

use std::fmt::Write;

use shared_types::TargetRect;

use crate::asset::RasterImage;

/// Control-point distance for approximating a quarter circle with a Bézier
const KAPPA: f64 = 0.552_284_749_8;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Image placed at `rect`, already fitted to keep its aspect ratio
    Image { rect: TargetRect, image: RasterImage },
    /// A single line of Helvetica, clipped to `clip`
    Text {
        x: f64,
        y: f64,
        font_size: f64,
        text: String,
        clip: TargetRect,
    },
    /// Check mark inside the square `rect`
    CheckMark { rect: TargetRect },
    /// Filled circle
    Dot { cx: f64, cy: f64, radius: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageCanvas {
    page_number: u32,
    ops: Vec<DrawOp>,
}

impl PageCanvas {
    pub fn new(page_number: u32) -> Self {
        Self {
            page_number,
            ops: Vec::new(),
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn draw_count(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push(mut self, op: DrawOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn images(&self) -> impl Iterator<Item = &RasterImage> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Image { image, .. } => Some(image),
            _ => None,
        })
    }

    pub fn has_text(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, DrawOp::Text { .. }))
    }
}

/// Format a number for a content stream (no exponent, trimmed zeros)
pub(crate) fn num(v: f64) -> String {
    let v = if v.abs() < 1e-9 { 0.0 } else { v };
    let s = format!("{:.4}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Escape special characters for PDF string literals
pub(crate) fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            '\r' | '\n' | '\t' => " ".to_string(),
            _ if c.is_ascii() && !c.is_ascii_control() => c.to_string(),
            _ => "?".to_string(), // Replace non-ASCII with ?
        })
        .collect()
}

/// Render one operation as content stream operators.
///
/// `image_name` resolves an image to the resource name the writer gave it,
/// `font_name` is the resource name of the Helvetica font.
pub(crate) fn render_op(
    op: &DrawOp,
    out: &mut String,
    image_name: &dyn Fn(&RasterImage) -> String,
    font_name: &str,
) -> std::fmt::Result {
    match op {
        DrawOp::Image { rect, image } => writeln!(
            out,
            "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ",
            num(rect.width),
            num(rect.height),
            num(rect.x),
            num(rect.y),
            image_name(image)
        ),
        DrawOp::Text {
            x,
            y,
            font_size,
            text,
            clip,
        } => writeln!(
            out,
            "q\n{} {} {} {} re W n\n0 0 0 rg\nBT\n/{} {} Tf\n{} {} Td\n({}) Tj\nET\nQ",
            num(clip.x),
            num(clip.y),
            num(clip.width),
            num(clip.height),
            font_name,
            num(*font_size),
            num(*x),
            num(*y),
            escape_pdf_string(text)
        ),
        DrawOp::CheckMark { rect } => {
            let s = rect.width;
            writeln!(
                out,
                "q\n0 0 0 RG\n{} w\n1 J\n1 j\n{} {} m\n{} {} l\n{} {} l\nS\nQ",
                num((s * 0.12).max(0.5)),
                num(rect.x + s * 0.15),
                num(rect.y + s * 0.5),
                num(rect.x + s * 0.4),
                num(rect.y + s * 0.2),
                num(rect.x + s * 0.85),
                num(rect.y + s * 0.85),
            )
        }
        DrawOp::Dot { cx, cy, radius } => {
            let r = *radius;
            let k = r * KAPPA;
            writeln!(
                out,
                "q\n0 0 0 rg\n{} {} m\n\
{} {} {} {} {} {} c\n\
{} {} {} {} {} {} c\n\
{} {} {} {} {} {} c\n\
{} {} {} {} {} {} c\n\
f\nQ",
                num(cx + r),
                num(*cy),
                // top-right quarter
                num(cx + r),
                num(cy + k),
                num(cx + k),
                num(cy + r),
                num(*cx),
                num(cy + r),
                // top-left
                num(cx - k),
                num(cy + r),
                num(cx - r),
                num(cy + k),
                num(cx - r),
                num(*cy),
                // bottom-left
                num(cx - r),
                num(cy - k),
                num(cx - k),
                num(cy - r),
                num(*cx),
                num(cy - r),
                // bottom-right
                num(cx + k),
                num(cy - r),
                num(cx + r),
                num(cy - k),
                num(cx + r),
                num(*cy),
            )
        }
    }
}
