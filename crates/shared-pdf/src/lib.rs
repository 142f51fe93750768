//! PDF placement and embedding for signing fields
//!
//! Converts normalized field positions to page space, fits signature
//! assets, collects drawing operations per page and writes them into the
//! document with lopdf.

pub mod asset;
pub mod canvas;
pub mod coords;
pub mod embed;
pub mod fit;
pub mod parser;
pub mod writer;

pub use asset::RasterImage;
pub use canvas::{DrawOp, PageCanvas};
pub use coords::{clamp, from_target_units, to_normalized, to_page_space, to_pixels, to_target_units};
pub use embed::{embed, format_date, EmbedStyle};
pub use fit::{fit, Fit};
pub use parser::{page_count, page_geometries};
pub use writer::write_canvases;
