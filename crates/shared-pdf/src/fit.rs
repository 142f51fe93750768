//! Aspect-preserving fit of an asset inside a box

use serde::{Deserialize, Serialize};
use shared_types::{DocsignError, Result};

/// Size of the fitted asset and its offset from the box's lower-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fit {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Largest centered rectangle inside the box with the asset's aspect ratio
pub fn fit(asset_width: f64, asset_height: f64, box_width: f64, box_height: f64) -> Result<Fit> {
    for (name, value) in [
        ("asset width", asset_width),
        ("asset height", asset_height),
        ("box width", box_width),
        ("box height", box_height),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(DocsignError::invalid_geometry(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
    }

    let asset_ratio = asset_width / asset_height;
    let box_ratio = box_width / box_height;

    let (width, height) = if asset_ratio > box_ratio {
        (box_width, box_width / asset_ratio)
    } else {
        (box_height * asset_ratio, box_height)
    };

    Ok(Fit {
        width,
        height,
        offset_x: (box_width - width) / 2.0,
        offset_y: (box_height - height) / 2.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_ratio_fills_box() {
        let f = fit(300.0, 100.0, 178.5, 59.5).unwrap();
        assert!((f.width - 178.5).abs() < 1e-9);
        assert!((f.height - 59.5).abs() < 1e-9);
        assert!(f.offset_x.abs() < 1e-9);
        assert!(f.offset_y.abs() < 1e-9);
    }

    #[test]
    fn test_wide_asset_is_width_constrained() {
        let f = fit(400.0, 100.0, 100.0, 100.0).unwrap();
        assert_eq!(f.width, 100.0);
        assert_eq!(f.height, 25.0);
        assert_eq!(f.offset_x, 0.0);
        assert_eq!(f.offset_y, 37.5);
    }

    #[test]
    fn test_tall_asset_is_height_constrained() {
        let f = fit(50.0, 200.0, 100.0, 100.0).unwrap();
        assert_eq!(f.height, 100.0);
        assert_eq!(f.width, 25.0);
        assert_eq!(f.offset_x, 37.5);
        assert_eq!(f.offset_y, 0.0);
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        assert!(fit(100.0, 0.0, 10.0, 10.0).is_err());
        assert!(fit(100.0, 10.0, 10.0, 0.0).is_err());
        assert!(fit(0.0, 10.0, 10.0, 10.0).is_err());
        assert!(fit(100.0, 10.0, f64::NAN, 10.0).is_err());
    }
}
