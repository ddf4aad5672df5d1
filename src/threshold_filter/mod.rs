//! Threshold filters.
//!
//! A threshold filter decides the cutoff each pixel's (error-adjusted)
//! intensity is compared against. Output is 255 when the intensity is strictly
//! above the threshold, else 0.
//!
//! # Module Structure
//! - `matrix`: tiled threshold matrix (ordered dither, plain threshold)
//! - `dynamic`: matrix and noise chosen per intensity range
//! - `spot`: spot function evaluated per pixel, or precomputed into a filtered map

pub mod dynamic;
pub mod matrix;
pub mod spot;

pub use dynamic::{DynamicMatrixThresholdFilter, ThresholdMatrixRecord};
pub use matrix::MatrixThresholdFilter;
pub use spot::{ImageThresholdFilter, SpotFunctionThresholdFilter};

use crate::error::Result;
use crate::matrix::ThresholdMatrix;
use crate::module::{Module, RunInfo};

/// Bi-level quantization against a threshold.
#[inline]
pub fn quantize_against(intensity: f32, threshold: f32) -> u8 {
    if intensity > threshold {
        255
    } else {
        0
    }
}

#[derive(Debug, Clone)]
pub enum ThresholdFilter {
    Matrix(MatrixThresholdFilter),
    DynamicMatrix(DynamicMatrixThresholdFilter),
    SpotFunction(SpotFunctionThresholdFilter),
    Image(ImageThresholdFilter),
}

impl ThresholdFilter {
    pub fn default_matrix() -> Self {
        ThresholdFilter::Matrix(MatrixThresholdFilter::new(ThresholdMatrix::constant(128)))
    }

    pub fn default_dynamic() -> Self {
        ThresholdFilter::DynamicMatrix(DynamicMatrixThresholdFilter::default())
    }

    pub fn default_spot() -> Self {
        ThresholdFilter::SpotFunction(SpotFunctionThresholdFilter::default())
    }

    pub fn default_image() -> Self {
        ThresholdFilter::Image(ImageThresholdFilter::default())
    }

    /// Threshold for a pixel of the given intensity at (x, y).
    #[inline]
    pub fn threshold(&mut self, intensity: f32, x: usize, y: usize) -> f32 {
        match self {
            ThresholdFilter::Matrix(f) => f.threshold(x, y),
            ThresholdFilter::DynamicMatrix(f) => f.threshold(intensity, x, y),
            ThresholdFilter::SpotFunction(f) => f.threshold(x, y),
            ThresholdFilter::Image(f) => f.threshold(x, y),
        }
    }

    /// 0 or 255 for the pixel at (x, y).
    #[inline]
    pub fn quantize(&mut self, intensity: f32, x: usize, y: usize) -> u8 {
        let threshold = self.threshold(intensity, x, y);
        quantize_against(intensity, threshold)
    }

    fn as_module(&self) -> &dyn Module {
        match self {
            ThresholdFilter::Matrix(f) => f,
            ThresholdFilter::DynamicMatrix(f) => f,
            ThresholdFilter::SpotFunction(f) => f,
            ThresholdFilter::Image(f) => f,
        }
    }
}

impl Module for ThresholdFilter {
    fn name(&self) -> &'static str {
        self.as_module().name()
    }

    fn description(&self) -> &'static str {
        self.as_module().description()
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        match self {
            ThresholdFilter::Matrix(f) => f.init(run),
            ThresholdFilter::DynamicMatrix(f) => f.init(run),
            ThresholdFilter::SpotFunction(f) => f.init(run),
            ThresholdFilter::Image(f) => f.init(run),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanKind;

    #[test]
    fn test_quantize_is_strictly_greater() {
        let mut f = ThresholdFilter::default_matrix();
        assert_eq!(f.quantize(128.0, 0, 0), 0);
        assert_eq!(f.quantize(128.5, 0, 0), 255);
        assert_eq!(f.quantize(0.0, 5, 5), 0);
        assert_eq!(f.quantize(255.0, 5, 5), 255);
    }

    #[test]
    fn test_every_default_initialises() {
        let run = RunInfo::new(6, 6, ScanKind::Serpentine).with_seed(Some(8));
        for mut f in [
            ThresholdFilter::default_matrix(),
            ThresholdFilter::default_dynamic(),
            ThresholdFilter::default_spot(),
            ThresholdFilter::default_image(),
        ] {
            f.init(&run).unwrap();
            assert!(!f.name().is_empty());
            // Full black and full white survive every filter
            assert_eq!(f.quantize(0.0, 2, 3), 0);
            assert_eq!(f.quantize(256.0, 2, 3), 255);
        }
    }
}
