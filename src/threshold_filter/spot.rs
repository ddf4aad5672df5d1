/// Threshold filters driven by a spot function.
///
/// `SpotFunctionThresholdFilter` evaluates the function for every pixel.
/// `ImageThresholdFilter` renders the function into a full-size map once per
/// run, runs the configured post-processing chain over it, and then only reads
/// the map.

use crate::error::{HalftoneError, Result};
use crate::image_filter::{apply_chain, ImageFilter};
use crate::module::{Module, RunInfo};
use crate::spot_function::SpotFunction;

const RNG_SALT: u64 = 0x696d_6167;

#[derive(Debug, Clone, Default)]
pub struct SpotFunctionThresholdFilter {
    spot: SpotFunction,
}

impl SpotFunctionThresholdFilter {
    pub fn new(spot: SpotFunction) -> Self {
        Self { spot }
    }

    pub fn spot_function(&self) -> &SpotFunction {
        &self.spot
    }

    pub fn spot_function_mut(&mut self) -> &mut SpotFunction {
        &mut self.spot
    }

    #[inline]
    pub fn threshold(&self, x: usize, y: usize) -> f32 {
        self.spot.threshold(x, y)
    }
}

impl Module for SpotFunctionThresholdFilter {
    fn name(&self) -> &'static str {
        "Spot function threshold filter"
    }

    fn description(&self) -> &'static str {
        "Computes thresholds directly from a periodic spot function"
    }

    fn init(&mut self, _run: &RunInfo) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Precomputed threshold map
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ImageThresholdFilter {
    spot: SpotFunction,
    filters: Vec<ImageFilter>,
    map: Vec<f32>,
    width: usize,
    height: usize,
}

impl ImageThresholdFilter {
    pub fn new(spot: SpotFunction, filters: Vec<ImageFilter>) -> Self {
        Self {
            spot,
            filters,
            map: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    pub fn spot_function(&self) -> &SpotFunction {
        &self.spot
    }

    pub fn filters(&self) -> &[ImageFilter] {
        &self.filters
    }

    /// Threshold map of the last run, row-major.
    pub fn map(&self) -> &[f32] {
        &self.map
    }

    /// Map lookup. Before `init`, or outside the run's dimensions, falls back
    /// to the unfiltered spot function.
    #[inline]
    pub fn threshold(&self, x: usize, y: usize) -> f32 {
        if x < self.width && y < self.height {
            self.map[y * self.width + x]
        } else {
            self.spot.threshold(x, y)
        }
    }
}

impl Module for ImageThresholdFilter {
    fn name(&self) -> &'static str {
        "Image threshold filter"
    }

    fn description(&self) -> &'static str {
        "Precomputes a filtered threshold map from a spot function"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        if run.width == 0 || run.height == 0 {
            return Err(HalftoneError::EmptyImage);
        }
        let (width, height) = (run.width, run.height);
        let len = width
            .checked_mul(height)
            .ok_or(HalftoneError::ImageTooLarge { width, height })?;
        let mut map = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                map.push(self.spot.threshold(x, y));
            }
        }
        let mut rng = run.rng(RNG_SALT);
        apply_chain(&self.filters, &mut map, width, height, &mut rng);
        log::debug!(
            "{}: {}x{} map, {} filter(s)",
            self.name(),
            width,
            height,
            self.filters.len()
        );
        self.map = map;
        self.width = width;
        self.height = height;
        Ok(())
    }
}
