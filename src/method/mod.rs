//! Halftoning methods: the per-run orchestration over an image.
//!
//! - `threshold`: pixel-by-pixel thresholding with optional error diffusion
//! - `sfc_clustering`: cell clustering along a Hilbert curve

pub mod sfc_clustering;
pub mod threshold;

pub use sfc_clustering::SFCClusteringMethod;
pub use threshold::ThresholdHalftoneMethod;

use crate::buffer::Image;
use crate::error::Result;
use crate::module::{Module, RunInfo};

#[derive(Debug, Clone)]
pub enum HalftoneMethod {
    Threshold(ThresholdHalftoneMethod),
    SfcClustering(SFCClusteringMethod),
}

impl HalftoneMethod {
    /// Halftone `image` in place.
    pub fn run<I: Image>(&mut self, image: &mut I) -> Result<()> {
        match self {
            HalftoneMethod::Threshold(m) => m.run(image),
            HalftoneMethod::SfcClustering(m) => m.run(image),
        }
    }

    pub fn set_seed(&mut self, seed: Option<u64>) {
        match self {
            HalftoneMethod::Threshold(m) => m.seed = seed,
            HalftoneMethod::SfcClustering(m) => m.seed = seed,
        }
    }

    fn as_module(&self) -> &dyn Module {
        match self {
            HalftoneMethod::Threshold(m) => m,
            HalftoneMethod::SfcClustering(m) => m,
        }
    }
}

impl Module for HalftoneMethod {
    fn name(&self) -> &'static str {
        self.as_module().name()
    }

    fn description(&self) -> &'static str {
        self.as_module().description()
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        match self {
            HalftoneMethod::Threshold(m) => m.init(run),
            HalftoneMethod::SfcClustering(m) => m.init(run),
        }
    }
}
