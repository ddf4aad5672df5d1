/// Tiled threshold matrix filter.

use crate::error::Result;
use crate::matrix::ThresholdMatrix;
use crate::module::{Module, RunInfo};

#[derive(Debug, Clone, Default)]
pub struct MatrixThresholdFilter {
    matrix: ThresholdMatrix,
}

impl MatrixThresholdFilter {
    pub fn new(matrix: ThresholdMatrix) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &ThresholdMatrix {
        &self.matrix
    }

    pub fn set_matrix(&mut self, matrix: ThresholdMatrix) {
        self.matrix = matrix;
    }

    #[inline]
    pub fn threshold(&self, x: usize, y: usize) -> f32 {
        self.matrix.threshold(x, y)
    }
}

impl Module for MatrixThresholdFilter {
    fn name(&self) -> &'static str {
        "Matrix threshold filter"
    }

    fn description(&self) -> &'static str {
        "Compares each pixel against a threshold matrix tiled over the image"
    }

    fn init(&mut self, _run: &RunInfo) -> Result<()> {
        Ok(())
    }
}
