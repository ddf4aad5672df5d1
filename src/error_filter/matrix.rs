/// Fixed-matrix error filters.
///
/// `MatrixErrorFilter` diffuses into a row buffer (scanline / serpentine
/// orders); `VectorErrorFilter` diffuses forward along a one-dimensional path
/// (space-filling curves) and only accepts single-row matrices.

use super::{attach_buffer, diffuse};
use crate::error::{HalftoneError, Result};
use crate::error_buffer::{BufferShape, ErrorBuffer};
use crate::matrix::ErrorMatrix;
use crate::module::{Module, RunInfo};

#[derive(Debug, Clone)]
pub struct MatrixErrorFilter {
    matrix: ErrorMatrix,
    pub(crate) buffer: Option<ErrorBuffer>,
}

impl MatrixErrorFilter {
    pub fn new(matrix: ErrorMatrix) -> Self {
        Self {
            matrix,
            buffer: None,
        }
    }

    pub fn matrix(&self) -> &ErrorMatrix {
        &self.matrix
    }

    /// Swap the matrix. Takes effect from the next `init`.
    pub fn set_matrix(&mut self, matrix: ErrorMatrix) {
        self.matrix = matrix;
        self.buffer = None;
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    #[inline]
    pub fn get_error(&self) -> f32 {
        self.buffer.as_ref().map_or(0.0, |b| b.get_error())
    }

    #[inline]
    pub fn set_error(&mut self, error: f32, _source: f32) {
        if let Some(buffer) = self.buffer.as_mut() {
            diffuse(buffer, &self.matrix, error);
        }
    }

    #[inline]
    pub fn move_next(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.move_next();
        }
    }
}

impl Module for MatrixErrorFilter {
    fn name(&self) -> &'static str {
        "Matrix error filter"
    }

    fn description(&self) -> &'static str {
        "Diffuses error with a single error matrix over image rows"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        self.buffer = attach_buffer(
            run,
            self.matrix.height(),
            self.matrix.width(),
            BufferShape::Matrix,
            self.name(),
        );
        Ok(())
    }
}

// ============================================================================
// Vector filter
// ============================================================================

#[derive(Debug, Clone)]
pub struct VectorErrorFilter {
    matrix: ErrorMatrix,
    buffer: Option<ErrorBuffer>,
}

impl VectorErrorFilter {
    /// Fails unless `matrix` has exactly one row.
    pub fn new(matrix: ErrorMatrix) -> Result<Self> {
        if matrix.height() != 1 {
            return Err(HalftoneError::NotAVector(matrix.height()));
        }
        Ok(Self {
            matrix,
            buffer: None,
        })
    }

    /// All error goes to the next pixel on the path.
    pub fn forward() -> Self {
        Self {
            matrix: ErrorMatrix::vector_forward(),
            buffer: None,
        }
    }

    pub fn matrix(&self) -> &ErrorMatrix {
        &self.matrix
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    #[inline]
    pub fn get_error(&self) -> f32 {
        self.buffer.as_ref().map_or(0.0, |b| b.get_error())
    }

    #[inline]
    pub fn set_error(&mut self, error: f32, _source: f32) {
        if let Some(buffer) = self.buffer.as_mut() {
            diffuse(buffer, &self.matrix, error);
        }
    }

    #[inline]
    pub fn move_next(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.move_next();
        }
    }
}

impl Module for VectorErrorFilter {
    fn name(&self) -> &'static str {
        "Vector error filter"
    }

    fn description(&self) -> &'static str {
        "Diffuses error forward along a space-filling curve"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        self.buffer = attach_buffer(
            run,
            1,
            self.matrix.width(),
            BufferShape::Vector,
            self.name(),
        );
        Ok(())
    }
}
