//! Error diffusion filters.
//!
//! An error filter owns an error buffer for the duration of a run and
//! distributes the quantization residual of each pixel to its not yet visited
//! neighbours.
//!
//! # Module Structure
//! - `matrix`: single error matrix over a 2-D buffer, and the 1-D vector variant
//! - `dynamic`: matrix chosen per pixel from an intensity-keyed table
//! - `perturbed`: pairwise coefficient noise that conserves the kernel sum
//! - `randomized`: fully regenerated coefficients every pixel

pub mod dynamic;
pub mod matrix;
pub mod perturbed;
pub mod randomized;

pub use dynamic::{DynamicMatrixErrorFilter, ErrorMatrixRecord};
pub use matrix::{MatrixErrorFilter, VectorErrorFilter};
pub use perturbed::{CoefficientGroup, PerturbedErrorFilter};
pub use randomized::RandomizedMatrixErrorFilter;

use crate::error::Result;
use crate::error_buffer::{BufferShape, ErrorBuffer};
use crate::matrix::{ErrorMatrix, Tap};
use crate::module::{Module, RunInfo};

/// Create the run's buffer and keep it only if it has the shape the filter
/// diffuses into. A mismatch disables diffusion for the run.
pub(crate) fn attach_buffer(
    run: &RunInfo,
    matrix_height: usize,
    matrix_width: usize,
    wanted: BufferShape,
    filter: &str,
) -> Option<ErrorBuffer> {
    let buffer = ErrorBuffer::for_run(run, matrix_height, matrix_width);
    if buffer.shape() == wanted {
        log::debug!(
            "{}: {:?} buffer for {}x{} matrix, {:?} scan",
            filter,
            wanted,
            matrix_width,
            matrix_height,
            run.scan
        );
        Some(buffer)
    } else {
        log::warn!(
            "{}: {:?} scan provides a {:?} buffer, filter needs {:?}; error diffusion disabled",
            filter,
            run.scan,
            buffer.shape(),
            wanted
        );
        None
    }
}

/// Spread `error` over the causal cells of `matrix`.
#[inline]
pub(crate) fn diffuse(buffer: &mut ErrorBuffer, matrix: &ErrorMatrix, error: f32) {
    matrix.apply(|dy, dx, weight| {
        if weight != 0.0 {
            buffer.set_error(dy, dx, error * weight);
        }
    });
}

/// Spread `error` over `taps` using a separate weight list.
#[inline]
pub(crate) fn diffuse_weighted(buffer: &mut ErrorBuffer, taps: &[Tap], weights: &[f32], error: f32) {
    for (tap, &weight) in taps.iter().zip(weights) {
        if weight != 0.0 {
            buffer.set_error(tap.dy, tap.dx, error * weight);
        }
    }
}

// ============================================================================
// Filter selection
// ============================================================================

#[derive(Debug, Clone)]
pub enum ErrorFilter {
    Matrix(MatrixErrorFilter),
    Vector(VectorErrorFilter),
    DynamicMatrix(DynamicMatrixErrorFilter),
    Perturbed(PerturbedErrorFilter),
    Randomized(RandomizedMatrixErrorFilter),
}

impl ErrorFilter {
    pub fn default_matrix() -> Self {
        ErrorFilter::Matrix(MatrixErrorFilter::new(ErrorMatrix::floyd_steinberg()))
    }

    pub fn default_vector() -> Self {
        ErrorFilter::Vector(VectorErrorFilter::forward())
    }

    pub fn default_dynamic() -> Self {
        ErrorFilter::DynamicMatrix(DynamicMatrixErrorFilter::default())
    }

    pub fn default_perturbed() -> Self {
        ErrorFilter::Perturbed(PerturbedErrorFilter::new(ErrorMatrix::floyd_steinberg()))
    }

    pub fn default_randomized() -> Self {
        ErrorFilter::Randomized(RandomizedMatrixErrorFilter::new(
            ErrorMatrix::floyd_steinberg(),
            false,
        ))
    }

    /// Whether the last `init` produced a usable buffer.
    pub fn is_initialized(&self) -> bool {
        match self {
            ErrorFilter::Matrix(f) => f.is_initialized(),
            ErrorFilter::Vector(f) => f.is_initialized(),
            ErrorFilter::DynamicMatrix(f) => f.is_initialized(),
            ErrorFilter::Perturbed(f) => f.is_initialized(),
            ErrorFilter::Randomized(f) => f.is_initialized(),
        }
    }

    /// Error accumulated for the pixel under the cursor.
    #[inline]
    pub fn get_error(&self) -> f32 {
        match self {
            ErrorFilter::Matrix(f) => f.get_error(),
            ErrorFilter::Vector(f) => f.get_error(),
            ErrorFilter::DynamicMatrix(f) => f.get_error(),
            ErrorFilter::Perturbed(f) => f.get_error(),
            ErrorFilter::Randomized(f) => f.get_error(),
        }
    }

    /// Diffuse `error`; `source` is the pixel's original intensity.
    #[inline]
    pub fn set_error(&mut self, error: f32, source: f32) {
        match self {
            ErrorFilter::Matrix(f) => f.set_error(error, source),
            ErrorFilter::Vector(f) => f.set_error(error, source),
            ErrorFilter::DynamicMatrix(f) => f.set_error(error, source),
            ErrorFilter::Perturbed(f) => f.set_error(error, source),
            ErrorFilter::Randomized(f) => f.set_error(error, source),
        }
    }

    #[inline]
    pub fn move_next(&mut self) {
        match self {
            ErrorFilter::Matrix(f) => f.move_next(),
            ErrorFilter::Vector(f) => f.move_next(),
            ErrorFilter::DynamicMatrix(f) => f.move_next(),
            ErrorFilter::Perturbed(f) => f.move_next(),
            ErrorFilter::Randomized(f) => f.move_next(),
        }
    }

    fn as_module(&self) -> &dyn Module {
        match self {
            ErrorFilter::Matrix(f) => f,
            ErrorFilter::Vector(f) => f,
            ErrorFilter::DynamicMatrix(f) => f,
            ErrorFilter::Perturbed(f) => f,
            ErrorFilter::Randomized(f) => f,
        }
    }
}

impl Module for ErrorFilter {
    fn name(&self) -> &'static str {
        self.as_module().name()
    }

    fn description(&self) -> &'static str {
        self.as_module().description()
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        match self {
            ErrorFilter::Matrix(f) => f.init(run),
            ErrorFilter::Vector(f) => f.init(run),
            ErrorFilter::DynamicMatrix(f) => f.init(run),
            ErrorFilter::Perturbed(f) => f.init(run),
            ErrorFilter::Randomized(f) => f.init(run),
        }
    }
}
