//! Coefficient matrices used by error and threshold filters.
//!
//! # Module Structure
//! - `Matrix`: generic tileable container with a definition form and a derived working form
//! - `error_matrix`: rational diffusion weights with a source offset
//! - `threshold_matrix`: ordered-dither rank matrices and the Bayer builder

pub mod error_matrix;
pub mod threshold_matrix;

pub use error_matrix::{ErrorMatrix, Tap};
pub use threshold_matrix::ThresholdMatrix;

use crate::error::{HalftoneError, Result};

// ============================================================================
// Generic matrix
// ============================================================================

/// Two-dimensional matrix holding user-editable definition values and a
/// computation-ready working array derived from them.
///
/// The working array is rebuilt by `derive` whenever the definition changes,
/// so reads never observe a stale cache. All indexing wraps modulo the matrix
/// dimensions, which makes every matrix tileable over an image.
#[derive(Debug, PartialEq)]
pub struct Matrix<D, W> {
    width: usize,
    height: usize,
    definition: Vec<D>,
    working: Vec<W>,
}

impl<D: Copy, W: Copy> Matrix<D, W> {
    /// Build a matrix from row-major definition data.
    pub fn new(
        width: usize,
        height: usize,
        definition: Vec<D>,
        derive: impl Fn(&[D]) -> Vec<W>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HalftoneError::EmptyMatrix);
        }
        if width.checked_mul(height) != Some(definition.len()) {
            return Err(HalftoneError::DimensionMismatch {
                len: definition.len(),
                width,
                height,
            });
        }
        let working = derive(&definition);
        debug_assert_eq!(working.len(), definition.len());
        Ok(Self {
            width,
            height,
            definition,
            working,
        })
    }

    /// Replace the definition and re-derive the working array.
    pub fn redefine(
        &mut self,
        width: usize,
        height: usize,
        definition: Vec<D>,
        derive: impl Fn(&[D]) -> Vec<W>,
    ) -> Result<()> {
        *self = Self::new(width, height, definition, derive)?;
        Ok(())
    }

    /// Copy the definition and derive a fresh working array for it.
    pub fn rederived(&self, derive: impl Fn(&[D]) -> Vec<W>) -> Self {
        Self {
            width: self.width,
            height: self.height,
            definition: self.definition.clone(),
            working: derive(&self.definition),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn definition(&self) -> &[D] {
        &self.definition
    }

    pub fn working(&self) -> &[W] {
        &self.working
    }

    #[inline]
    fn wrap_index(&self, y: isize, x: isize) -> usize {
        let row = y.rem_euclid(self.height as isize) as usize;
        let col = x.rem_euclid(self.width as isize) as usize;
        row * self.width + col
    }

    /// Working value at (y, x), wrapping in both directions.
    #[inline]
    pub fn get(&self, y: isize, x: isize) -> W {
        self.working[self.wrap_index(y, x)]
    }

    /// Definition value at (y, x), wrapping in both directions.
    #[inline]
    pub fn get_definition(&self, y: isize, x: isize) -> D {
        self.definition[self.wrap_index(y, x)]
    }
}
