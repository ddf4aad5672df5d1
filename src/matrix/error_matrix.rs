/// Error diffusion matrices with rational weights.
///
/// A matrix stores integer numerators and a shared divisor. The source pixel
/// sits in the first row at `offset`; only cells after it (rest of the first
/// row, then every following row) receive error.

use super::Matrix;
use crate::error::{HalftoneError, Result};

/// One causal neighbour of the source pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    /// Rows below the source pixel
    pub dy: usize,
    /// Columns relative to the source pixel (negative = behind)
    pub dx: isize,
    pub weight: f32,
}

#[derive(Debug, PartialEq)]
pub struct ErrorMatrix {
    matrix: Matrix<i32, f32>,
    divisor: i32,
    offset: usize,
}

fn derive_weights(divisor: i32) -> impl Fn(&[i32]) -> Vec<f32> {
    move |def: &[i32]| def.iter().map(|&v| v as f32 / divisor as f32).collect()
}

impl ErrorMatrix {
    /// Create an error matrix from row-major numerators.
    ///
    /// Fails when the divisor is zero, the data doesn't fill `width * height`,
    /// or the offset lies outside the first row.
    pub fn new(
        width: usize,
        height: usize,
        numerators: Vec<i32>,
        divisor: i32,
        offset: usize,
    ) -> Result<Self> {
        if divisor == 0 {
            return Err(HalftoneError::ZeroDivisor);
        }
        if offset >= width.max(1) {
            return Err(HalftoneError::OffsetOutOfRange { offset, width });
        }
        let matrix = Matrix::new(width, height, numerators, derive_weights(divisor))?;
        Ok(Self {
            matrix,
            divisor,
            offset,
        })
    }

    /// Replace numerators and divisor, keeping the working weights in sync.
    pub fn redefine(
        &mut self,
        width: usize,
        height: usize,
        numerators: Vec<i32>,
        divisor: i32,
        offset: usize,
    ) -> Result<()> {
        *self = Self::new(width, height, numerators, divisor, offset)?;
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.matrix.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.matrix.height()
    }

    #[inline]
    pub fn divisor(&self) -> i32 {
        self.divisor
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn numerators(&self) -> &[i32] {
        self.matrix.definition()
    }

    /// Working weight at (y, x), wrapping.
    #[inline]
    pub fn weight(&self, y: isize, x: isize) -> f32 {
        self.matrix.get(y, x)
    }

    /// Visit every causal cell as `f(rel_y, rel_x, weight)`.
    ///
    /// The first row is visited from `offset + 1` onward, later rows in full.
    /// Zero weights are visited too.
    pub fn apply(&self, mut f: impl FnMut(usize, isize, f32)) {
        let width = self.width();
        let offset = self.offset as isize;
        let weights = self.matrix.working();
        for y in 0..self.height() {
            let start = if y == 0 { self.offset + 1 } else { 0 };
            for x in start..width {
                f(y, x as isize - offset, weights[y * width + x]);
            }
        }
    }

    /// Causal cells as a list of taps, including empty slots.
    pub fn taps(&self) -> Vec<Tap> {
        let mut taps = Vec::with_capacity(self.coefficient_capacity());
        self.apply(|dy, dx, weight| taps.push(Tap { dy, dx, weight }));
        taps
    }

    /// Number of non-zero weights after the source offset.
    pub fn coefficient_count(&self) -> usize {
        let mut count = 0;
        self.apply(|_, _, w| {
            if w != 0.0 {
                count += 1;
            }
        });
        count
    }

    /// Number of causal slots, populated or not.
    pub fn coefficient_capacity(&self) -> usize {
        (self.width() - self.offset - 1) + (self.height() - 1) * self.width()
    }

    /// Sum of all causal weights. 1.0 for an energy-preserving matrix.
    pub fn weight_sum(&self) -> f32 {
        let mut sum = 0.0;
        self.apply(|_, _, w| sum += w);
        sum
    }

    // ========================================================================
    // Built-in samples
    // ========================================================================

    fn sample(width: usize, height: usize, numerators: &[i32], divisor: i32, offset: usize) -> Self {
        debug_assert_eq!(numerators.len(), width * height);
        let matrix = Matrix {
            width,
            height,
            definition: numerators.to_vec(),
            working: derive_weights(divisor)(numerators),
        };
        Self {
            matrix,
            divisor,
            offset,
        }
    }

    pub fn floyd_steinberg() -> Self {
        Self::sample(3, 2, &[0, 0, 7, 3, 5, 1], 16, 1)
    }

    pub fn false_floyd_steinberg() -> Self {
        Self::sample(2, 2, &[0, 3, 3, 2], 8, 0)
    }

    pub fn jarvis_judice_ninke() -> Self {
        Self::sample(5, 3, &[0, 0, 0, 7, 5, 3, 5, 7, 5, 3, 1, 3, 5, 3, 1], 48, 2)
    }

    pub fn stucki() -> Self {
        Self::sample(5, 3, &[0, 0, 0, 8, 4, 2, 4, 8, 4, 2, 1, 2, 4, 2, 1], 42, 2)
    }

    pub fn burkes() -> Self {
        Self::sample(5, 2, &[0, 0, 0, 8, 4, 2, 4, 8, 4, 2], 32, 2)
    }

    pub fn sierra() -> Self {
        Self::sample(5, 3, &[0, 0, 0, 5, 3, 2, 4, 5, 4, 2, 0, 2, 3, 2, 0], 32, 2)
    }

    pub fn sierra_two_row() -> Self {
        Self::sample(5, 2, &[0, 0, 0, 4, 3, 1, 2, 3, 2, 1], 16, 2)
    }

    pub fn sierra_lite() -> Self {
        Self::sample(3, 2, &[0, 0, 2, 1, 1, 0], 4, 1)
    }

    /// Atkinson diffuses only 6/8 of the error.
    pub fn atkinson() -> Self {
        Self::sample(4, 3, &[0, 0, 1, 1, 1, 1, 1, 0, 0, 1, 0, 0], 8, 1)
    }

    pub fn shiau_fan() -> Self {
        Self::sample(4, 2, &[0, 0, 0, 4, 1, 1, 2, 0], 8, 2)
    }

    pub fn shiau_fan_2() -> Self {
        Self::sample(5, 2, &[0, 0, 0, 0, 8, 1, 1, 2, 4, 0], 16, 3)
    }

    pub fn stevenson_arce() -> Self {
        #[rustfmt::skip]
        let numerators = [
            0, 0, 0, 0, 0, 32, 0,
            12, 0, 26, 0, 30, 0, 16,
            0, 12, 0, 26, 0, 12, 0,
            5, 0, 12, 0, 12, 0, 5,
        ];
        Self::sample(7, 4, &numerators, 200, 3)
    }

    /// Single-row matrix passing all error to the next pixel on the path.
    pub fn vector_forward() -> Self {
        Self::sample(2, 1, &[0, 1], 1, 0)
    }

    pub fn vector_two_tap() -> Self {
        Self::sample(3, 1, &[0, 3, 1], 4, 0)
    }

    pub fn vector_three_tap() -> Self {
        Self::sample(4, 1, &[0, 4, 2, 1], 7, 0)
    }

    /// Look up a built-in matrix by its kebab-case name.
    pub fn by_name(name: &str) -> Option<Self> {
        SAMPLES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, build)| build())
    }

    /// Names of all built-in matrices.
    pub fn sample_names() -> impl Iterator<Item = &'static str> {
        SAMPLES.iter().map(|(n, _)| *n)
    }
}

const SAMPLES: &[(&str, fn() -> ErrorMatrix)] = &[
    ("floyd-steinberg", ErrorMatrix::floyd_steinberg),
    ("false-floyd-steinberg", ErrorMatrix::false_floyd_steinberg),
    ("jarvis-judice-ninke", ErrorMatrix::jarvis_judice_ninke),
    ("stucki", ErrorMatrix::stucki),
    ("burkes", ErrorMatrix::burkes),
    ("sierra", ErrorMatrix::sierra),
    ("sierra-two-row", ErrorMatrix::sierra_two_row),
    ("sierra-lite", ErrorMatrix::sierra_lite),
    ("atkinson", ErrorMatrix::atkinson),
    ("shiau-fan", ErrorMatrix::shiau_fan),
    ("shiau-fan-2", ErrorMatrix::shiau_fan_2),
    ("stevenson-arce", ErrorMatrix::stevenson_arce),
    ("vector-forward", ErrorMatrix::vector_forward),
    ("vector-two-tap", ErrorMatrix::vector_two_tap),
    ("vector-three-tap", ErrorMatrix::vector_three_tap),
];

impl Default for ErrorMatrix {
    fn default() -> Self {
        Self::floyd_steinberg()
    }
}

/// Cloning copies the definition and re-derives the weights.
impl Clone for ErrorMatrix {
    fn clone(&self) -> Self {
        Self {
            matrix: self.matrix.rederived(derive_weights(self.divisor)),
            divisor: self.divisor,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_sum_to_one() {
        for name in ErrorMatrix::sample_names() {
            if name == "atkinson" {
                continue;
            }
            let m = ErrorMatrix::by_name(name).unwrap();
            let sum = m.weight_sum();
            assert!((sum - 1.0).abs() < 1e-5, "{} sums to {}", name, sum);
        }
    }

    #[test]
    fn test_atkinson_is_lossy() {
        let sum = ErrorMatrix::atkinson().weight_sum();
        assert!((sum - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_apply_visits_causal_cells_only() {
        let m = ErrorMatrix::floyd_steinberg();
        let taps = m.taps();
        assert_eq!(
            taps,
            vec![
                Tap { dy: 0, dx: 1, weight: 7.0 / 16.0 },
                Tap { dy: 1, dx: -1, weight: 3.0 / 16.0 },
                Tap { dy: 1, dx: 0, weight: 5.0 / 16.0 },
                Tap { dy: 1, dx: 1, weight: 1.0 / 16.0 },
            ]
        );
    }

    #[test]
    fn test_coefficient_count_and_capacity() {
        let jjn = ErrorMatrix::jarvis_judice_ninke();
        assert_eq!(jjn.coefficient_count(), 12);
        assert_eq!(jjn.coefficient_capacity(), 12);

        let sierra = ErrorMatrix::sierra();
        assert_eq!(sierra.coefficient_count(), 10);
        assert_eq!(sierra.coefficient_capacity(), 12);

        let atkinson = ErrorMatrix::atkinson();
        assert_eq!(atkinson.coefficient_count(), 6);
        assert_eq!(atkinson.coefficient_capacity(), 10);
    }

    #[test]
    fn test_zero_divisor_rejected() {
        assert_eq!(
            ErrorMatrix::new(2, 1, vec![0, 1], 0, 0).unwrap_err(),
            HalftoneError::ZeroDivisor
        );
    }

    #[test]
    fn test_offset_out_of_range() {
        assert_eq!(
            ErrorMatrix::new(2, 1, vec![0, 1], 1, 2).unwrap_err(),
            HalftoneError::OffsetOutOfRange { offset: 2, width: 2 }
        );
    }

    #[test]
    fn test_clone_rederives_weights() {
        let m = ErrorMatrix::new(3, 1, vec![0, 1, 3], 4, 0).unwrap();
        let c = m.clone();
        assert_eq!(c, m);
        assert_eq!(c.weight(0, 2), 0.75);
    }

    #[test]
    fn test_redefine_changes_weights() {
        let mut m = ErrorMatrix::floyd_steinberg();
        m.redefine(2, 1, vec![0, 2], 2, 0).unwrap();
        assert_eq!(m.taps(), vec![Tap { dy: 0, dx: 1, weight: 1.0 }]);
    }
}
