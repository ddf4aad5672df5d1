/// Ordered-dither threshold matrices.
///
/// Provides:
/// - `ThresholdMatrix`: tileable thresholds in the 0-255 range
/// - `ThresholdMatrix::bayer`: recursive dispersed-dot builder (2x2 up to 256x256)
/// - Clustered-dot samples for classic screening

use super::Matrix;
use crate::error::{HalftoneError, Result};

/// Threshold matrix in one of two forms:
/// - incremental: ranks 1..N, scaled to `rank * 255 / (max + 1)`
/// - absolute: values already in 0-255
#[derive(Debug, PartialEq)]
pub struct ThresholdMatrix {
    matrix: Matrix<i32, f32>,
    incremental: bool,
}

fn derive_thresholds(incremental: bool) -> impl Fn(&[i32]) -> Vec<f32> {
    move |def: &[i32]| {
        if incremental {
            let max = def.iter().copied().max().unwrap_or(0);
            let scale = 255.0 / (max as f32 + 1.0);
            def.iter().map(|&v| v as f32 * scale).collect()
        } else {
            def.iter().map(|&v| v.clamp(0, 255) as f32).collect()
        }
    }
}

impl ThresholdMatrix {
    pub fn new(width: usize, height: usize, values: Vec<i32>, incremental: bool) -> Result<Self> {
        let matrix = Matrix::new(width, height, values, derive_thresholds(incremental))?;
        Ok(Self {
            matrix,
            incremental,
        })
    }

    /// Replace the definition and mode, re-deriving the thresholds.
    pub fn redefine(
        &mut self,
        width: usize,
        height: usize,
        values: Vec<i32>,
        incremental: bool,
    ) -> Result<()> {
        *self = Self::new(width, height, values, incremental)?;
        Ok(())
    }

    fn from_ranks(size: usize, ranks: Vec<i32>) -> Self {
        debug_assert_eq!(ranks.len(), size * size);
        let working = derive_thresholds(true)(&ranks);
        Self {
            matrix: Matrix {
                width: size,
                height: size,
                definition: ranks,
                working,
            },
            incremental: true,
        }
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
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    pub fn values(&self) -> &[i32] {
        self.matrix.definition()
    }

    /// Threshold for image position (x, y), tiling the matrix over the image.
    #[inline]
    pub fn threshold(&self, x: usize, y: usize) -> f32 {
        self.matrix.get(y as isize, x as isize)
    }

    // ========================================================================
    // Generators and samples
    // ========================================================================

    /// Dispersed-dot (Bayer) matrix of size `2^order`, order 1-8.
    ///
    /// Starts from `{{0,2},{3,1}}`; every doubling places four copies of the
    /// current matrix scaled by 4 into the quadrants, offset by the quadrant's
    /// own base rank (TL 0, TR 2, BL 3, BR 1).
    pub fn bayer(order: u32) -> Result<Self> {
        if !(1..=8).contains(&order) {
            return Err(HalftoneError::BayerOrder(order));
        }
        const QUADRANTS: [(usize, usize, i32); 4] = [(0, 0, 0), (1, 0, 2), (0, 1, 3), (1, 1, 1)];

        let mut size = 2usize;
        let mut cells: Vec<i32> = vec![0, 2, 3, 1];
        for _ in 1..order {
            let next_size = size * 2;
            let mut next = vec![0i32; next_size * next_size];
            for y in 0..size {
                for x in 0..size {
                    let cell = cells[y * size + x];
                    for &(qx, qy, q) in &QUADRANTS {
                        next[(y + qy * size) * next_size + x + qx * size] = 4 * cell + q;
                    }
                }
            }
            cells = next;
            size = next_size;
        }

        Ok(Self::from_ranks(size, cells.into_iter().map(|v| v + 1).collect()))
    }

    /// 4x4 clustered dot, growing from the cell centre.
    pub fn cluster_4() -> Self {
        let ranks = [12, 5, 6, 13, 4, 0, 1, 7, 11, 3, 2, 8, 15, 10, 9, 14];
        Self::from_ranks(4, ranks.iter().map(|v| v + 1).collect())
    }

    /// 8x8 clustered dot at 45 degrees (two dots per tile).
    pub fn cluster_8() -> Self {
        #[rustfmt::skip]
        let ranks = [
            24, 10, 12, 26, 35, 47, 49, 37,
             8,  0,  2, 14, 45, 59, 61, 51,
            22,  6,  4, 16, 43, 57, 63, 53,
            30, 20, 18, 28, 33, 41, 55, 39,
            34, 46, 48, 36, 25, 11, 13, 27,
            44, 58, 60, 50,  9,  1,  3, 15,
            42, 56, 62, 52, 23,  7,  5, 17,
            32, 40, 54, 38, 31, 21, 19, 29,
        ];
        Self::from_ranks(8, ranks.iter().map(|v| v + 1).collect())
    }

    /// One threshold for every pixel (plain thresholding).
    pub fn constant(value: u8) -> Self {
        let definition = vec![value as i32];
        Self {
            matrix: Matrix {
                width: 1,
                height: 1,
                definition,
                working: vec![value as f32],
            },
            incremental: false,
        }
    }

    /// Look up a built-in matrix by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "bayer-2" => Self::bayer(1).ok(),
            "bayer-4" => Self::bayer(2).ok(),
            "bayer-8" => Self::bayer(3).ok(),
            "bayer-16" => Self::bayer(4).ok(),
            "cluster-4" => Some(Self::cluster_4()),
            "cluster-8" => Some(Self::cluster_8()),
            "constant-128" => Some(Self::constant(128)),
            _ => None,
        }
    }

    pub fn sample_names() -> impl Iterator<Item = &'static str> {
        [
            "bayer-2",
            "bayer-4",
            "bayer-8",
            "bayer-16",
            "cluster-4",
            "cluster-8",
            "constant-128",
        ]
        .into_iter()
    }
}

impl Default for ThresholdMatrix {
    fn default() -> Self {
        Self::constant(128)
    }
}

impl Clone for ThresholdMatrix {
    fn clone(&self) -> Self {
        Self {
            matrix: self.matrix.rederived(derive_thresholds(self.incremental)),
            incremental: self.incremental,
        }
    }
}
