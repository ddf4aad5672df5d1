/// Cyclic accumulators for diffused quantization error.
///
/// Provides:
/// - `MatrixErrorBuffer`: rows of the image width, cycled as the scan moves down
/// - `VectorErrorBuffer`: ring along a one-dimensional path (space-filling curves)
/// - `ErrorBuffer::for_run`: picks the buffer shape from the run's scanning order
///
/// Each buffer keeps its own cursor that trails the scanning order: the owner
/// calls `move_next` exactly once per visited pixel.

use crate::module::RunInfo;
use crate::scan::ScanKind;

// ============================================================================
// Two-dimensional buffer
// ============================================================================

#[derive(Debug, Clone)]
pub struct MatrixErrorBuffer {
    rows: Vec<Vec<f32>>,
    width: usize,
    cursor_x: usize,
    cursor_row: usize,
    serpentine: bool,
    reversed: bool,
}

impl MatrixErrorBuffer {
    /// `rows` is the error matrix height, `width` the image width.
    pub fn new(rows: usize, width: usize, serpentine: bool) -> Self {
        let rows = rows.max(1);
        let width = width.max(1);
        Self {
            rows: vec![vec![0.0; width]; rows],
            width,
            cursor_x: 0,
            cursor_row: 0,
            serpentine,
            reversed: false,
        }
    }

    #[inline]
    pub fn get_error(&self) -> f32 {
        self.rows[self.cursor_row][self.cursor_x]
    }

    /// Add `amount` at `dy` rows below and `dx` columns ahead of the cursor.
    ///
    /// "Ahead" follows the current scan direction. Columns outside the image
    /// are dropped.
    #[inline]
    pub fn set_error(&mut self, dy: usize, dx: isize, amount: f32) {
        let dx = if self.reversed { -dx } else { dx };
        let x = self.cursor_x as isize + dx;
        if x < 0 || x >= self.width as isize {
            return;
        }
        let row = (self.cursor_row + dy) % self.rows.len();
        self.rows[row][x as usize] += amount;
    }

    /// Advance one pixel. At the end of a row the vacated row is cleared and
    /// becomes the furthest row ahead.
    pub fn move_next(&mut self) {
        let at_row_end = if self.reversed {
            self.cursor_x == 0
        } else {
            self.cursor_x + 1 == self.width
        };

        if !at_row_end {
            if self.reversed {
                self.cursor_x -= 1;
            } else {
                self.cursor_x += 1;
            }
            return;
        }

        self.rows[self.cursor_row].fill(0.0);
        self.cursor_row = (self.cursor_row + 1) % self.rows.len();
        if self.serpentine {
            self.reversed = !self.reversed;
        }
        self.cursor_x = if self.reversed { self.width - 1 } else { 0 };
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.rows[index % self.rows.len()]
    }

    /// (column, buffer row) of the cursor.
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_row)
    }
}

// ============================================================================
// One-dimensional ring
// ============================================================================

#[derive(Debug, Clone)]
pub struct VectorErrorBuffer {
    ring: Vec<f32>,
    cursor: usize,
}

impl VectorErrorBuffer {
    /// Ring of `matrix_width + 1` slots.
    pub fn new(matrix_width: usize) -> Self {
        Self {
            ring: vec![0.0; matrix_width + 1],
            cursor: 0,
        }
    }

    #[inline]
    pub fn get_error(&self) -> f32 {
        self.ring[self.cursor]
    }

    /// Add `amount` to the slot `dx` steps ahead on the path.
    #[inline]
    pub fn set_error(&mut self, dy: usize, dx: isize, amount: f32) {
        debug_assert_eq!(dy, 0, "vector buffer has a single row");
        let len = self.ring.len() as isize;
        let slot = (self.cursor as isize + dx).rem_euclid(len) as usize;
        self.ring[slot] += amount;
    }

    #[inline]
    pub fn move_next(&mut self) {
        self.ring[self.cursor] = 0.0;
        self.cursor = (self.cursor + 1) % self.ring.len();
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn slots(&self) -> &[f32] {
        &self.ring
    }
}

// ============================================================================
// Shape selection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferShape {
    Matrix,
    Vector,
}

#[derive(Debug, Clone)]
pub enum ErrorBuffer {
    Matrix(MatrixErrorBuffer),
    Vector(VectorErrorBuffer),
}

impl ErrorBuffer {
    /// Buffer matching the run's scanning order.
    ///
    /// Row orders get a matrix buffer (`matrix_height` rows of image width);
    /// space-filling curves get a ring of `matrix_width + 1` slots.
    pub fn for_run(run: &RunInfo, matrix_height: usize, matrix_width: usize) -> Self {
        if run.scan.is_space_filling() {
            ErrorBuffer::Vector(VectorErrorBuffer::new(matrix_width))
        } else {
            let serpentine = run.scan == ScanKind::Serpentine;
            ErrorBuffer::Matrix(MatrixErrorBuffer::new(matrix_height, run.width, serpentine))
        }
    }

    pub fn shape(&self) -> BufferShape {
        match self {
            ErrorBuffer::Matrix(_) => BufferShape::Matrix,
            ErrorBuffer::Vector(_) => BufferShape::Vector,
        }
    }

    #[inline]
    pub fn get_error(&self) -> f32 {
        match self {
            ErrorBuffer::Matrix(b) => b.get_error(),
            ErrorBuffer::Vector(b) => b.get_error(),
        }
    }

    #[inline]
    pub fn set_error(&mut self, dy: usize, dx: isize, amount: f32) {
        match self {
            ErrorBuffer::Matrix(b) => b.set_error(dy, dx, amount),
            ErrorBuffer::Vector(b) => b.set_error(dy, dx, amount),
        }
    }

    #[inline]
    pub fn move_next(&mut self) {
        match self {
            ErrorBuffer::Matrix(b) => b.move_next(),
            ErrorBuffer::Vector(b) => b.move_next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vacated_row_is_cleared() {
        let mut buf = MatrixErrorBuffer::new(2, 4, false);
        for x in 0..4 {
            buf.set_error(0, 0, 1.0);
            buf.set_error(1, 0, 2.0);
            if x < 3 {
                buf.move_next();
            }
        }
        assert_eq!(buf.row(0), &[1.0, 1.0, 1.0, 1.0]);
        buf.move_next();
        assert_eq!(buf.row(0), &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(buf.cursor(), (0, 1));
        assert_eq!(buf.get_error(), 2.0);
    }

    #[test]
    fn test_full_cycle_wraps_rows() {
        let mut buf = MatrixErrorBuffer::new(3, 2, false);
        for _ in 0..6 {
            buf.move_next();
        }
        assert_eq!(buf.cursor(), (0, 0));
    }

    #[test]
    fn test_out_of_bounds_writes_dropped() {
        let mut buf = MatrixErrorBuffer::new(2, 3, false);
        buf.set_error(1, -1, 5.0);
        buf.set_error(0, 3, 5.0);
        assert_eq!(buf.row(0), &[0.0, 0.0, 0.0]);
        assert_eq!(buf.row(1), &[0.0, 0.0, 0.0]);
        buf.set_error(0, 2, 5.0);
        assert_eq!(buf.row(0), &[0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_serpentine_mirrors_direction() {
        let mut buf = MatrixErrorBuffer::new(2, 3, true);
        for _ in 0..3 {
            buf.move_next();
        }
        // Second row runs right-to-left, starting at the last column
        assert_eq!(buf.cursor(), (2, 1));
        buf.set_error(0, 1, 1.0);
        assert_eq!(buf.row(1), &[0.0, 1.0, 0.0]);
        buf.move_next();
        assert_eq!(buf.cursor(), (1, 1));
        assert_eq!(buf.get_error(), 1.0);
    }

    #[test]
    fn test_vector_ring() {
        let mut buf = VectorErrorBuffer::new(2);
        assert_eq!(buf.len(), 3);
        buf.set_error(0, 1, 0.5);
        buf.set_error(0, 2, 0.25);
        buf.move_next();
        assert_eq!(buf.get_error(), 0.5);
        buf.move_next();
        assert_eq!(buf.get_error(), 0.25);
        buf.move_next();
        // Back at the first slot, cleared when it was left
        assert_eq!(buf.get_error(), 0.0);
    }

    #[test]
    fn test_factory_shapes() {
        let scan = RunInfo::new(8, 8, ScanKind::Scanline);
        let curve = RunInfo::new(8, 8, ScanKind::Hilbert);
        assert_eq!(ErrorBuffer::for_run(&scan, 2, 3).shape(), BufferShape::Matrix);
        assert_eq!(ErrorBuffer::for_run(&curve, 1, 3).shape(), BufferShape::Vector);
        for kind in [ScanKind::Scanline, ScanKind::Serpentine, ScanKind::Hilbert] {
            let run = RunInfo::new(8, 8, kind);
            let expected = if kind.is_space_filling() {
                BufferShape::Vector
            } else {
                BufferShape::Matrix
            };
            assert_eq!(ErrorBuffer::for_run(&run, 2, 3).shape(), expected);
        }
        assert!(!ScanKind::Serpentine.is_space_filling());
    }
}
