/// Hilbert space-filling curve generator.
///
/// The curve over a `size x size` square (size a power of two) is produced
/// lazily from an explicit frame stack, so no coordinate list is ever
/// materialised.
///
/// Orientation is a pair of flags:
/// - `flip` (i1): mirror both axes, moving the start corner
/// - `transpose` (i2): swap axes, reversing the rotation sense
///
/// The canonical curve (no flip, no transpose) starts at (0,0), ends at
/// (size-1, 0) and visits its quadrants in the order (0,0), (0,1), (1,1),
/// (1,0) with child orientations transpose, identity, identity,
/// flip+transpose. Both flags commute, so orientations compose by XOR.

use crate::error::{HalftoneError, Result};

pub type Point = (usize, usize);

/// Canonical quadrant visiting order: ((qx, qy), (flip, transpose))
const CHILDREN: [((usize, usize), (bool, bool)); 4] = [
    ((0, 0), (false, true)),
    ((0, 1), (false, false)),
    ((1, 1), (false, false)),
    ((1, 0), (true, true)),
];

/// Unit cell corners in canonical order.
const CORNERS: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 1), (1, 0)];

/// Map a 0/1 cell coordinate through an orientation.
#[inline]
fn orient(px: usize, py: usize, flip: bool, transpose: bool) -> (usize, usize) {
    let (a, b) = if transpose { (py, px) } else { (px, py) };
    if flip {
        (1 - a, 1 - b)
    } else {
        (a, b)
    }
}

/// Hilbert curve over a power-of-two square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HilbertCurve {
    size: usize,
    flip: bool,
    transpose: bool,
}

impl HilbertCurve {
    pub fn new(size: usize, flip: bool, transpose: bool) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(HalftoneError::NotPowerOfTwo(size));
        }
        Ok(Self {
            size,
            flip,
            transpose,
        })
    }

    /// Curve covering a `width x height` rectangle.
    ///
    /// Uses the smallest power-of-two square holding the rectangle. Wide
    /// rectangles get a transposed curve so the first split runs along the
    /// long axis and the visible half is traversed without leaving it.
    pub fn covering(width: usize, height: usize) -> Self {
        let size = width.max(height).max(1).next_power_of_two();
        Self {
            size,
            flip: false,
            transpose: width >= height,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Every point of the square, in curve order.
    pub fn points(&self) -> HilbertPoints {
        HilbertPoints {
            stack: vec![Frame {
                x: 0,
                y: 0,
                size: self.size,
                flip: self.flip,
                transpose: self.transpose,
                child: 0,
            }],
            cell: [(0, 0); 4],
            cell_len: 0,
            cell_pos: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    x: usize,
    y: usize,
    size: usize,
    flip: bool,
    transpose: bool,
    /// Next quadrant to descend into
    child: u8,
}

/// Lazy iterator over the points of a [`HilbertCurve`].
#[derive(Debug, Clone)]
pub struct HilbertPoints {
    stack: Vec<Frame>,
    cell: [Point; 4],
    cell_len: usize,
    cell_pos: usize,
}

impl Iterator for HilbertPoints {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        loop {
            if self.cell_pos < self.cell_len {
                let p = self.cell[self.cell_pos];
                self.cell_pos += 1;
                return Some(p);
            }

            let frame = self.stack.last_mut()?;

            if frame.size <= 2 {
                let f = *frame;
                self.stack.pop();
                if f.size == 1 {
                    self.cell[0] = (f.x, f.y);
                    self.cell_len = 1;
                } else {
                    for (slot, &(px, py)) in self.cell.iter_mut().zip(CORNERS.iter()) {
                        let (cx, cy) = orient(px, py, f.flip, f.transpose);
                        *slot = (f.x + cx, f.y + cy);
                    }
                    self.cell_len = 4;
                }
                self.cell_pos = 0;
                continue;
            }

            if frame.child == 4 {
                self.stack.pop();
                continue;
            }

            let ((qx, qy), (child_flip, child_transpose)) = CHILDREN[frame.child as usize];
            frame.child += 1;
            let half = frame.size / 2;
            let (ox, oy) = orient(qx, qy, frame.flip, frame.transpose);
            let child = Frame {
                x: frame.x + ox * half,
                y: frame.y + oy * half,
                size: half,
                flip: frame.flip ^ child_flip,
                transpose: frame.transpose ^ child_transpose,
                child: 0,
            };
            self.stack.push(child);
        }
    }
}

/// Hilbert traversal clipped to a rectangle.
///
/// Points outside `width x height` are skipped and iteration ends once every
/// rectangle point has been produced.
#[derive(Debug, Clone)]
pub struct ClippedHilbert {
    inner: HilbertPoints,
    width: usize,
    height: usize,
    remaining: usize,
}

impl ClippedHilbert {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            inner: HilbertCurve::covering(width, height).points(),
            width,
            height,
            remaining: width.saturating_mul(height),
        }
    }
}

impl Iterator for ClippedHilbert {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.remaining == 0 {
            return None;
        }
        let (width, height) = (self.width, self.height);
        let p = self.inner.find(|&(x, y)| x < width && y < height)?;
        self.remaining -= 1;
        Some(p)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
