//! Scanning orders: the sequence in which pixels are visited.
//!
//! # Module Structure
//! - `ScanKind`: closed set of traversal strategies (scanline, serpentine, Hilbert)
//! - `Points`: lazy coordinate sequence for a kind and image size
//! - `ScanningOrder`: pull-style cursor over the same sequence, one per run
//! - `hilbert`: recursive space-filling curve generator

pub mod hilbert;

pub use hilbert::{ClippedHilbert, HilbertCurve, HilbertPoints, Point};

use serde::{Deserialize, Serialize};

use crate::error::{HalftoneError, Result};
use crate::module::{Module, RunInfo};

/// Scanning order selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanKind {
    /// Row-major, left-to-right on every row (default)
    #[default]
    Scanline,
    /// Row-major, alternating direction each row
    Serpentine,
    /// Hilbert space-filling curve clipped to the image
    Hilbert,
}

impl ScanKind {
    /// Lazy sequence of every coordinate of a `width x height` image.
    pub fn points(self, width: usize, height: usize) -> Points {
        match self {
            ScanKind::Scanline => Points::Scanline(RowPoints::new(width, height, false)),
            ScanKind::Serpentine => Points::Serpentine(RowPoints::new(width, height, true)),
            ScanKind::Hilbert => Points::Hilbert(ClippedHilbert::new(width, height)),
        }
    }

    /// Whether consecutive points follow a single connected path, which
    /// one-dimensional error buffers rely on.
    pub fn is_space_filling(self) -> bool {
        matches!(self, ScanKind::Hilbert)
    }
}

// ============================================================================
// Row-major traversal
// ============================================================================

/// Row-by-row traversal, optionally reversing every odd row.
#[derive(Debug, Clone)]
pub struct RowPoints {
    width: usize,
    len: usize,
    index: usize,
    serpentine: bool,
}

impl RowPoints {
    fn new(width: usize, height: usize, serpentine: bool) -> Self {
        Self {
            width,
            len: width.saturating_mul(height),
            index: 0,
            serpentine,
        }
    }
}

impl Iterator for RowPoints {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.index >= self.len {
            return None;
        }
        let y = self.index / self.width;
        let col = self.index % self.width;
        self.index += 1;
        let x = if self.serpentine && y % 2 == 1 {
            self.width - 1 - col
        } else {
            col
        };
        Some((x, y))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

/// Coordinate sequence for any scan kind.
#[derive(Debug, Clone)]
pub enum Points {
    Scanline(RowPoints),
    Serpentine(RowPoints),
    Hilbert(ClippedHilbert),
}

impl Iterator for Points {
    type Item = Point;

    #[inline]
    fn next(&mut self) -> Option<Point> {
        match self {
            Points::Scanline(p) | Points::Serpentine(p) => p.next(),
            Points::Hilbert(p) => p.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Points::Scanline(p) | Points::Serpentine(p) => p.size_hint(),
            Points::Hilbert(p) => p.size_hint(),
        }
    }
}

// ============================================================================
// Pull-style scanning order
// ============================================================================

#[derive(Debug, Clone)]
struct Traversal {
    points: Points,
    pending: Option<Point>,
}

/// Scanning order with a cursor, initialised once per run.
///
/// `has_next` / `next_point` walk exactly the sequence produced by
/// [`ScanKind::points`] for the same dimensions.
#[derive(Debug, Clone)]
pub struct ScanningOrder {
    kind: ScanKind,
    width: usize,
    height: usize,
    cursor: Point,
    traversal: Option<Traversal>,
}

impl ScanningOrder {
    pub fn new(kind: ScanKind) -> Self {
        Self {
            kind,
            width: 0,
            height: 0,
            cursor: (0, 0),
            traversal: None,
        }
    }

    pub fn scanline() -> Self {
        Self::new(ScanKind::Scanline)
    }

    pub fn serpentine() -> Self {
        Self::new(ScanKind::Serpentine)
    }

    pub fn hilbert() -> Self {
        Self::new(ScanKind::Hilbert)
    }

    #[inline]
    pub fn kind(&self) -> ScanKind {
        self.kind
    }

    /// Reset the order for a `width x height` image.
    pub fn init_size(&mut self, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(HalftoneError::EmptyImage);
        }
        let mut points = self.kind.points(width, height);
        let pending = points.next();
        self.width = width;
        self.height = height;
        self.cursor = (0, 0);
        self.traversal = Some(Traversal { points, pending });
        Ok(())
    }

    /// Whether another coordinate remains. False before `init`.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.traversal
            .as_ref()
            .map_or(false, |t| t.pending.is_some())
    }

    /// Advance the cursor to the next coordinate and return it.
    pub fn next_point(&mut self) -> Option<Point> {
        let traversal = self.traversal.as_mut()?;
        let point = traversal.pending.take()?;
        traversal.pending = traversal.points.next();
        self.cursor = point;
        Some(point)
    }

    /// Coordinate most recently returned by `next_point`.
    #[inline]
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    /// Fresh lazy sequence for the initialised dimensions.
    pub fn points(&self) -> Points {
        self.kind.points(self.width, self.height)
    }
}

impl Iterator for ScanningOrder {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        self.next_point()
    }
}

impl Module for ScanningOrder {
    fn name(&self) -> &'static str {
        match self.kind {
            ScanKind::Scanline => "Scanline",
            ScanKind::Serpentine => "Serpentine",
            ScanKind::Hilbert => "Hilbert curve",
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            ScanKind::Scanline => "Rows top to bottom, each row left to right",
            ScanKind::Serpentine => "Rows top to bottom, alternating direction every row",
            ScanKind::Hilbert => "Hilbert space-filling curve clipped to the image",
        }
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        self.init_size(run.width, run.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [ScanKind; 3] = [ScanKind::Scanline, ScanKind::Serpentine, ScanKind::Hilbert];

    #[test]
    fn test_every_order_is_a_permutation() {
        for kind in KINDS {
            for (w, h) in [(1, 1), (1, 7), (7, 1), (3, 5), (8, 8), (13, 6), (16, 31)] {
                let points: Vec<_> = kind.points(w, h).collect();
                assert_eq!(points.len(), w * h, "{:?} {}x{}", kind, w, h);
                let mut seen = vec![false; w * h];
                for (x, y) in points {
                    assert!(x < w && y < h, "{:?} out of bounds ({}, {})", kind, x, y);
                    assert!(!seen[y * w + x], "{:?} repeats ({}, {})", kind, x, y);
                    seen[y * w + x] = true;
                }
            }
        }
    }

    #[test]
    fn test_scanline_order() {
        let points: Vec<_> = ScanKind::Scanline.points(3, 2).collect();
        assert_eq!(points, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_serpentine_order() {
        let points: Vec<_> = ScanKind::Serpentine.points(3, 3).collect();
        assert_eq!(
            points,
            vec![(0, 0), (1, 0), (2, 0), (2, 1), (1, 1), (0, 1), (0, 2), (1, 2), (2, 2)]
        );
    }

    #[test]
    fn test_pull_protocol_matches_lazy_sequence() {
        for kind in KINDS {
            let mut order = ScanningOrder::new(kind);
            order.init_size(11, 7).unwrap();
            let mut pulled = Vec::new();
            while order.has_next() {
                let p = order.next_point().unwrap();
                assert_eq!(order.cursor(), p);
                pulled.push(p);
            }
            let lazy: Vec<_> = kind.points(11, 7).collect();
            assert_eq!(pulled, lazy, "{:?}", kind);
            assert_eq!(order.next_point(), None);
        }
    }

    #[test]
    fn test_hilbert_power_of_two_is_connected() {
        let points: Vec<_> = ScanKind::Hilbert.points(16, 16).collect();
        for pair in points.windows(2) {
            let d = pair[0].0.abs_diff(pair[1].0) + pair[0].1.abs_diff(pair[1].1);
            assert_eq!(d, 1);
        }
    }

    #[test]
    fn test_uninitialised_order_is_empty() {
        let mut order = ScanningOrder::hilbert();
        assert!(!order.has_next());
        assert_eq!(order.next_point(), None);
    }

    #[test]
    fn test_init_rejects_empty_image() {
        let mut order = ScanningOrder::scanline();
        assert_eq!(order.init_size(0, 4).unwrap_err(), HalftoneError::EmptyImage);
    }

    #[test]
    fn test_reinit_restarts() {
        let mut order = ScanningOrder::serpentine();
        order.init_size(2, 2).unwrap();
        order.next_point();
        order.next_point();
        order.init_size(2, 2).unwrap();
        assert_eq!(order.next_point(), Some((0, 0)));
    }
}
