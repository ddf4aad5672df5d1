/// Space-filling curve clustering.
///
/// Walks the Hilbert curve and groups consecutive pixels into cells of
/// `min_cell_size..=max_cell_size` pixels. A completed cell gets as many white
/// pixels as its accumulated intensity pays for (`round(total / 255)`); the
/// remaining pixels form one contiguous black cluster along the curve,
/// centred on the cell's darkest pixel when positioning is enabled. The
/// rounding remainder goes to the optional vector error filter.
///
/// With adaptive sizing, cells shrink where consecutive pixels differ:
/// `2^((1 - |d|) * log2(max))` with `d` the backward intensity difference
/// scaled to -1..1, clamped to the configured bounds.

use crate::buffer::{BufferScope, Image};
use crate::error::{HalftoneError, Result};
use crate::error_filter::VectorErrorFilter;
use crate::module::{Module, RunInfo};
use crate::scan::{Point, ScanningOrder};

#[derive(Debug, Clone)]
pub struct SFCClusteringMethod {
    min_cell_size: usize,
    max_cell_size: usize,
    pub error_filter: Option<VectorErrorFilter>,
    pub adaptive: bool,
    /// Centre clusters on the darkest pixel instead of the cell middle
    pub positioning: bool,
    pub seed: Option<u64>,
    order: ScanningOrder,
}

fn check_cell_sizes(min: usize, max: usize) -> Result<()> {
    if min == 0 || min > max {
        return Err(HalftoneError::InvalidCellSize { min, max });
    }
    Ok(())
}

/// Cell size limit for a backward intensity difference.
pub fn adaptive_cell_size(delta: f32, min: usize, max: usize) -> usize {
    let exponent = (1.0 - delta.abs().min(1.0)) * (max as f32).log2();
    (exponent.exp2().round() as usize).clamp(min, max)
}

/// Start of a `cluster`-pixel run inside a `len`-pixel cell.
fn cluster_start(len: usize, cluster: usize, anchor: Option<usize>) -> usize {
    let room = len - cluster;
    match anchor {
        Some(anchor) => anchor.saturating_sub(cluster / 2).min(room),
        None => room / 2,
    }
}

/// Accumulator for the cell being built.
#[derive(Debug, Default)]
struct Cell {
    pixels: Vec<Point>,
    total: f32,
    darkest: usize,
    darkest_value: f32,
}

impl Cell {
    fn push(&mut self, point: Point, source: f32, effective: f32) {
        if self.pixels.is_empty() || source < self.darkest_value {
            self.darkest = self.pixels.len();
            self.darkest_value = source;
        }
        self.pixels.push(point);
        self.total += effective;
    }

    fn clear(&mut self) {
        self.pixels.clear();
        self.total = 0.0;
        self.darkest = 0;
        self.darkest_value = 0.0;
    }
}

impl SFCClusteringMethod {
    pub fn new(min_cell_size: usize, max_cell_size: usize) -> Result<Self> {
        check_cell_sizes(min_cell_size, max_cell_size)?;
        Ok(Self {
            min_cell_size,
            max_cell_size,
            error_filter: None,
            adaptive: false,
            positioning: true,
            seed: None,
            order: ScanningOrder::hilbert(),
        })
    }

    pub fn with_error_filter(mut self, filter: Option<VectorErrorFilter>) -> Self {
        self.error_filter = filter;
        self
    }

    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn with_positioning(mut self, positioning: bool) -> Self {
        self.positioning = positioning;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn min_cell_size(&self) -> usize {
        self.min_cell_size
    }

    pub fn max_cell_size(&self) -> usize {
        self.max_cell_size
    }

    pub fn set_cell_sizes(&mut self, min: usize, max: usize) -> Result<()> {
        check_cell_sizes(min, max)?;
        self.min_cell_size = min;
        self.max_cell_size = max;
        Ok(())
    }

    /// Halftone `image` in place.
    pub fn run<I: Image>(&mut self, image: &mut I) -> Result<()> {
        let run = RunInfo::new(image.width(), image.height(), self.order.kind()).with_seed(self.seed);
        self.init(&run)?;

        let (min, max) = (self.min_cell_size, self.max_cell_size);
        let mut limit = max;
        let mut previous: Option<f32> = None;
        let mut cell = Cell::default();
        let mut cells = 0usize;

        let mut image = BufferScope::new(image);
        while let Some(point) = self.order.next_point() {
            let source = image.get_pixel(point.0, point.1) as f32;
            let effective = match self.error_filter.as_ref() {
                Some(ef) if ef.is_initialized() => source + ef.get_error(),
                _ => source,
            };
            cell.push(point, source, effective);

            if self.adaptive {
                if let Some(prev) = previous {
                    limit = adaptive_cell_size((source - prev) / 255.0, min, max);
                }
            }
            previous = Some(source);

            let complete = cell.pixels.len() >= limit || !self.order.has_next();
            if complete {
                let residual = self.paint(&mut *image, &cell);
                if let Some(ef) = self.error_filter.as_mut() {
                    ef.set_error(residual, source);
                }
                cells += 1;
                cell.clear();
                if !self.adaptive {
                    limit = max;
                }
            }
            if let Some(ef) = self.error_filter.as_mut() {
                ef.move_next();
            }
        }

        log::debug!("{}: {} cells over {}x{}", self.name(), cells, run.width, run.height);
        Ok(())
    }

    /// Paint white / black / white runs for a completed cell and return the
    /// rounding residual.
    fn paint<I: Image>(&self, image: &mut I, cell: &Cell) -> f32 {
        let len = cell.pixels.len();
        let white = ((cell.total / 255.0).round().max(0.0) as usize).min(len);
        let residual = cell.total - white as f32 * 255.0;
        let cluster = len - white;
        let anchor = self.positioning.then_some(cell.darkest);
        let start = cluster_start(len, cluster, anchor);

        for (i, &(x, y)) in cell.pixels.iter().enumerate() {
            let value = if (start..start + cluster).contains(&i) { 0 } else { 255 };
            image.set_pixel(x, y, value);
        }
        log::trace!(
            "cell of {} at {:?}: {} white, cluster at {}",
            len,
            cell.pixels.first(),
            white,
            start
        );
        residual
    }
}

impl Default for SFCClusteringMethod {
    fn default() -> Self {
        Self {
            min_cell_size: 1,
            max_cell_size: 8,
            error_filter: Some(VectorErrorFilter::forward()),
            adaptive: true,
            positioning: true,
            seed: None,
            order: ScanningOrder::hilbert(),
        }
    }
}

impl Module for SFCClusteringMethod {
    fn name(&self) -> &'static str {
        "SFC clustering"
    }

    fn description(&self) -> &'static str {
        "Clusters black pixels into variable-size cells along a Hilbert curve"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        check_cell_sizes(self.min_cell_size, self.max_cell_size)?;
        self.order.init(run)?;
        if let Some(ef) = self.error_filter.as_mut() {
            ef.init(run)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::GrayImage;
    use crate::matrix::ErrorMatrix;
    use crate::scan::ScanKind;

    #[test]
    fn test_invalid_cell_sizes() {
        assert_eq!(
            SFCClusteringMethod::new(0, 4).unwrap_err(),
            HalftoneError::InvalidCellSize { min: 0, max: 4 }
        );
        assert_eq!(
            SFCClusteringMethod::new(5, 4).unwrap_err(),
            HalftoneError::InvalidCellSize { min: 5, max: 4 }
        );
        let mut m = SFCClusteringMethod::new(2, 4).unwrap();
        assert!(m.set_cell_sizes(3, 1).is_err());
        assert_eq!(m.max_cell_size(), 4);
    }

    #[test]
    fn test_non_vector_matrix_rejected() {
        assert!(VectorErrorFilter::new(ErrorMatrix::floyd_steinberg()).is_err());
    }

    #[test]
    fn test_uniform_cells_match_intensity() {
        let (w, h, size) = (16, 16, 4);
        for intensity in [0u8, 40, 100, 128, 200, 255] {
            let mut image = GrayImage::filled(w, h, intensity).unwrap();
            let mut method = SFCClusteringMethod::new(size, size).unwrap();
            method.run(&mut image).unwrap();

            let expected = (255.0 - intensity as f32) / 255.0 * size as f32;
            let path: Vec<Point> = ScanKind::Hilbert.points(w, h).collect();
            for cell in path.chunks(size) {
                let black = cell
                    .iter()
                    .filter(|&&(x, y)| image.data()[y * w + x] == 0)
                    .count() as f32;
                assert!((black - expected).abs() <= 1.0, "I={} black={}", intensity, black);
            }
        }
    }

    #[test]
    fn test_cluster_is_contiguous_and_centred() {
        // 8 pixels at 128: 4 white, 4 black in the middle of the cell
        let mut image = GrayImage::filled(8, 1, 128).unwrap();
        let mut method = SFCClusteringMethod::new(8, 8).unwrap().with_positioning(false);
        method.run(&mut image).unwrap();
        let path: Vec<Point> = ScanKind::Hilbert.points(8, 1).collect();
        let along: Vec<u8> = path.iter().map(|&(x, _)| image.data()[x]).collect();
        assert_eq!(along, vec![255, 255, 0, 0, 0, 0, 255, 255]);
    }

    #[test]
    fn test_cluster_follows_darkest_pixel() {
        let mut data = vec![200u8; 8];
        let path: Vec<Point> = ScanKind::Hilbert.points(8, 1).collect();
        // Darkest pixel is the 7th along the path
        data[path[6].0] = 10;
        let mut image = GrayImage::new(data, 8, 1).unwrap();
        let mut method = SFCClusteringMethod::new(8, 8).unwrap();
        method.run(&mut image).unwrap();
        let along: Vec<u8> = path.iter().map(|&(x, _)| image.data()[x]).collect();
        // Total 1410 -> 6 white, cluster of 2 centred on the dark pixel
        assert_eq!(along, vec![255, 255, 255, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn test_error_filter_carries_residual() {
        let (w, h) = (16, 16);
        let mut image = GrayImage::filled(w, h, 100).unwrap();
        let mut method = SFCClusteringMethod::new(4, 4)
            .unwrap()
            .with_error_filter(Some(VectorErrorFilter::forward()));
        method.run(&mut image).unwrap();
        let white = image.data().iter().filter(|&&v| v == 255).count() as f32;
        let expected = 100.0 / 255.0 * (w * h) as f32;
        assert!((white - expected).abs() <= 2.0, "white {} expected {}", white, expected);
    }

    #[test]
    fn test_adaptive_size_curve() {
        assert_eq!(adaptive_cell_size(0.0, 1, 16), 16);
        assert_eq!(adaptive_cell_size(1.0, 1, 16), 1);
        assert_eq!(adaptive_cell_size(-0.5, 1, 16), 4);
        assert_eq!(adaptive_cell_size(1.0, 2, 16), 2);
    }

    #[test]
    fn test_adaptive_run_is_bilevel() {
        let data: Vec<u8> = (0..24 * 10).map(|i| ((i * 37) % 256) as u8).collect();
        let mut image = GrayImage::new(data, 24, 10).unwrap();
        let mut method = SFCClusteringMethod::default();
        method.run(&mut image).unwrap();
        assert!(image.data().iter().all(|&v| v == 0 || v == 255));
    }
}
