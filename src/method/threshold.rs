/// Pixel-by-pixel threshold halftoning with optional error diffusion.
///
/// Per run the scanning order, the error filter (if any) and the threshold
/// filter are initialised with the image dimensions. Each visited pixel:
/// - reads the source intensity
/// - adds the buffered error when the error filter is initialised
/// - quantizes the effective intensity to 0 or 255
/// - diffuses `effective - output` and advances the error filter

use crate::buffer::{BufferScope, Image};
use crate::error::{HalftoneError, Result};
use crate::error_filter::ErrorFilter;
use crate::module::{Module, RunInfo};
use crate::scan::ScanningOrder;
use crate::threshold_filter::ThresholdFilter;

#[derive(Debug, Clone, Default)]
pub struct ThresholdHalftoneMethod {
    pub scanning_order: Option<ScanningOrder>,
    pub threshold_filter: Option<ThresholdFilter>,
    pub error_filter: Option<ErrorFilter>,
    /// Seed handed to random sources; `None` uses entropy
    pub seed: Option<u64>,
}

impl ThresholdHalftoneMethod {
    pub fn new(
        scanning_order: ScanningOrder,
        threshold_filter: ThresholdFilter,
        error_filter: Option<ErrorFilter>,
    ) -> Self {
        Self {
            scanning_order: Some(scanning_order),
            threshold_filter: Some(threshold_filter),
            error_filter,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Run information for an image, failing when a mandatory module is missing.
    fn run_info(&self, width: usize, height: usize) -> Result<RunInfo> {
        let order = self
            .scanning_order
            .as_ref()
            .ok_or(HalftoneError::MissingModule("scanning order"))?;
        if self.threshold_filter.is_none() {
            return Err(HalftoneError::MissingModule("threshold filter"));
        }
        Ok(RunInfo::new(width, height, order.kind()).with_seed(self.seed))
    }

    /// Halftone `image` in place.
    pub fn run<I: Image>(&mut self, image: &mut I) -> Result<()> {
        let run = self.run_info(image.width(), image.height())?;
        self.init(&run)?;

        let (Some(order), Some(threshold)) =
            (self.scanning_order.as_mut(), self.threshold_filter.as_mut())
        else {
            return Err(HalftoneError::MissingModule("threshold filter"));
        };
        let mut error_filter = self.error_filter.as_mut();

        let mut image = BufferScope::new(image);
        while let Some((x, y)) = order.next_point() {
            let source = image.get_pixel(x, y) as f32;
            let effective = match error_filter.as_deref() {
                Some(ef) if ef.is_initialized() => source + ef.get_error(),
                _ => source,
            };
            let output = threshold.quantize(effective, x, y);
            image.set_pixel(x, y, output);

            if let Some(ef) = error_filter.as_deref_mut() {
                if ef.is_initialized() {
                    ef.set_error(effective - output as f32, source);
                }
                ef.move_next();
            }
        }

        log::debug!("{}: finished {}x{}", self.name(), run.width, run.height);
        Ok(())
    }
}

impl Module for ThresholdHalftoneMethod {
    fn name(&self) -> &'static str {
        "Threshold halftoning"
    }

    fn description(&self) -> &'static str {
        "Quantizes every pixel against a threshold filter, optionally diffusing the error"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        let order = self
            .scanning_order
            .as_mut()
            .ok_or(HalftoneError::MissingModule("scanning order"))?;
        order.init(run)?;
        if let Some(ef) = self.error_filter.as_mut() {
            ef.init(run)?;
        }
        let threshold = self
            .threshold_filter
            .as_mut()
            .ok_or(HalftoneError::MissingModule("threshold filter"))?;
        threshold.init(run)?;

        log::debug!(
            "threshold run {}x{}: {} / {} / {}",
            run.width,
            run.height,
            order.name(),
            threshold.name(),
            self.error_filter.as_ref().map_or("no error filter", |ef| ef.name())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::GrayImage;
    use crate::error_filter::MatrixErrorFilter;
    use crate::matrix::{ErrorMatrix, ThresholdMatrix};
    use crate::threshold_filter::MatrixThresholdFilter;

    fn plain_threshold() -> ThresholdFilter {
        ThresholdFilter::Matrix(MatrixThresholdFilter::new(ThresholdMatrix::constant(128)))
    }

    #[test]
    fn test_checkerboard_passes_through() {
        let mut image = GrayImage::new(vec![0, 255, 255, 0], 2, 2).unwrap();
        let mut method = ThresholdHalftoneMethod::new(ScanningOrder::scanline(), plain_threshold(), None);
        method.run(&mut image).unwrap();
        assert_eq!(image.data(), &[0, 255, 255, 0]);
    }

    #[test]
    fn test_missing_modules_rejected_before_touching_pixels() {
        let mut image = GrayImage::filled(2, 2, 200).unwrap();

        let mut no_threshold = ThresholdHalftoneMethod {
            scanning_order: Some(ScanningOrder::scanline()),
            ..Default::default()
        };
        assert_eq!(
            no_threshold.run(&mut image).unwrap_err(),
            HalftoneError::MissingModule("threshold filter")
        );

        let mut no_order = ThresholdHalftoneMethod {
            threshold_filter: Some(plain_threshold()),
            ..Default::default()
        };
        assert_eq!(
            no_order.run(&mut image).unwrap_err(),
            HalftoneError::MissingModule("scanning order")
        );
        assert_eq!(image.data(), &[200; 4]);
        assert!(!image.is_buffering());
    }

    #[test]
    fn test_floyd_steinberg_mid_grey_row() {
        // 127 rounds down, error pushes the next pixel over the threshold
        let mut image = GrayImage::filled(4, 1, 127).unwrap();
        let ef = ErrorFilter::Matrix(MatrixErrorFilter::new(ErrorMatrix::floyd_steinberg()));
        let mut method =
            ThresholdHalftoneMethod::new(ScanningOrder::scanline(), plain_threshold(), Some(ef));
        method.run(&mut image).unwrap();
        assert_eq!(image.data(), &[0, 255, 0, 255]);
    }

    #[test]
    fn test_error_diffusion_preserves_mean() {
        let (w, h) = (32, 32);
        let mut image = GrayImage::filled(w, h, 64).unwrap();
        let ef = ErrorFilter::Matrix(MatrixErrorFilter::new(ErrorMatrix::floyd_steinberg()));
        let mut method =
            ThresholdHalftoneMethod::new(ScanningOrder::serpentine(), plain_threshold(), Some(ef));
        method.run(&mut image).unwrap();
        let white = image.data().iter().filter(|&&v| v == 255).count();
        let expected = w * h / 4;
        assert!((white as isize - expected as isize).abs() <= 40, "white {}", white);
        assert!(image.data().iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn test_hilbert_with_vector_filter() {
        let mut image = GrayImage::filled(13, 7, 191).unwrap();
        let mut method = ThresholdHalftoneMethod::new(
            ScanningOrder::hilbert(),
            plain_threshold(),
            Some(ErrorFilter::default_vector()),
        );
        method.run(&mut image).unwrap();
        let white = image.data().iter().filter(|&&v| v == 255).count() as f32;
        let ratio = white / (13.0 * 7.0);
        assert!((ratio - 0.75).abs() < 0.05, "ratio {}", ratio);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let build = || {
            ThresholdHalftoneMethod::new(
                ScanningOrder::scanline(),
                plain_threshold(),
                Some(ErrorFilter::default_randomized()),
            )
            .with_seed(Some(42))
        };
        let source: Vec<u8> = (0..256).map(|i| i as u8).collect();
        let mut a = GrayImage::new(source.clone(), 16, 16).unwrap();
        let mut b = GrayImage::new(source, 16, 16).unwrap();
        build().run(&mut a).unwrap();
        build().run(&mut b).unwrap();
        assert_eq!(a, b);
    }
}
