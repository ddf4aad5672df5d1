/// Halftoning configuration values.
///
/// Configurations are plain immutable values (serde JSON in and out). Edits go
/// through [`HalftoneConfigBuilder`], which always produces a new value;
/// [`HalftoneConfig::build`] turns a value into a fresh module graph and is
/// where every configuration error surfaces.

use serde::{Deserialize, Serialize};

use crate::buffer::GrayImage;
use crate::dynamic_table::DynamicMatrixTable;
use crate::error::{HalftoneError, Result};
use crate::error_filter::{
    DynamicMatrixErrorFilter, ErrorFilter, ErrorMatrixRecord, MatrixErrorFilter,
    PerturbedErrorFilter, RandomizedMatrixErrorFilter, VectorErrorFilter,
};
use crate::image_filter::ImageFilter;
use crate::matrix::{ErrorMatrix, ThresholdMatrix};
use crate::method::{HalftoneMethod, SFCClusteringMethod, ThresholdHalftoneMethod};
use crate::scan::{ScanKind, ScanningOrder};
use crate::spot_function::{SpotFunction, SpotShape};
use crate::threshold_filter::{
    DynamicMatrixThresholdFilter, ImageThresholdFilter, MatrixThresholdFilter,
    SpotFunctionThresholdFilter, ThresholdFilter, ThresholdMatrixRecord,
};

// ============================================================================
// Matrix specs
// ============================================================================

/// Error matrix by built-in name or explicit definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMatrixSpec {
    Named(String),
    Custom {
        width: usize,
        height: usize,
        numerators: Vec<i32>,
        divisor: i32,
        #[serde(default)]
        offset: usize,
    },
}

impl Default for ErrorMatrixSpec {
    fn default() -> Self {
        ErrorMatrixSpec::Named("floyd-steinberg".to_string())
    }
}

impl ErrorMatrixSpec {
    pub fn named(name: &str) -> Self {
        ErrorMatrixSpec::Named(name.to_string())
    }

    pub fn build(&self) -> Result<ErrorMatrix> {
        match self {
            ErrorMatrixSpec::Named(name) => {
                ErrorMatrix::by_name(name).ok_or_else(|| HalftoneError::UnknownModule {
                    category: "error matrix",
                    name: name.clone(),
                })
            }
            ErrorMatrixSpec::Custom {
                width,
                height,
                numerators,
                divisor,
                offset,
            } => ErrorMatrix::new(*width, *height, numerators.clone(), *divisor, *offset),
        }
    }
}

/// Threshold matrix by built-in name, Bayer order, or explicit definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdMatrixSpec {
    Named(String),
    Bayer {
        bayer: u32,
    },
    Custom {
        width: usize,
        height: usize,
        values: Vec<i32>,
        #[serde(default)]
        incremental: bool,
    },
}

impl Default for ThresholdMatrixSpec {
    fn default() -> Self {
        ThresholdMatrixSpec::Named("constant-128".to_string())
    }
}

impl ThresholdMatrixSpec {
    pub fn named(name: &str) -> Self {
        ThresholdMatrixSpec::Named(name.to_string())
    }

    pub fn build(&self) -> Result<ThresholdMatrix> {
        match self {
            ThresholdMatrixSpec::Named(name) => {
                ThresholdMatrix::by_name(name).ok_or_else(|| HalftoneError::UnknownModule {
                    category: "threshold matrix",
                    name: name.clone(),
                })
            }
            ThresholdMatrixSpec::Bayer { bayer } => ThresholdMatrix::bayer(*bayer),
            ThresholdMatrixSpec::Custom {
                width,
                height,
                values,
                incremental,
            } => ThresholdMatrix::new(*width, *height, values.clone(), *incremental),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotConfig {
    pub shape: SpotShape,
    /// Screen angle in degrees
    pub angle: f64,
    /// Cell period in pixels
    pub distance: f64,
}

impl Default for SpotConfig {
    fn default() -> Self {
        Self {
            shape: SpotShape::Round,
            angle: 45.0,
            distance: 8.0,
        }
    }
}

impl SpotConfig {
    pub fn build(&self) -> Result<SpotFunction> {
        SpotFunction::new(self.shape, self.angle, self.distance)
    }
}

// ============================================================================
// Filter configs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRange {
    /// First intensity of the range
    pub start: i32,
    pub matrix: ErrorMatrixSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ErrorFilterConfig {
    Matrix {
        #[serde(default)]
        matrix: ErrorMatrixSpec,
    },
    Vector {
        #[serde(default = "vector_forward")]
        matrix: ErrorMatrixSpec,
    },
    DynamicMatrix {
        #[serde(default)]
        default: ErrorMatrixSpec,
        #[serde(default)]
        ranges: Vec<ErrorRange>,
    },
    Perturbed {
        #[serde(default)]
        matrix: ErrorMatrixSpec,
        #[serde(default = "full_strength")]
        strength: f32,
    },
    Randomized {
        #[serde(default)]
        matrix: ErrorMatrixSpec,
        #[serde(default)]
        randomize_count: bool,
    },
}

fn vector_forward() -> ErrorMatrixSpec {
    ErrorMatrixSpec::named("vector-forward")
}

fn full_strength() -> f32 {
    1.0
}

impl ErrorFilterConfig {
    pub fn build(&self) -> Result<ErrorFilter> {
        Ok(match self {
            ErrorFilterConfig::Matrix { matrix } => {
                ErrorFilter::Matrix(MatrixErrorFilter::new(matrix.build()?))
            }
            ErrorFilterConfig::Vector { matrix } => {
                ErrorFilter::Vector(VectorErrorFilter::new(matrix.build()?)?)
            }
            ErrorFilterConfig::DynamicMatrix { default, ranges } => {
                let mut table = DynamicMatrixTable::with_default(ErrorMatrixRecord::new(default.build()?));
                for range in ranges {
                    table.add_record(range.start, ErrorMatrixRecord::new(range.matrix.build()?));
                }
                ErrorFilter::DynamicMatrix(DynamicMatrixErrorFilter::new(table))
            }
            ErrorFilterConfig::Perturbed { matrix, strength } => ErrorFilter::Perturbed(
                PerturbedErrorFilter::with_strength(matrix.build()?, *strength),
            ),
            ErrorFilterConfig::Randomized {
                matrix,
                randomize_count,
            } => ErrorFilter::Randomized(RandomizedMatrixErrorFilter::new(
                matrix.build()?,
                *randomize_count,
            )),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub start: i32,
    pub matrix: ThresholdMatrixSpec,
    #[serde(default)]
    pub noise: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ThresholdFilterConfig {
    Matrix {
        #[serde(default)]
        matrix: ThresholdMatrixSpec,
    },
    DynamicMatrix {
        #[serde(default)]
        ranges: Vec<ThresholdRange>,
    },
    SpotFunction {
        #[serde(default)]
        spot: SpotConfig,
    },
    Image {
        #[serde(default)]
        spot: SpotConfig,
        #[serde(default)]
        filters: Vec<ImageFilter>,
    },
}

impl Default for ThresholdFilterConfig {
    fn default() -> Self {
        ThresholdFilterConfig::Matrix {
            matrix: ThresholdMatrixSpec::default(),
        }
    }
}

impl ThresholdFilterConfig {
    pub fn build(&self) -> Result<ThresholdFilter> {
        Ok(match self {
            ThresholdFilterConfig::Matrix { matrix } => {
                ThresholdFilter::Matrix(MatrixThresholdFilter::new(matrix.build()?))
            }
            ThresholdFilterConfig::DynamicMatrix { ranges } => {
                let mut table = DynamicMatrixTable::new();
                for range in ranges {
                    table.add_record(
                        range.start,
                        ThresholdMatrixRecord::new(range.matrix.build()?, range.noise),
                    );
                }
                ThresholdFilter::DynamicMatrix(DynamicMatrixThresholdFilter::new(table))
            }
            ThresholdFilterConfig::SpotFunction { spot } => {
                ThresholdFilter::SpotFunction(SpotFunctionThresholdFilter::new(spot.build()?))
            }
            ThresholdFilterConfig::Image { spot, filters } => {
                ThresholdFilter::Image(ImageThresholdFilter::new(spot.build()?, filters.clone()))
            }
        })
    }
}

// ============================================================================
// Method and top level
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MethodConfig {
    Threshold {
        #[serde(default)]
        scan: ScanKind,
        #[serde(default)]
        threshold: ThresholdFilterConfig,
        #[serde(default)]
        error_filter: Option<ErrorFilterConfig>,
    },
    SfcClustering {
        #[serde(default = "one")]
        min_cell_size: usize,
        #[serde(default = "eight")]
        max_cell_size: usize,
        /// Single-row matrix for the vector error filter; `None` disables it
        #[serde(default = "some_vector_forward")]
        error_matrix: Option<ErrorMatrixSpec>,
        #[serde(default = "yes")]
        adaptive: bool,
        #[serde(default = "yes")]
        positioning: bool,
    },
}

fn one() -> usize {
    1
}

fn eight() -> usize {
    8
}

fn yes() -> bool {
    true
}

fn some_vector_forward() -> Option<ErrorMatrixSpec> {
    Some(vector_forward())
}

impl Default for MethodConfig {
    fn default() -> Self {
        MethodConfig::Threshold {
            scan: ScanKind::Serpentine,
            threshold: ThresholdFilterConfig::default(),
            error_filter: Some(ErrorFilterConfig::Matrix {
                matrix: ErrorMatrixSpec::default(),
            }),
        }
    }
}

impl MethodConfig {
    pub fn build(&self) -> Result<HalftoneMethod> {
        Ok(match self {
            MethodConfig::Threshold {
                scan,
                threshold,
                error_filter,
            } => {
                let error_filter = error_filter.as_ref().map(|c| c.build()).transpose()?;
                HalftoneMethod::Threshold(ThresholdHalftoneMethod::new(
                    ScanningOrder::new(*scan),
                    threshold.build()?,
                    error_filter,
                ))
            }
            MethodConfig::SfcClustering {
                min_cell_size,
                max_cell_size,
                error_matrix,
                adaptive,
                positioning,
            } => {
                let error_filter = match error_matrix {
                    Some(spec) => Some(VectorErrorFilter::new(spec.build()?)?),
                    None => None,
                };
                HalftoneMethod::SfcClustering(
                    SFCClusteringMethod::new(*min_cell_size, *max_cell_size)?
                        .with_error_filter(error_filter)
                        .with_adaptive(*adaptive)
                        .with_positioning(*positioning),
                )
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HalftoneConfig {
    pub method: MethodConfig,
    /// Seed for every random source; absent means OS entropy
    pub seed: Option<u64>,
}

impl HalftoneConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn builder() -> HalftoneConfigBuilder {
        HalftoneConfigBuilder::new()
    }

    /// Edit a copy of this configuration.
    pub fn to_builder(&self) -> HalftoneConfigBuilder {
        HalftoneConfigBuilder {
            config: self.clone(),
        }
    }

    /// Fresh module graph for one run.
    pub fn build(&self) -> Result<HalftoneMethod> {
        let mut method = self.method.build()?;
        method.set_seed(self.seed);
        Ok(method)
    }
}

/// Builder producing new [`HalftoneConfig`] values.
#[derive(Debug, Clone, Default)]
pub struct HalftoneConfigBuilder {
    config: HalftoneConfig,
}

impl HalftoneConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: MethodConfig) -> Self {
        self.config.method = method;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    /// Threshold method with the given parts.
    pub fn threshold(
        self,
        scan: ScanKind,
        threshold: ThresholdFilterConfig,
        error_filter: Option<ErrorFilterConfig>,
    ) -> Self {
        self.method(MethodConfig::Threshold {
            scan,
            threshold,
            error_filter,
        })
    }

    /// Replace the scan of a threshold method. No effect on clustering.
    pub fn scan(mut self, kind: ScanKind) -> Self {
        if let MethodConfig::Threshold { scan, .. } = &mut self.config.method {
            *scan = kind;
        }
        self
    }

    /// Replace the error filter of a threshold method. No effect on clustering.
    pub fn error_filter(mut self, filter: Option<ErrorFilterConfig>) -> Self {
        if let MethodConfig::Threshold { error_filter, .. } = &mut self.config.method {
            *error_filter = filter;
        }
        self
    }

    /// Replace the threshold filter of a threshold method. No effect on clustering.
    pub fn threshold_filter(mut self, filter: ThresholdFilterConfig) -> Self {
        if let MethodConfig::Threshold { threshold, .. } = &mut self.config.method {
            *threshold = filter;
        }
        self
    }

    pub fn build(self) -> HalftoneConfig {
        self.config
    }
}

/// Halftone row-major 8-bit grayscale pixels with a configuration.
pub fn halftone(data: Vec<u8>, width: usize, height: usize, config: &HalftoneConfig) -> Result<Vec<u8>> {
    let mut image = GrayImage::new(data, width, height)?;
    let mut method = config.build()?;
    method.run(&mut image)?;
    Ok(image.into_data())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_json() {
        let config = HalftoneConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(HalftoneConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_parse_minimal_json() {
        let config = HalftoneConfig::from_json(
            r#"{
                "method": {
                    "type": "threshold",
                    "scan": "hilbert",
                    "threshold": { "type": "matrix", "matrix": { "bayer": 3 } },
                    "error_filter": { "type": "vector", "matrix": "vector-two-tap" }
                },
                "seed": 9
            }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(9));
        match &config.method {
            MethodConfig::Threshold {
                scan,
                threshold,
                error_filter,
            } => {
                assert_eq!(*scan, ScanKind::Hilbert);
                assert_eq!(
                    threshold,
                    &ThresholdFilterConfig::Matrix {
                        matrix: ThresholdMatrixSpec::Bayer { bayer: 3 }
                    }
                );
                assert!(error_filter.is_some());
            }
            other => panic!("unexpected method {:?}", other),
        }
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_custom_matrix_spec() {
        let spec: ErrorMatrixSpec = serde_json::from_str(
            r#"{"width": 3, "height": 1, "numerators": [0, 1, 1], "divisor": 2}"#,
        )
        .unwrap();
        let m = spec.build().unwrap();
        assert_eq!(m.offset(), 0);
        assert!((m.weight_sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_configuration_errors_surface_at_build() {
        let unknown = ErrorFilterConfig::Matrix {
            matrix: ErrorMatrixSpec::named("nope"),
        };
        assert_eq!(
            unknown.build().unwrap_err(),
            HalftoneError::UnknownModule {
                category: "error matrix",
                name: "nope".to_string()
            }
        );

        let not_vector = ErrorFilterConfig::Vector {
            matrix: ErrorMatrixSpec::named("stucki"),
        };
        assert_eq!(not_vector.build().unwrap_err(), HalftoneError::NotAVector(3));

        let bad_bayer = ThresholdMatrixSpec::Bayer { bayer: 9 };
        assert_eq!(bad_bayer.build().unwrap_err(), HalftoneError::BayerOrder(9));

        let bad_cells = MethodConfig::SfcClustering {
            min_cell_size: 0,
            max_cell_size: 4,
            error_matrix: None,
            adaptive: false,
            positioning: false,
        };
        assert_eq!(
            bad_cells.build().unwrap_err(),
            HalftoneError::InvalidCellSize { min: 0, max: 4 }
        );

        let bad_spot = ThresholdFilterConfig::SpotFunction {
            spot: SpotConfig {
                distance: 0.0,
                ..SpotConfig::default()
            },
        };
        assert!(matches!(
            bad_spot.build(),
            Err(HalftoneError::InvalidSpotDistance(_))
        ));
    }

    #[test]
    fn test_builder_produces_new_values() {
        let base = HalftoneConfig::default();
        let edited = base
            .to_builder()
            .scan(ScanKind::Scanline)
            .error_filter(None)
            .seed(Some(1))
            .build();
        assert_ne!(edited, base);
        assert_eq!(base, HalftoneConfig::default());
        match edited.method {
            MethodConfig::Threshold {
                scan, error_filter, ..
            } => {
                assert_eq!(scan, ScanKind::Scanline);
                assert!(error_filter.is_none());
            }
            other => panic!("unexpected method {:?}", other),
        }
    }

    #[test]
    fn test_halftone_plain_threshold() {
        let config = HalftoneConfig::builder()
            .threshold(ScanKind::Scanline, ThresholdFilterConfig::default(), None)
            .build();
        let out = halftone(vec![0, 255, 255, 0], 2, 2, &config).unwrap();
        assert_eq!(out, vec![0, 255, 255, 0]);
    }

    #[test]
    fn test_halftone_rejects_bad_pixel_count() {
        let err = halftone(vec![0; 3], 2, 2, &HalftoneConfig::default()).unwrap_err();
        assert_eq!(err, HalftoneError::PixelCount { len: 3, width: 2, height: 2 });
    }

    #[test]
    fn test_halftone_rejects_overflowing_dimensions() {
        let err = halftone(Vec::new(), usize::MAX, 2, &HalftoneConfig::default()).unwrap_err();
        assert_eq!(err, HalftoneError::ImageTooLarge { width: usize::MAX, height: 2 });
        let err = halftone(Vec::new(), 65536, 65536, &HalftoneConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            HalftoneError::PixelCount { .. } | HalftoneError::ImageTooLarge { .. }
        ));
    }

    #[test]
    fn test_every_error_filter_config_builds() {
        let configs = [
            r#"{"type":"matrix","matrix":"atkinson"}"#,
            r#"{"type":"vector"}"#,
            r#"{"type":"dynamic-matrix","ranges":[{"start":0,"matrix":"stucki"},{"start":128,"matrix":"burkes"}]}"#,
            r#"{"type":"perturbed","strength":0.5}"#,
            r#"{"type":"randomized","randomize_count":true}"#,
        ];
        for json in configs {
            let config: ErrorFilterConfig = serde_json::from_str(json).unwrap();
            assert!(config.build().is_ok(), "{}", json);
        }
    }

    #[test]
    fn test_every_threshold_filter_config_builds() {
        let configs = [
            r#"{"type":"matrix","matrix":"cluster-8"}"#,
            r#"{"type":"dynamic-matrix","ranges":[{"start":0,"matrix":"bayer-4","noise":0.1}]}"#,
            r#"{"type":"spot-function","spot":{"shape":"euclidean","angle":15,"distance":6}}"#,
            r#"{"type":"image","filters":[{"type":"box-blur","radius":1},{"type":"invert"}]}"#,
        ];
        for json in configs {
            let config: ThresholdFilterConfig = serde_json::from_str(json).unwrap();
            assert!(config.build().is_ok(), "{}", json);
        }
    }
}
