//! Halftoning CLI Tool
//!
//! Command-line front end for the halftoning engine: converts an image to
//! grayscale and renders it as bi-level output.
//!
//! Supports:
//! - Threshold halftoning with matrix, dynamic, spot-function or image thresholds
//! - Error diffusion with any built-in error matrix (matrix, vector, perturbed, randomized)
//! - Scanline, serpentine and Hilbert scanning
//! - Space-filling curve clustering
//! - Full JSON configuration files (`--config`), or flags for the common cases
//! - Output formats: PNG, packed 1-bit binary
//! - Metadata JSON output with configuration and dimensions

use clap::{Parser, ValueEnum};
use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Luma};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use halftone_wasm::config::{
    ErrorFilterConfig, ErrorMatrixSpec, HalftoneConfig, MethodConfig, SpotConfig,
    ThresholdFilterConfig, ThresholdMatrixSpec,
};
use halftone_wasm::scan::ScanKind;
use halftone_wasm::spot_function::SpotShape;
use halftone_wasm::{halftone, module_listing};

// ============================================================================
// Command Line Arguments
// ============================================================================

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Method {
    /// Per-pixel thresholding with optional error diffusion
    Threshold,
    /// Cell clustering along a Hilbert curve
    Sfc,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scan {
    Scanline,
    Serpentine,
    Hilbert,
}

impl Scan {
    fn kind(self) -> ScanKind {
        match self {
            Scan::Scanline => ScanKind::Scanline,
            Scan::Serpentine => ScanKind::Serpentine,
            Scan::Hilbert => ScanKind::Hilbert,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ErrorFilterKind {
    /// No error diffusion
    None,
    /// Fixed error matrix over image rows
    Matrix,
    /// Single-row matrix along the scanning path (use with --scan hilbert)
    Vector,
    /// Matrix with sum-preserving coefficient noise
    Perturbed,
    /// Randomly regenerated coefficients every pixel
    Randomized,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThresholdKind {
    /// Tiled threshold matrix
    Matrix,
    /// Spot function evaluated per pixel
    Spot,
    /// Precomputed spot function map
    Image,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shape {
    Euclidean,
    Round,
    Square,
    Diamond,
    Line,
    Triangle,
}

impl Shape {
    fn spot_shape(self) -> SpotShape {
        match self {
            Shape::Euclidean => SpotShape::Euclidean,
            Shape::Round => SpotShape::Round,
            Shape::Square => SpotShape::Square,
            Shape::Diamond => SpotShape::Diamond,
            Shape::Line => SpotShape::Line,
            Shape::Triangle => SpotShape::Triangle,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "halftone")]
#[command(author, version, about = "Halftoning Tool - Threshold, error diffusion and space-filling curve halftoning", long_about = None)]
struct Args {
    /// Input image path
    #[arg(short, long, required_unless_present_any = ["list", "dump_config"])]
    input: Option<PathBuf>,

    /// Output PNG image path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output packed 1-bit binary file path (optional), rows padded to bytes
    #[arg(long)]
    output_bin: Option<PathBuf>,

    /// Output metadata JSON file path (optional)
    #[arg(long)]
    output_meta: Option<PathBuf>,

    /// JSON configuration file; overrides the method flags below
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Halftoning method
    #[arg(short, long, value_enum, default_value_t = Method::Threshold)]
    method: Method,

    /// Scanning order (threshold method)
    #[arg(long, value_enum, default_value_t = Scan::Serpentine)]
    scan: Scan,

    /// Error filter (threshold method)
    #[arg(short, long, value_enum, default_value_t = ErrorFilterKind::Matrix)]
    error_filter: ErrorFilterKind,

    /// Error matrix name (see --list)
    #[arg(long, default_value = "floyd-steinberg")]
    error_matrix: String,

    /// Threshold filter (threshold method)
    #[arg(short, long, value_enum, default_value_t = ThresholdKind::Matrix)]
    threshold: ThresholdKind,

    /// Threshold matrix name (see --list)
    #[arg(long, default_value = "constant-128")]
    threshold_matrix: String,

    /// Spot shape for spot and image thresholds
    #[arg(long, value_enum, default_value_t = Shape::Round)]
    spot: Shape,

    /// Screen angle in degrees
    #[arg(long, default_value_t = 45.0)]
    angle: f64,

    /// Screen cell period in pixels
    #[arg(long, default_value_t = 8.0)]
    distance: f64,

    /// Minimum cell size (sfc method)
    #[arg(long, default_value_t = 1)]
    min_cell: usize,

    /// Maximum cell size (sfc method)
    #[arg(long, default_value_t = 8)]
    max_cell: usize,

    /// Disable adaptive cell sizing (sfc method)
    #[arg(long)]
    fixed_cells: bool,

    /// Random seed; omit for a different result every run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Shrink the image so its longer side is at most this many pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_size: Option<u32>,

    /// List available modules and samples, then exit
    #[arg(long)]
    list: bool,

    /// Print the effective configuration as JSON, then exit
    #[arg(long)]
    dump_config: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Configuration
// ============================================================================

fn config_from_flags(args: &Args) -> HalftoneConfig {
    let spot = SpotConfig {
        shape: args.spot.spot_shape(),
        angle: args.angle,
        distance: args.distance,
    };
    let matrix = ErrorMatrixSpec::named(&args.error_matrix);

    let method = match args.method {
        Method::Threshold => {
            let threshold = match args.threshold {
                ThresholdKind::Matrix => ThresholdFilterConfig::Matrix {
                    matrix: ThresholdMatrixSpec::named(&args.threshold_matrix),
                },
                ThresholdKind::Spot => ThresholdFilterConfig::SpotFunction { spot },
                ThresholdKind::Image => ThresholdFilterConfig::Image {
                    spot,
                    filters: Vec::new(),
                },
            };
            let error_filter = match args.error_filter {
                ErrorFilterKind::None => None,
                ErrorFilterKind::Matrix => Some(ErrorFilterConfig::Matrix { matrix }),
                ErrorFilterKind::Vector => Some(ErrorFilterConfig::Vector { matrix }),
                ErrorFilterKind::Perturbed => Some(ErrorFilterConfig::Perturbed {
                    matrix,
                    strength: 1.0,
                }),
                ErrorFilterKind::Randomized => Some(ErrorFilterConfig::Randomized {
                    matrix,
                    randomize_count: false,
                }),
            };
            MethodConfig::Threshold {
                scan: args.scan.kind(),
                threshold,
                error_filter,
            }
        }
        Method::Sfc => MethodConfig::SfcClustering {
            min_cell_size: args.min_cell,
            max_cell_size: args.max_cell,
            error_matrix: match args.error_filter {
                ErrorFilterKind::None => None,
                _ => Some(ErrorMatrixSpec::named("vector-forward")),
            },
            adaptive: !args.fixed_cells,
            positioning: true,
        },
    };

    HalftoneConfig::builder().method(method).seed(args.seed).build()
}

fn load_config(args: &Args) -> Result<HalftoneConfig, String> {
    match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            let config = HalftoneConfig::from_json(&json)
                .map_err(|e| format!("{}: {}", path.display(), e))?;
            // A seed on the command line wins over the file
            Ok(match args.seed {
                Some(seed) => config.to_builder().seed(Some(seed)).build(),
                None => config,
            })
        }
        None => Ok(config_from_flags(args)),
    }
}

// ============================================================================
// Image Loading and Output
// ============================================================================

type LumaImage = ImageBuffer<Luma<u8>, Vec<u8>>;

fn load_grayscale(path: &PathBuf, max_size: Option<u32>) -> Result<LumaImage, String> {
    log::info!("Loading: {}", path.display());
    let img = image::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    log::debug!("  Dimensions: {}x{}", img.width(), img.height());
    Ok(fit_within(img, max_size).to_luma8())
}

/// Shrink `img` to fit a `bound x bound` box, keeping its aspect ratio.
fn fit_within(img: DynamicImage, bound: Option<u32>) -> DynamicImage {
    match bound {
        Some(bound) if img.width().max(img.height()) > bound => {
            let fitted = img.resize(bound, bound, FilterType::Lanczos3);
            log::info!(
                "Downscaled {}x{} -> {}x{}",
                img.width(),
                img.height(),
                fitted.width(),
                fitted.height()
            );
            fitted
        }
        _ => img,
    }
}

fn save_png(path: &PathBuf, data: Vec<u8>, width: u32, height: u32) -> Result<(), String> {
    let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, data)
        .ok_or_else(|| "Failed to create grayscale image buffer".to_string())?;
    img.save(path)
        .map_err(|e| format!("Failed to save {}: {}", path.display(), e))
}

/// Pack bi-level pixels MSB first, 1 = white, each row padded to a byte.
fn pack_bits(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let stride = (width + 7) / 8;
    let mut out = vec![0u8; stride * height];
    for y in 0..height {
        for x in 0..width {
            if data[y * width + x] >= 128 {
                out[y * stride + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    out
}

fn write_file(path: &PathBuf, bytes: &[u8]) -> Result<(), String> {
    let mut file =
        File::create(path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    file.write_all(bytes)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

fn write_metadata(
    path: &PathBuf,
    args: &Args,
    config: &HalftoneConfig,
    width: u32,
    height: u32,
    black: usize,
    outputs: &[(String, PathBuf, usize)],
) -> Result<(), String> {
    let meta = serde_json::json!({
        "input": args.input.as_ref().map(|p| p.display().to_string()),
        "width": width,
        "height": height,
        "black_pixels": black,
        "config": config,
        "outputs": outputs
            .iter()
            .map(|(kind, path, size)| serde_json::json!({
                "type": kind,
                "path": path.display().to_string(),
                "size_bytes": size,
            }))
            .collect::<Vec<_>>(),
    });
    let json = serde_json::to_string_pretty(&meta)
        .map_err(|e| format!("Failed to encode metadata: {}", e))?;
    write_file(path, json.as_bytes())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<(), String> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if args.list {
        let listing = serde_json::to_string_pretty(&module_listing())
            .map_err(|e| format!("Failed to encode listing: {}", e))?;
        println!("{}", listing);
        return Ok(());
    }

    let config = load_config(&args)?;
    if args.dump_config {
        println!("{}", config.to_json().map_err(|e| e.to_string())?);
        return Ok(());
    }

    if args.output.is_none() && args.output_bin.is_none() && args.output_meta.is_none() {
        return Err("No output specified. Use --output, --output-bin, or --output-meta".to_string());
    }

    let input = args
        .input
        .as_ref()
        .ok_or_else(|| "No input specified. Use --input".to_string())?;
    let luma = load_grayscale(input, args.max_size)?;
    let (width, height) = luma.dimensions();
    let data = luma.into_raw();

    log::info!("Halftoning {}x{}", width, height);
    let result = halftone(data, width as usize, height as usize, &config).map_err(|e| e.to_string())?;
    let black = result.iter().filter(|&&v| v == 0).count();

    let mut outputs: Vec<(String, PathBuf, usize)> = Vec::new();

    if let Some(ref bin_path) = args.output_bin {
        log::info!("Writing binary (1-bit packed): {}", bin_path.display());
        let packed = pack_bits(&result, width as usize, height as usize);
        write_file(bin_path, &packed)?;
        outputs.push(("binary_1bit".to_string(), bin_path.clone(), packed.len()));
    }

    if let Some(ref png_path) = args.output {
        log::info!("Writing PNG: {}", png_path.display());
        save_png(png_path, result, width, height)?;
        let size = std::fs::metadata(png_path)
            .map(|m| m.len() as usize)
            .unwrap_or(0);
        outputs.push(("png".to_string(), png_path.clone(), size));
    }

    if let Some(ref meta_path) = args.output_meta {
        log::info!("Writing metadata: {}", meta_path.display());
        write_metadata(meta_path, &args, &config, width, height, black, &outputs)?;
    }

    log::info!("Done!");
    Ok(())
}
