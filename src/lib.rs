/// Halftoning engine - Rust/WASM
///
/// Converts 8-bit grayscale images to bi-level (0 / 255) output with
/// pluggable threshold filters, error filters and scanning orders, or with
/// cell clustering along a Hilbert curve.
///
/// The WASM surface takes raw pixel buffers plus a JSON configuration so no
/// module objects cross the boundary.

use wasm_bindgen::prelude::*;

pub mod buffer;
pub mod config;
pub mod dynamic_table;
pub mod error;
pub mod error_buffer;
pub mod error_filter;
pub mod image_filter;
pub mod matrix;
pub mod method;
pub mod module;
pub mod scan;
pub mod spot_function;
pub mod threshold_filter;

pub use buffer::{BufferScope, GrayImage, Image};
pub use config::{halftone, HalftoneConfig, HalftoneConfigBuilder};
pub use error::{HalftoneError, Result};
pub use method::HalftoneMethod;
pub use module::{Module, RunInfo};

use matrix::{ErrorMatrix, ThresholdMatrix};
use spot_function::SpotShape;

fn to_js(e: HalftoneError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Listing of every registered module and built-in sample, as JSON.
pub fn module_listing() -> serde_json::Value {
    let entries = |list: Vec<(&str, &str, &str)>| -> Vec<serde_json::Value> {
        list.into_iter()
            .map(|(id, name, description)| {
                serde_json::json!({ "id": id, "name": name, "description": description })
            })
            .collect()
    };
    serde_json::json!({
        "scanning_orders": entries(module::describe(module::SCANNING_ORDERS)),
        "error_filters": entries(module::describe(module::ERROR_FILTERS)),
        "threshold_filters": entries(module::describe(module::THRESHOLD_FILTERS)),
        "error_matrices": ErrorMatrix::sample_names().collect::<Vec<_>>(),
        "threshold_matrices": ThresholdMatrix::sample_names().collect::<Vec<_>>(),
        "spot_shapes": SpotShape::ALL.iter().map(|s| s.id()).collect::<Vec<_>>(),
    })
}

// ============================================================================
// WASM entry points
// ============================================================================

/// Halftone row-major grayscale pixels.
///
/// `config_json` is a serialized `HalftoneConfig`; an empty string uses the
/// defaults (serpentine Floyd-Steinberg at threshold 128).
#[wasm_bindgen]
pub fn halftone_gray(data: Vec<u8>, width: u32, height: u32, config_json: &str) -> std::result::Result<Vec<u8>, JsValue> {
    let config = if config_json.trim().is_empty() {
        HalftoneConfig::default()
    } else {
        HalftoneConfig::from_json(config_json).map_err(to_js)?
    };
    halftone(data, width as usize, height as usize, &config).map_err(to_js)
}

/// JSON listing of available modules and samples.
#[wasm_bindgen]
pub fn list_modules() -> String {
    module_listing().to_string()
}

/// Default configuration as JSON, a starting point for editing.
#[wasm_bindgen]
pub fn default_config() -> std::result::Result<String, JsValue> {
    HalftoneConfig::default().to_json().map_err(to_js)
}
