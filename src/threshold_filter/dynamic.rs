/// Threshold matrix chosen per pixel from an intensity-keyed table, with
/// optional per-range noise.

use rand::rngs::StdRng;
use rand::Rng;

use crate::dynamic_table::DynamicMatrixTable;
use crate::error::Result;
use crate::matrix::ThresholdMatrix;
use crate::module::{Module, RunInfo};

const RNG_SALT: u64 = 0x7468_7265;

/// Table record for one intensity range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThresholdMatrixRecord {
    pub matrix: ThresholdMatrix,
    /// Noise amplitude 0-1, mapped onto `±noise * 127.5`
    pub noise: f32,
}

impl ThresholdMatrixRecord {
    pub fn new(matrix: ThresholdMatrix, noise: f32) -> Self {
        Self {
            matrix,
            noise: noise.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DynamicMatrixThresholdFilter {
    table: DynamicMatrixTable<ThresholdMatrixRecord>,
    rng: Option<StdRng>,
}

impl DynamicMatrixThresholdFilter {
    pub fn new(table: DynamicMatrixTable<ThresholdMatrixRecord>) -> Self {
        Self { table, rng: None }
    }

    pub fn table(&self) -> &DynamicMatrixTable<ThresholdMatrixRecord> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DynamicMatrixTable<ThresholdMatrixRecord> {
        &mut self.table
    }

    pub fn record_for(&self, intensity: f32) -> &ThresholdMatrixRecord {
        let key = intensity.round().clamp(0.0, 255.0) as i32;
        self.table
            .get_record(key, true)
            .unwrap_or_else(|| self.table.default_record())
    }

    pub fn threshold(&mut self, intensity: f32, x: usize, y: usize) -> f32 {
        let key = intensity.round().clamp(0.0, 255.0) as i32;
        let record = match self.table.get_record(key, true) {
            Some(record) => record,
            None => self.table.default_record(),
        };
        let base = record.matrix.threshold(x, y);
        let half = record.noise * 127.5;
        match self.rng.as_mut() {
            Some(rng) if half > 0.0 => base + rng.gen_range(-half..=half),
            _ => base,
        }
    }
}

impl Module for DynamicMatrixThresholdFilter {
    fn name(&self) -> &'static str {
        "Dynamic matrix threshold filter"
    }

    fn description(&self) -> &'static str {
        "Selects the threshold matrix and noise level by source intensity range"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        self.rng = Some(run.rng(RNG_SALT));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanKind;

    fn filter(noise: f32) -> DynamicMatrixThresholdFilter {
        let mut table = DynamicMatrixTable::new();
        table.add_record(0, ThresholdMatrixRecord::new(ThresholdMatrix::constant(40), noise));
        table.add_record(128, ThresholdMatrixRecord::new(ThresholdMatrix::constant(200), noise));
        let mut f = DynamicMatrixThresholdFilter::new(table);
        f.init(&RunInfo::new(4, 4, ScanKind::Scanline).with_seed(Some(4)))
            .unwrap();
        f
    }

    #[test]
    fn test_matrix_selected_by_intensity() {
        let mut f = filter(0.0);
        assert_eq!(f.threshold(-10.0, 0, 0), 40.0);
        assert_eq!(f.threshold(127.0, 0, 0), 40.0);
        assert_eq!(f.threshold(128.0, 0, 0), 200.0);
        assert_eq!(f.threshold(999.0, 0, 0), 200.0);
    }

    #[test]
    fn test_noise_bounded_by_amplitude() {
        let mut f = filter(0.2);
        let mut varied = false;
        for i in 0..500 {
            let t = f.threshold(10.0, i % 4, i / 4);
            assert!((t - 40.0).abs() <= 0.2 * 127.5 + 1e-3);
            varied |= t != 40.0;
        }
        assert!(varied);
    }

    #[test]
    fn test_empty_table_uses_default_record() {
        let mut f = DynamicMatrixThresholdFilter::default();
        assert_eq!(f.threshold(12.0, 3, 1), 128.0);
        assert_eq!(f.record_for(12.0), &ThresholdMatrixRecord::default());
    }
}
