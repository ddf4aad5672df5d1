/// Error filter whose matrix varies with the source pixel's intensity.

use super::{attach_buffer, diffuse};
use crate::dynamic_table::DynamicMatrixTable;
use crate::error::Result;
use crate::error_buffer::{BufferShape, ErrorBuffer};
use crate::matrix::ErrorMatrix;
use crate::module::{Module, RunInfo};

/// Table record holding the error matrix for one intensity range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorMatrixRecord {
    pub matrix: ErrorMatrix,
}

impl ErrorMatrixRecord {
    pub fn new(matrix: ErrorMatrix) -> Self {
        Self { matrix }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DynamicMatrixErrorFilter {
    table: DynamicMatrixTable<ErrorMatrixRecord>,
    buffer: Option<ErrorBuffer>,
}

impl DynamicMatrixErrorFilter {
    pub fn new(table: DynamicMatrixTable<ErrorMatrixRecord>) -> Self {
        Self {
            table,
            buffer: None,
        }
    }

    pub fn table(&self) -> &DynamicMatrixTable<ErrorMatrixRecord> {
        &self.table
    }

    /// Edit the table. Only valid between runs; clears the run buffer.
    pub fn table_mut(&mut self) -> &mut DynamicMatrixTable<ErrorMatrixRecord> {
        self.buffer = None;
        &mut self.table
    }

    /// Matrix used for a pixel of the given source intensity.
    pub fn matrix_for(&self, source: f32) -> &ErrorMatrix {
        let key = source.round().clamp(0.0, 255.0) as i32;
        match self.table.get_record(key, true) {
            Some(record) => &record.matrix,
            None => &self.table.default_record().matrix,
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    #[inline]
    pub fn get_error(&self) -> f32 {
        self.buffer.as_ref().map_or(0.0, |b| b.get_error())
    }

    pub fn set_error(&mut self, error: f32, source: f32) {
        let key = source.round().clamp(0.0, 255.0) as i32;
        let matrix = match self.table.get_record(key, true) {
            Some(record) => &record.matrix,
            None => &self.table.default_record().matrix,
        };
        if let Some(buffer) = self.buffer.as_mut() {
            diffuse(buffer, matrix, error);
        }
    }

    #[inline]
    pub fn move_next(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.move_next();
        }
    }
}

impl Module for DynamicMatrixErrorFilter {
    fn name(&self) -> &'static str {
        "Dynamic matrix error filter"
    }

    fn description(&self) -> &'static str {
        "Selects the error matrix by source intensity range"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        // Sized for the tallest matrix so swaps never need a resize mid-run
        let rows = self
            .table
            .all_records()
            .map(|r| r.matrix.height())
            .max()
            .unwrap_or(1);
        let columns = self
            .table
            .all_records()
            .map(|r| r.matrix.width())
            .max()
            .unwrap_or(1);
        self.buffer = attach_buffer(run, rows, columns, BufferShape::Matrix, self.name());
        Ok(())
    }
}
