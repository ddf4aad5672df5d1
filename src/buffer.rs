/// Single-channel image access for halftoning runs.
///
/// Provides:
/// - `Image`: the collaborator contract methods read from and write to
/// - `GrayImage`: owned 8-bit grayscale image with optional write buffering
/// - `BufferScope`: guard pairing `init_buffer` with `flush_buffer`
///
/// While buffering is active, writes land in a pending copy and reads keep
/// returning the source pixels, so a method can overwrite pixels it has
/// already visited without disturbing later reads.

use std::ops::{Deref, DerefMut};

use crate::error::{HalftoneError, Result};
use crate::scan::{Point, ScanKind};

pub trait Image {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn get_pixel(&self, x: usize, y: usize) -> u8;

    fn set_pixel(&mut self, x: usize, y: usize, value: u8);

    /// Start collecting writes.
    fn init_buffer(&mut self);

    /// Commit collected writes.
    fn flush_buffer(&mut self);

    /// Visit `points` in order, replacing each pixel with `f(x, y, value)`.
    fn iterate_direct<P, F>(&mut self, points: P, mut f: F)
    where
        Self: Sized,
        P: IntoIterator<Item = Point>,
        F: FnMut(usize, usize, u8) -> u8,
    {
        for (x, y) in points {
            let value = self.get_pixel(x, y);
            self.set_pixel(x, y, f(x, y, value));
        }
    }

    /// Row-major variant of `iterate_direct`.
    fn iterate_by_rows<F>(&mut self, f: F)
    where
        Self: Sized,
        F: FnMut(usize, usize, u8) -> u8,
    {
        let points = ScanKind::Scanline.points(self.width(), self.height());
        self.iterate_direct(points, f);
    }
}

// ============================================================================
// GrayImage
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
    pending: Option<Vec<u8>>,
}

impl GrayImage {
    /// Wrap row-major pixel data. Fails on a length mismatch or empty image.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HalftoneError::EmptyImage);
        }
        let len = width
            .checked_mul(height)
            .ok_or(HalftoneError::ImageTooLarge { width, height })?;
        if data.len() != len {
            return Err(HalftoneError::PixelCount {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            data,
            pending: None,
        })
    }

    /// Image filled with a constant intensity.
    pub fn filled(width: usize, height: usize, value: u8) -> Result<Self> {
        let len = width
            .checked_mul(height)
            .ok_or(HalftoneError::ImageTooLarge { width, height })?;
        Self::new(vec![value; len], width, height)
    }

    /// Committed pixels, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn is_buffering(&self) -> bool {
        self.pending.is_some()
    }
}

impl Image for GrayImage {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn get_pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, value: u8) {
        let idx = y * self.width + x;
        match self.pending.as_mut() {
            Some(pending) => pending[idx] = value,
            None => self.data[idx] = value,
        }
    }

    fn init_buffer(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.data.clone());
        }
    }

    fn flush_buffer(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.data = pending;
        }
    }
}

// ============================================================================
// Scoped buffering
// ============================================================================

/// Holds an image's write buffer open; flushes on drop, on every exit path.
pub struct BufferScope<'a, I: Image> {
    image: &'a mut I,
}

impl<'a, I: Image> BufferScope<'a, I> {
    pub fn new(image: &'a mut I) -> Self {
        image.init_buffer();
        Self { image }
    }
}

impl<I: Image> Deref for BufferScope<'_, I> {
    type Target = I;

    fn deref(&self) -> &I {
        self.image
    }
}

impl<I: Image> DerefMut for BufferScope<'_, I> {
    fn deref_mut(&mut self) -> &mut I {
        self.image
    }
}

impl<I: Image> Drop for BufferScope<'_, I> {
    fn drop(&mut self) {
        self.image.flush_buffer();
    }
}
