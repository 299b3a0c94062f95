use ndarray::{Array2, ArrayView2};

use crate::error::ViewerError;

/// A single 2D grayscale image with its raw (Hounsfield-like) pixel values.
///
/// Pixels are stored row-major as `(height, width)`. A slice is immutable once
/// built; a new study replaces slices wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    label: String,
    pixels: Array2<i32>,
    value_range: (i32, i32),
}

impl Slice {
    /// Build a slice from a pixel grid, computing its value range.
    pub fn new(label: impl Into<String>, pixels: Array2<i32>) -> Self {
        let value_range = Self::min_max(&pixels.view());
        Self::with_value_range(label, pixels, value_range)
    }

    /// Build a slice with an externally supplied display range hint.
    pub fn with_value_range(
        label: impl Into<String>,
        pixels: Array2<i32>,
        value_range: (i32, i32),
    ) -> Self {
        let pixels = if pixels.is_standard_layout() {
            pixels
        } else {
            pixels.as_standard_layout().into_owned()
        };
        Self {
            label: label.into(),
            pixels,
            value_range,
        }
    }

    /// Build a slice from a row-major buffer of `width * height` values.
    pub fn from_raw(
        label: impl Into<String>,
        width: usize,
        height: usize,
        data: Vec<i32>,
    ) -> Result<Self, ViewerError> {
        let pixels = Array2::from_shape_vec((height, width), data)?;
        Ok(Self::new(label, pixels))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    /// Get the dimensions of the slice (width, height)
    pub fn dim(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn pixels(&self) -> ArrayView2<'_, i32> {
        self.pixels.view()
    }

    /// Intrinsic (min, max) of the raw values, or the hint given at construction.
    pub fn value_range(&self) -> (i32, i32) {
        self.value_range
    }

    pub fn value_at(&self, x: usize, y: usize) -> Option<i32> {
        self.pixels.get((y, x)).copied()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }

    fn min_max(pixels: &ArrayView2<'_, i32>) -> (i32, i32) {
        pixels
            .iter()
            .copied()
            .fold(None, |acc, value| match acc {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            })
            .unwrap_or((0, 0))
    }
}
