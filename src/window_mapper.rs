use image::{GrayImage, ImageBuffer};
use rayon::prelude::*;

use crate::config::DISPLAY_MAX;
use crate::slice::Slice;

/// Window level (center) and width (span) of the raw values shown on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSetting {
    pub level: i32,
    pub width: i32,
}

impl WindowSetting {
    /// Negative widths are treated as zero.
    pub fn new(level: i32, width: i32) -> Self {
        Self {
            level,
            width: width.max(0),
        }
    }

    /// Window spanning exactly `[min, max]`.
    pub fn from_value_range((min, max): (i32, i32)) -> Self {
        let (min, max) = (i64::from(min.min(max)), i64::from(min.max(max)));
        let level = (min + max).div_euclid(2);
        Self::new(level as i32, (max - min).min(i64::from(i32::MAX)) as i32)
    }

    /// Lower and upper edge of the window: `level ∓ width / 2`.
    pub fn bounds(&self) -> (f64, f64) {
        let half = f64::from(self.width) / 2.0;
        (f64::from(self.level) - half, f64::from(self.level) + half)
    }
}

/// Linear windowing transform from raw values to `[0, display_max]`.
///
/// Values at or below the lower edge map to 0, values at or above the upper
/// edge map to `display_max`, and values in between are interpolated and
/// rounded half away from zero. A zero width is a step function at `level`:
/// `display_max` for `v >= level`, 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMapper {
    display_max: u8,
}

impl Default for WindowMapper {
    fn default() -> Self {
        Self::new(DISPLAY_MAX)
    }
}

impl WindowMapper {
    pub fn new(display_max: u8) -> Self {
        Self { display_max }
    }

    pub fn display_max(&self) -> u8 {
        self.display_max
    }

    #[inline]
    pub fn map_value(&self, value: i32, window: WindowSetting) -> u8 {
        if window.width <= 0 {
            return if value >= window.level {
                self.display_max
            } else {
                0
            };
        }

        let (low, high) = window.bounds();
        let value = f64::from(value);
        if value <= low {
            0
        } else if value >= high {
            self.display_max
        } else {
            let scaled = (value - low) / (high - low) * f64::from(self.display_max);
            scaled.round().clamp(0.0, f64::from(self.display_max)) as u8
        }
    }

    /// Window a whole slice into a display buffer of the same dimensions.
    pub fn render(&self, slice: &Slice, window: WindowSetting) -> GrayImage {
        let (width, height) = slice.dim();
        let pixels = slice.pixels();
        let pixel_data: Vec<u8> = match pixels.as_slice() {
            Some(raw) => raw
                .par_iter()
                .map(|&v| self.map_value(v, window))
                .collect(),
            None => pixels.iter().map(|&v| self.map_value(v, window)).collect(),
        };
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
            .unwrap_or_else(|| GrayImage::new(width as u32, height as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn ct_soft_tissue_window() {
        let mapper = WindowMapper::default();
        let window = WindowSetting::new(40, 400);
        assert_eq!(mapper.map_value(40, window), 128);
        assert_eq!(mapper.map_value(-1000, window), 0);
        assert_eq!(mapper.map_value(8190, window), 255);
    }

    #[test]
    fn saturates_at_window_edges() {
        let mapper = WindowMapper::default();
        let window = WindowSetting::new(40, 400);
        for v in [-5000, -161, -160] {
            assert_eq!(mapper.map_value(v, window), 0, "v = {v}");
        }
        for v in [240, 241, 30_000] {
            assert_eq!(mapper.map_value(v, window), 255, "v = {v}");
        }
    }

    #[test]
    fn odd_width_uses_fractional_edges() {
        let mapper = WindowMapper::default();
        let window = WindowSetting::new(0, 3);
        assert_eq!(window.bounds(), (-1.5, 1.5));
        assert_eq!(mapper.map_value(-1, window), 43);
        assert_eq!(mapper.map_value(1, window), 213);
        assert_eq!(mapper.map_value(2, window), 255);
    }

    #[test]
    fn monotonic_in_value() {
        let mapper = WindowMapper::default();
        for window in [
            WindowSetting::new(40, 400),
            WindowSetting::new(-600, 1),
            WindowSetting::new(1000, 8190),
            WindowSetting::new(7, 13),
        ] {
            let mut previous = 0u8;
            for v in -2000..9000 {
                let current = mapper.map_value(v, window);
                assert!(current >= previous, "{window:?} decreases at {v}");
                previous = current;
            }
        }
    }

    #[test]
    fn zero_width_is_a_step_at_level() {
        let mapper = WindowMapper::default();
        let window = WindowSetting::new(50, 0);
        assert_eq!(mapper.map_value(50, window), 255);
        assert_eq!(mapper.map_value(49, window), 0);
        assert_eq!(mapper.map_value(i32::MIN, window), 0);
        assert_eq!(mapper.map_value(i32::MAX, window), 255);
    }

    #[test]
    fn negative_width_is_clamped() {
        assert_eq!(WindowSetting::new(10, -3).width, 0);
    }

    #[test]
    fn custom_display_max() {
        let mapper = WindowMapper::new(100);
        let window = WindowSetting::new(0, 100);
        assert_eq!(mapper.map_value(1000, window), 100);
        assert_eq!(mapper.map_value(0, window), 50);
    }

    #[test]
    fn window_from_value_range() {
        assert_eq!(
            WindowSetting::from_value_range((-1024, 3071)),
            WindowSetting::new(1023, 4095)
        );
        assert_eq!(
            WindowSetting::from_value_range((5, 5)),
            WindowSetting::new(5, 0)
        );
    }

    #[test]
    fn render_is_row_major_and_repeatable() {
        let pixels = Array2::from_shape_fn((3, 4), |(y, x)| (y * 4 + x) as i32 * 100 - 500);
        let slice = Slice::new("r", pixels);
        let mapper = WindowMapper::default();
        let window = WindowSetting::new(0, 1000);

        let first = mapper.render(&slice, window);
        let second = mapper.render(&slice, window);
        assert_eq!(first.dimensions(), (4, 3));
        assert_eq!(first.as_raw(), second.as_raw());

        for (x, y, pixel) in first.enumerate_pixels() {
            let raw = slice.value_at(x as usize, y as usize).unwrap();
            assert_eq!(pixel.0[0], mapper.map_value(raw, window));
        }
    }
}
