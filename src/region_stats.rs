use std::fmt;

use ndarray::s;

use crate::error::ViewerError;
use crate::selection::SelectionRect;
use crate::slice::Slice;

/// Summary of raw pixel values inside a rectangular region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStatistics {
    /// Pixel count.
    pub area: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
}

impl fmt::Display for RegionStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Area: {} px  Mean: {:.2}  SD: {:.2}",
            self.area, self.mean, self.stddev
        )
    }
}

/// Compute area, mean and population standard deviation of the raw values
/// inside `rect` (bounds inclusive).
///
/// Uses two passes over the region so the deviation is not lost to
/// cancellation on large value ranges. A rectangle that is inverted or
/// reaches outside the slice is rejected with [`ViewerError::InvalidRegion`].
pub fn region_stats(slice: &Slice, rect: SelectionRect) -> Result<RegionStatistics, ViewerError> {
    let (width, height) = slice.dim();
    if rect.x0 > rect.x1 || rect.y0 > rect.y1 || rect.x1 >= width || rect.y1 >= height {
        return Err(ViewerError::InvalidRegion(rect, width, height));
    }

    let pixels = slice.pixels();
    let region = pixels.slice(s![rect.y0..=rect.y1, rect.x0..=rect.x1]);
    let area = region.len();
    let count = area as f64;

    let sum: f64 = region.iter().map(|&v| f64::from(v)).sum();
    let mean = sum / count;
    let squared_deviation: f64 = region
        .iter()
        .map(|&v| {
            let diff = f64::from(v) - mean;
            diff * diff
        })
        .sum();
    let stddev = (squared_deviation / count).sqrt();

    Ok(RegionStatistics { area, mean, stddev })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    const EPSILON: f64 = 1e-9;

    fn four_by_four() -> Slice {
        Slice::from_raw("grid", 4, 4, (1..=16).collect()).unwrap()
    }

    #[test]
    fn inner_two_by_two() {
        let stats = region_stats(&four_by_four(), SelectionRect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(stats.area, 4);
        assert!((stats.mean - 8.5).abs() < EPSILON);
        assert!((stats.stddev - 2.5f64.sqrt()).abs() < EPSILON);
        assert_eq!(stats.to_string(), "Area: 4 px  Mean: 8.50  SD: 1.58");
    }

    #[test]
    fn whole_slice() {
        let stats = region_stats(&four_by_four(), SelectionRect::new(0, 0, 3, 3)).unwrap();
        assert_eq!(stats.area, 16);
        assert!((stats.mean - 8.5).abs() < EPSILON);
        // population variance of 1..=16 is (16² - 1) / 12
        assert!((stats.stddev - (255.0f64 / 12.0).sqrt()).abs() < EPSILON);
    }

    #[test]
    fn constant_slice_has_no_deviation() {
        for (w, h) in [(1, 1), (5, 3), (64, 64)] {
            let slice = Slice::new("k", Array2::from_elem((h, w), -731));
            let stats = region_stats(&slice, SelectionRect::new(0, 0, w - 1, h - 1)).unwrap();
            assert_eq!(stats.area, w * h);
            assert_eq!(stats.mean, -731.0);
            assert_eq!(stats.stddev, 0.0);
        }
    }

    #[test]
    fn single_pixel() {
        let slice = four_by_four();
        for (x, y) in [(0, 0), (3, 0), (2, 3), (3, 3)] {
            let stats = region_stats(&slice, SelectionRect::new(x, y, x, y)).unwrap();
            assert_eq!(stats.area, 1);
            assert_eq!(stats.stddev, 0.0);
            assert_eq!(stats.mean, f64::from(slice.value_at(x, y).unwrap()));
        }
    }

    #[test]
    fn large_offset_values_stay_precise() {
        let data = vec![1_000_000_000, 1_000_000_001, 1_000_000_002, 1_000_000_003];
        let slice = Slice::from_raw("big", 2, 2, data).unwrap();
        let stats = region_stats(&slice, SelectionRect::new(0, 0, 1, 1)).unwrap();
        assert!((stats.stddev - 1.25f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn rejects_inverted_and_out_of_bounds() {
        let slice = four_by_four();
        let inverted = SelectionRect {
            x0: 2,
            y0: 0,
            x1: 1,
            y1: 0,
        };
        assert!(matches!(
            region_stats(&slice, inverted),
            Err(ViewerError::InvalidRegion(_, 4, 4))
        ));
        assert!(matches!(
            region_stats(&slice, SelectionRect::new(0, 0, 4, 0)),
            Err(ViewerError::InvalidRegion(..))
        ));
    }
}
