use std::ops::RangeInclusive;

use crate::window_mapper::WindowSetting;

/// Largest display intensity for 8-bit display surfaces.
pub const DISPLAY_MAX: u8 = 255;

/// Deployment settings for a [`ViewerSession`](crate::viewer::ViewerSession).
///
/// The level and width ranges mirror the slider bounds of the host UI. They
/// are a configuration choice, not a numeric limit of the window transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub level_range: RangeInclusive<i32>,
    pub width_range: RangeInclusive<i32>,
    pub default_window: WindowSetting,
    pub display_max: u8,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            level_range: -1000..=8190,
            width_range: 0..=8190,
            default_window: WindowSetting::new(40, 400),
            display_max: DISPLAY_MAX,
        }
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level_range(mut self, range: RangeInclusive<i32>) -> Self {
        self.level_range = range;
        self
    }

    /// Negative lower bounds are raised to zero, a window never has negative width.
    pub fn with_width_range(mut self, range: RangeInclusive<i32>) -> Self {
        let (start, end) = range.into_inner();
        self.width_range = start.max(0)..=end.max(0);
        self
    }

    pub fn with_default_window(mut self, window: WindowSetting) -> Self {
        self.default_window = window;
        self
    }

    pub fn with_display_max(mut self, display_max: u8) -> Self {
        self.display_max = display_max;
        self
    }

    /// Clamp a requested window into the configured level and width ranges.
    pub fn clamp_window(&self, level: i32, width: i32) -> WindowSetting {
        WindowSetting::new(
            level.clamp(*self.level_range.start(), *self.level_range.end()),
            width.clamp(*self.width_range.start(), *self.width_range.end()),
        )
    }
}
