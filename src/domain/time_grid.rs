//! Linear mapping between wall-clock times and the visible day window.
//!
//! Offsets are whole minutes since the window start. Pixel coordinates are
//! derived from offsets through a fixed `pixels_per_minute` scale.

use crate::domain::models::{ClockTime, TimelineConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    window_start: ClockTime,
    window_end: ClockTime,
    pixels_per_minute: f64,
    step_minutes: i64,
    min_duration_minutes: i64,
}

impl TimeGrid {
    /// Expects a validated configuration (see [`TimelineConfig::validate`]).
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self {
            window_start: config.window_start,
            window_end: config.window_end,
            pixels_per_minute: config.pixels_per_minute,
            step_minutes: i64::from(config.quantization_step_minutes.max(1)),
            min_duration_minutes: i64::from(config.min_block_duration_minutes),
        }
    }

    pub fn window_start(&self) -> ClockTime {
        self.window_start
    }

    pub fn window_end(&self) -> ClockTime {
        self.window_end
    }

    pub fn pixels_per_minute(&self) -> f64 {
        self.pixels_per_minute
    }

    pub fn step_minutes(&self) -> i64 {
        self.step_minutes
    }

    pub fn min_duration_minutes(&self) -> i64 {
        self.min_duration_minutes
    }

    pub fn window_length(&self) -> i64 {
        self.window_end.minutes_since_midnight() - self.window_start.minutes_since_midnight()
    }

    /// Latest offset a block of minimum duration may start at.
    pub fn latest_start(&self) -> i64 {
        (self.window_length() - self.min_duration_minutes).max(0)
    }

    pub fn time_to_offset(&self, time: ClockTime) -> i64 {
        time.minutes_since_midnight() - self.window_start.minutes_since_midnight()
    }

    /// Offsets outside the window are pinned to its edges.
    pub fn offset_to_time(&self, offset: i64) -> ClockTime {
        let clamped = offset.clamp(0, self.window_length());
        ClockTime::from_minutes(self.window_start.minutes_since_midnight() + clamped)
            .unwrap_or(self.window_end)
    }

    /// Nearest multiple of the step: `round(minutes / step) * step`.
    pub fn quantize(&self, minutes: f64) -> i64 {
        let step = self.step_minutes as f64;
        ((minutes / step).round() as i64) * self.step_minutes
    }

    pub fn pixels_to_minutes(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_minute
    }

    pub fn minutes_to_pixels(&self, minutes: i64) -> f64 {
        minutes as f64 * self.pixels_per_minute
    }

    /// Quantized minute delta for a pointer movement in pixels.
    pub fn quantized_delta(&self, pointer_delta_px: f64) -> i64 {
        self.quantize(self.pixels_to_minutes(pointer_delta_px))
    }

    /// Start offset for a press on empty grid space: floored to the step and
    /// kept early enough for a minimum-duration block to fit.
    pub fn offset_at_pixel(&self, pointer_y: f64) -> i64 {
        let steps = (self.pixels_to_minutes(pointer_y) / self.step_minutes as f64).floor();
        let offset = (steps as i64) * self.step_minutes;
        offset.clamp(0, self.latest_start())
    }

    pub fn snap(&self, offset: i64) -> i64 {
        self.quantize(offset as f64)
    }

    pub fn is_aligned(&self, time: ClockTime) -> bool {
        self.time_to_offset(time).rem_euclid(self.step_minutes) == 0
    }

    /// Brings an arbitrary span onto the grid: snapped, clamped into the
    /// window and widened to the minimum duration. Spans that do not
    /// intersect the window yield `None`.
    pub fn normalize_span(&self, start: ClockTime, end: ClockTime) -> Option<(ClockTime, ClockTime)> {
        let length = self.window_length();
        let raw_start = self.time_to_offset(start);
        let raw_end = self.time_to_offset(end);
        if raw_end <= raw_start || raw_end <= 0 || raw_start >= length {
            return None;
        }

        let mut start_offset = self.snap(raw_start.clamp(0, length)).clamp(0, length);
        let mut end_offset = self.snap(raw_end.clamp(0, length)).clamp(0, length);
        if end_offset - start_offset < self.min_duration_minutes {
            end_offset = start_offset + self.min_duration_minutes;
            if end_offset > length {
                end_offset = length;
                start_offset = length - self.min_duration_minutes;
            }
        }

        Some((
            self.offset_to_time(start_offset),
            self.offset_to_time(end_offset),
        ))
    }
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::from_config(&TimelineConfig::default())
    }
}
