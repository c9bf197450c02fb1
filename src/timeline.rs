// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Time-to-Screen Mapping

use serde::{Deserialize, Serialize};

/// Shared now-line mapping from logical engine time to screen x.
///
/// `x = now_pixel - (engine_time - t) * pixels_per_second / 1000`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub now_pixel: f64,
    pub pixels_per_second: f64,
}

impl Timeline {
    pub fn new(now_pixel: f64, pixels_per_second: f64) -> Self {
        Self { now_pixel, pixels_per_second }
    }

    /// Screen x of logical instant `t_ms` when the clock reads `engine_time_ms`.
    pub fn x_at(&self, t_ms: f64, engine_time_ms: f64) -> f64 {
        self.now_pixel - (engine_time_ms - t_ms) * self.pixels_per_second / 1000.0
    }

    /// Pixel width of a span of logical time.
    pub fn width_of(&self, duration_ms: f64) -> f64 {
        duration_ms * self.pixels_per_second / 1000.0
    }

    /// Left edge and width of `[start, end)` at `engine_time_ms`.
    pub fn span(&self, start_ms: f64, end_ms: f64, engine_time_ms: f64) -> (f64, f64) {
        let left = self.x_at(start_ms, engine_time_ms);
        let right = self.x_at(end_ms, engine_time_ms);
        (left, right - left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_maps_to_now_pixel() {
        let timeline = Timeline::new(960.0, 80.0);
        assert_eq!(timeline.x_at(5_000.0, 5_000.0), 960.0);
        assert_eq!(timeline.x_at(4_000.0, 5_000.0), 880.0);
        assert_eq!(timeline.x_at(6_000.0, 5_000.0), 1040.0);
    }

    #[test]
    fn span_width_matches_duration() {
        let timeline = Timeline::new(960.0, 80.0);
        let (x, width) = timeline.span(1_000.0, 1_250.0, 2_000.0);
        assert_eq!(x, 880.0);
        assert_eq!(width, 20.0);
        assert_eq!(timeline.width_of(250.0), 20.0);
    }
}
