//! Parameter types for the Ken Burns pipeline.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the geometry planner in [`calculations`](super::calculations), the
//! pipeline in [`operations`](super::operations), and the
//! [`backend`](super::backend) that does the pixel work.
//!
//! ## Types
//!
//! - [`AnimationConfig`]: output frame size, frame count, delay, zoom factor, loop count.
//! - [`CropRectangle`]: a fractional crop window in pre-scaled image coordinates.
//! - [`EncodeParams`]: everything the animated-image encoder needs besides the frames.

use serde::{Deserialize, Serialize};

use super::calculations::PlanError;

/// Immutable animation settings.
///
/// Defaults are the production values: 300×300 frames, 10 frames at 100 ms,
/// 1.3× zoom, infinite loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    /// Output frame width in pixels.
    pub target_width: u32,
    /// Output frame height in pixels.
    pub target_height: u32,
    /// Number of frames in the animation.
    pub frame_count: u32,
    /// Display duration of each frame in milliseconds.
    pub frame_delay_ms: u32,
    /// Crop expansion of the last frame relative to the first. Must be > 1.0.
    pub zoom_factor: f64,
    /// Number of replays after the first playback; 0 loops forever.
    pub loop_count: u16,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            target_width: 300,
            target_height: 300,
            frame_count: 10,
            frame_delay_ms: 100,
            zoom_factor: 1.3,
            loop_count: 0,
        }
    }
}

impl AnimationConfig {
    /// Check the preconditions of the frame planner.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.frame_count < 1 {
            return Err(PlanError::InvalidConfig(
                "frame_count must be at least 1".into(),
            ));
        }
        if !self.zoom_factor.is_finite() || self.zoom_factor <= 1.0 {
            return Err(PlanError::InvalidConfig(format!(
                "zoom_factor must be a finite value greater than 1.0, got {}",
                self.zoom_factor
            )));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(PlanError::InvalidConfig(format!(
                "target size must be positive, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        Ok(())
    }

    /// Encoder settings derived from this config.
    pub fn encode_params(&self, speed: i32) -> EncodeParams {
        EncodeParams {
            frame_delay_ms: self.frame_delay_ms,
            loop_count: self.loop_count,
            speed,
        }
    }
}

/// Crop window in the coordinate space of the pre-scaled source image.
///
/// Coordinates may be fractional; the backend rounds when it cuts pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropRectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRectangle {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Animated-image encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub frame_delay_ms: u32,
    /// 0 = infinite.
    pub loop_count: u16,
    /// GIF quantizer speed, 1 (best) to 30 (fastest).
    pub speed: i32,
}
