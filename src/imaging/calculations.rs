//! Pure frame-geometry functions for the Ken Burns zoom.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! The animation is a zoom-out: frame 0 shows the tightest crop (exactly the
//! target size, in pre-scaled pixels) and the last frame the widest
//! (`target * zoom_factor`). Every crop is centered, then the backend scales
//! it down to the target size.
//!
//! ```text
//!   pre-scaled source (covers target * zoom)
//!   ┌──────────────────────────────┐
//!   │     ┌──────────────────┐     │  ← last frame, target * zoom
//!   │     │   ┌──────────┐   │     │
//!   │     │   │ frame 0  │   │     │  ← first frame, target * 1.0
//!   │     │   └──────────┘   │     │
//!   │     └──────────────────┘     │
//!   └──────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use super::params::{AnimationConfig, CropRectangle};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Invalid animation config: {0}")]
    InvalidConfig(String),
}

/// Uniform scale factor that makes the source cover the widest crop.
///
/// Returns `max(maxW / srcW, maxH / srcH)` where `max* = target * zoom_factor`.
/// This is a "cover" fit: the aspect ratio is preserved, one axis matches the
/// widest crop and the other may exceed it.
///
/// # Examples
/// ```
/// # use kenburns_gif::imaging::calculations::compute_pre_scale;
/// // 1000x500 source, 300x300 target, 1.3 zoom → covers 390x390
/// let scale = compute_pre_scale((1000, 500), (300, 300), 1.3).unwrap();
/// assert!((scale - 0.78).abs() < 1e-12);
/// ```
pub fn compute_pre_scale(
    source: (u32, u32),
    target: (u32, u32),
    zoom_factor: f64,
) -> Result<f64, PlanError> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return Err(PlanError::InvalidImage(format!(
            "source has zero extent ({}x{})",
            src_w, src_h
        )));
    }

    let max_w = target.0 as f64 * zoom_factor;
    let max_h = target.1 as f64 * zoom_factor;

    Ok((max_w / src_w as f64).max(max_h / src_h as f64))
}

/// Pixel dimensions of the source after applying `scale`.
///
/// Rounded to the nearest pixel, never below 1.
pub fn scaled_dimensions(source: (u32, u32), scale: f64) -> (u32, u32) {
    let w = (source.0 as f64 * scale).round().max(1.0) as u32;
    let h = (source.1 as f64 * scale).round().max(1.0) as u32;
    (w, h)
}

/// Crop expansion for a frame: 1.0 at frame 0, `zoom_factor` at the last frame.
///
/// A single-frame animation stays at 1.0.
pub fn zoom_ratio(frame_index: u32, frame_count: u32, zoom_factor: f64) -> f64 {
    let t = if frame_count > 1 {
        frame_index as f64 / (frame_count - 1) as f64
    } else {
        0.0
    };
    1.0 + (zoom_factor - 1.0) * t
}

/// Centered crop window for one frame, in pre-scaled image coordinates.
///
/// Width and height are clamped to the scaled image so that sub-pixel
/// overshoot from rounding the scaled size never pushes the window outside it.
pub fn compute_crop_rectangle(
    frame_index: u32,
    frame_count: u32,
    scaled: (u32, u32),
    target: (u32, u32),
    zoom_factor: f64,
) -> CropRectangle {
    let ratio = zoom_ratio(frame_index, frame_count, zoom_factor);
    let (scaled_w, scaled_h) = (scaled.0 as f64, scaled.1 as f64);

    let width = (target.0 as f64 * ratio).min(scaled_w);
    let height = (target.1 as f64 * ratio).min(scaled_h);

    CropRectangle {
        x: (scaled_w - width) / 2.0,
        y: (scaled_h - height) / 2.0,
        width,
        height,
    }
}

/// Complete geometry for one animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramePlan {
    /// Uniform pre-scale applied to the source.
    pub scale: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// One crop per frame, in playback order.
    pub crops: Vec<CropRectangle>,
}

impl FramePlan {
    /// Pixel count of the pre-scaled source.
    pub fn scaled_pixels(&self) -> u64 {
        u64::from(self.scaled_width).saturating_mul(u64::from(self.scaled_height))
    }
}

/// Plan every frame of the animation for a source of the given size.
///
/// Validates `config` first; no partial plan is returned on failure.
pub fn plan_frames(
    config: &AnimationConfig,
    source_width: u32,
    source_height: u32,
) -> Result<FramePlan, PlanError> {
    config.validate()?;

    let target = (config.target_width, config.target_height);
    let scale = compute_pre_scale((source_width, source_height), target, config.zoom_factor)?;
    let scaled = scaled_dimensions((source_width, source_height), scale);

    let crops = (0..config.frame_count)
        .map(|i| compute_crop_rectangle(i, config.frame_count, scaled, target, config.zoom_factor))
        .collect();

    Ok(FramePlan {
        scale,
        scaled_width: scaled.0,
        scaled_height: scaled.1,
        crops,
    })
}
