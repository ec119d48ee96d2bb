//! High-level Ken Burns rendering.
//!
//! Combines the geometry in [`calculations`](super::calculations) with backend
//! execution: decode → pre-scale → plan → crop + resize each frame → encode.
//! Nothing here holds state between calls.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{FramePlan, PlanError, plan_frames};
use super::params::AnimationConfig;
use rayon::prelude::*;
use std::time::Instant;
use thiserror::Error;

/// Default GIF quantizer speed.
pub const DEFAULT_ENCODE_SPEED: i32 = 10;

/// Default cap on the pre-scaled source (width × height).
pub const DEFAULT_MAX_SCALED_PIXELS: u64 = 40_000_000;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("invalid animation config: {0}")]
    InvalidConfig(String),
    #[error("failed to encode animation: {0}")]
    EncodeFailure(String),
    #[error("failed to render frames: {0}")]
    Processing(String),
}

impl From<PlanError> for RenderError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::InvalidImage(msg) => RenderError::InvalidImage(msg),
            PlanError::InvalidConfig(msg) => RenderError::InvalidConfig(msg),
        }
    }
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Options for one render, beyond the animation itself.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub animation: AnimationConfig,
    pub encode_speed: i32,
    /// Largest pre-scaled image the pipeline will allocate.
    pub max_scaled_pixels: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            animation: AnimationConfig::default(),
            encode_speed: DEFAULT_ENCODE_SPEED,
            max_scaled_pixels: DEFAULT_MAX_SCALED_PIXELS,
        }
    }
}

/// Encoded animation plus what went into it.
#[derive(Debug, Clone)]
pub struct RenderedAnimation {
    pub bytes: Vec<u8>,
    pub source: Dimensions,
    pub plan: FramePlan,
}

impl RenderedAnimation {
    pub fn frame_count(&self) -> usize {
        self.plan.crops.len()
    }
}

/// Render the frames of a plan from an already pre-scaled source.
///
/// Frames are independent, so they are cut in parallel; the returned order
/// matches `plan.crops`.
pub fn render_frames<B: ImageBackend>(
    backend: &B,
    scaled: &B::Image,
    plan: &FramePlan,
    config: &AnimationConfig,
) -> std::result::Result<Vec<B::Image>, BackendError> {
    plan.crops
        .par_iter()
        .map(|rect| {
            let cropped = backend.crop(scaled, rect)?;
            backend.resize(&cropped, config.target_width, config.target_height)
        })
        .collect()
}

/// Turn uploaded image bytes into an encoded Ken Burns animation.
///
/// Config is validated before any decoding work. Decode failures, and sources
/// whose pre-scaled size would exceed `max_scaled_pixels`, surface as
/// [`RenderError::InvalidImage`]; encoder failures as
/// [`RenderError::EncodeFailure`]. No partial output is ever returned.
#[tracing::instrument(skip_all, fields(upload_bytes = bytes.len()))]
pub fn render_animation<B: ImageBackend>(
    backend: &B,
    bytes: &[u8],
    options: &RenderOptions,
) -> Result<RenderedAnimation> {
    let config = &options.animation;
    config.validate()?;
    let start = Instant::now();

    let source_image = backend
        .decode(bytes)
        .map_err(|e| RenderError::InvalidImage(e.to_string()))?;
    let source = backend.dimensions(&source_image);
    let plan = plan_frames(config, source.width, source.height)?;
    tracing::debug!(
        width = source.width,
        height = source.height,
        scale = plan.scale,
        "planned {} frames",
        plan.crops.len()
    );

    // Cover-fit upscales thin or tiny sources; check before allocating
    if plan.scaled_pixels() > options.max_scaled_pixels {
        return Err(RenderError::InvalidImage(format!(
            "{}x{} source needs a {}x{} pre-scale ({} pixels, limit: {})",
            source.width,
            source.height,
            plan.scaled_width,
            plan.scaled_height,
            plan.scaled_pixels(),
            options.max_scaled_pixels
        )));
    }

    let scaled = backend
        .resize(&source_image, plan.scaled_width, plan.scaled_height)
        .map_err(|e| RenderError::Processing(e.to_string()))?;
    drop(source_image);

    let frames = render_frames(backend, &scaled, &plan, config)
        .map_err(|e| RenderError::Processing(e.to_string()))?;

    let encoded = backend
        .encode_animation(frames, &config.encode_params(options.encode_speed))
        .map_err(|e| RenderError::EncodeFailure(e.to_string()))?;

    tracing::debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        output_bytes = encoded.len(),
        "animation encoded"
    );

    Ok(RenderedAnimation {
        bytes: encoded,
        source,
        plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    #[test]
    fn render_runs_full_pipeline() {
        let backend = MockBackend::with_dimensions(1000, 500);

        let rendered = render_animation(&backend, b"bytes", &RenderOptions::default()).unwrap();
        assert_eq!(rendered.bytes, b"GIF89a");
        assert_eq!(rendered.frame_count(), 10);
        assert_eq!(rendered.source, Dimensions { width: 1000, height: 500 });

        let ops = backend.get_operations();
        // decode + pre-scale + 10 × (crop + resize) + encode
        assert_eq!(ops.len(), 1 + 1 + 20 + 1);
        assert_eq!(ops[0], RecordedOp::Decode(5));
        assert_eq!(
            ops[1],
            RecordedOp::Resize {
                from: Dimensions { width: 1000, height: 500 },
                width: 780,
                height: 390,
            }
        );
    }

    #[test]
    fn render_encodes_target_sized_frames_in_order() {
        let backend = MockBackend::with_dimensions(1000, 500);
        render_animation(&backend, b"bytes", &RenderOptions::default()).unwrap();

        let ops = backend.get_operations();
        let Some(RecordedOp::Encode { frames, params }) = ops.last() else {
            panic!("last operation should be encode, got {ops:?}");
        };
        assert_eq!(frames.len(), 10);
        assert!(
            frames
                .iter()
                .all(|f| *f == Dimensions { width: 300, height: 300 })
        );
        assert_eq!(params.frame_delay_ms, 100);
        assert_eq!(params.loop_count, 0);
        assert_eq!(params.speed, DEFAULT_ENCODE_SPEED);
    }

    #[test]
    fn render_crops_every_planned_rectangle() {
        let backend = MockBackend::with_dimensions(1000, 500);
        let rendered = render_animation(&backend, b"bytes", &RenderOptions::default()).unwrap();

        let mut crops: Vec<_> = backend
            .get_operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Crop(rect) => Some(rect),
                _ => None,
            })
            .collect();
        // Parallel rendering records crops in any order
        crops.sort_by(|a, b| a.width.total_cmp(&b.width));
        assert_eq!(crops, rendered.plan.crops);
    }

    #[test]
    fn decode_failure_is_invalid_image() {
        let backend = MockBackend::default();
        let result = render_animation(&backend, b"junk", &RenderOptions::default());
        assert!(matches!(result, Err(RenderError::InvalidImage(_))));
    }

    #[test]
    fn zero_sized_source_is_invalid_image() {
        let backend = MockBackend::with_dimensions(0, 400);
        let result = render_animation(&backend, b"bytes", &RenderOptions::default());
        assert!(matches!(result, Err(RenderError::InvalidImage(_))));
    }

    #[test]
    fn thin_source_is_rejected_before_pre_scale() {
        // 1x20000 would pre-scale to 390x7800000
        let backend = MockBackend::with_dimensions(1, 20_000);
        let result = render_animation(&backend, b"bytes", &RenderOptions::default());

        assert!(matches!(
            result,
            Err(RenderError::InvalidImage(msg)) if msg.contains("390x7800000")
        ));
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode(5)]);
    }

    #[test]
    fn scaled_pixel_limit_is_configurable() {
        let backend = MockBackend::with_dimensions(1000, 500);
        let options = RenderOptions {
            max_scaled_pixels: 780 * 390 - 1,
            ..RenderOptions::default()
        };
        assert!(matches!(
            render_animation(&backend, b"bytes", &options),
            Err(RenderError::InvalidImage(_))
        ));

        let options = RenderOptions {
            max_scaled_pixels: 780 * 390,
            ..RenderOptions::default()
        };
        assert!(render_animation(&backend, b"bytes", &options).is_ok());
    }

    #[test]
    fn encode_failure_is_reported() {
        let backend = MockBackend::failing_encode(640, 480);
        let result = render_animation(&backend, b"bytes", &RenderOptions::default());
        assert!(matches!(result, Err(RenderError::EncodeFailure(_))));
    }

    #[test]
    fn invalid_config_fails_before_decode() {
        let backend = MockBackend::with_dimensions(640, 480);
        let options = RenderOptions {
            animation: AnimationConfig {
                frame_count: 0,
                ..AnimationConfig::default()
            },
            ..RenderOptions::default()
        };

        let result = render_animation(&backend, b"bytes", &options);
        assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn plan_error_conversion() {
        assert!(matches!(
            RenderError::from(PlanError::InvalidConfig("x".into())),
            RenderError::InvalidConfig(_)
        ));
        assert!(matches!(
            RenderError::from(PlanError::InvalidImage("x".into())),
            RenderError::InvalidImage(_)
        ));
    }
}
