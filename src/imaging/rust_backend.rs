//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (GIF, JPEG, PNG, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Color conversion | `DynamicImage::to_rgb8` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Crop | `DynamicImage::crop_imm` on a rounded, clamped rectangle |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (NeuQuant, configurable speed) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{CropRectangle, EncodeParams};
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, DynamicImage, Frame, ImageReader};
use std::io::Cursor;

/// Default cap on decoded source pixels (width × height).
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 40_000_000;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    max_source_pixels: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
        }
    }

    /// Backend that rejects sources larger than `max_source_pixels` before decoding.
    pub fn with_pixel_limit(max_source_pixels: u64) -> Self {
        Self { max_source_pixels }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("cannot identify image format: {}", e)))
}

/// Read dimensions from the header without decoding pixel data.
fn inspect_dimensions(bytes: &[u8]) -> Result<Dimensions, BackendError> {
    let (width, height) = reader(bytes)?
        .into_dimensions()
        .map_err(|e| BackendError::Decode(format!("cannot read image dimensions: {}", e)))?;
    Ok(Dimensions { width, height })
}

/// Round a fractional crop to whole pixels inside a `bounds`-sized image.
fn pixel_rect(rect: &CropRectangle, bounds: Dimensions) -> (u32, u32, u32, u32) {
    let width = (rect.width.round() as u32).clamp(1, bounds.width);
    let height = (rect.height.round() as u32).clamp(1, bounds.height);
    let x = (rect.x.max(0.0).round() as u32).min(bounds.width - width);
    let y = (rect.y.max(0.0).round() as u32).min(bounds.height - height);
    (x, y, width, height)
}

fn repeat_for(loop_count: u16) -> Repeat {
    match loop_count {
        0 => Repeat::Infinite,
        n => Repeat::Finite(n),
    }
}

impl ImageBackend for RustBackend {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        let dims = inspect_dimensions(bytes)?;
        if dims.width == 0 || dims.height == 0 {
            return Err(BackendError::Decode(format!(
                "image has zero extent ({}x{})",
                dims.width, dims.height
            )));
        }

        let pixels = dims.width as u64 * dims.height as u64;
        if pixels > self.max_source_pixels {
            return Err(BackendError::ResourceLimit(format!(
                "{}x{} is {} pixels (limit: {})",
                dims.width, dims.height, pixels, self.max_source_pixels
            )));
        }

        let img = reader(bytes)?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
    }

    fn dimensions(&self, image: &DynamicImage) -> Dimensions {
        Dimensions {
            width: image.width(),
            height: image.height(),
        }
    }

    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot resize to {}x{}",
                width, height
            )));
        }
        Ok(image.resize_exact(width, height, FilterType::Lanczos3))
    }

    fn crop(&self, image: &DynamicImage, rect: &CropRectangle) -> Result<DynamicImage, BackendError> {
        let bounds = self.dimensions(image);
        if bounds.width == 0 || bounds.height == 0 {
            return Err(BackendError::ProcessingFailed("cannot crop an empty image".into()));
        }
        let (x, y, width, height) = pixel_rect(rect, bounds);
        Ok(image.crop_imm(x, y, width, height))
    }

    fn encode_animation(
        &self,
        frames: Vec<DynamicImage>,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError> {
        if frames.is_empty() {
            return Err(BackendError::Encode("no frames to encode".into()));
        }

        let mut buffer = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut buffer, params.speed.clamp(1, 30));
            encoder
                .set_repeat(repeat_for(params.loop_count))
                .map_err(|e| BackendError::Encode(e.to_string()))?;

            let delay = Delay::from_numer_denom_ms(params.frame_delay_ms, 1);
            for frame in frames {
                encoder
                    .encode_frame(Frame::from_parts(frame.into_rgba8(), 0, 0, delay))
                    .map_err(|e| BackendError::Encode(e.to_string()))?;
            }
            // Encoder drops here, writing the GIF trailer
        }

        Ok(buffer)
    }
}
