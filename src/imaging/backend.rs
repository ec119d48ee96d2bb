//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the raster-image collaborator of the render
//! pipeline: decode bytes, report dimensions, resize, crop, and encode an
//! animated sequence. The pipeline in [`operations`](super::operations) only
//! talks to this trait, so it can run against a recording mock in tests.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image` crate.

use super::params::{CropRectangle, EncodeParams};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Image exceeds limits: {0}")]
    ResourceLimit(String),
    #[error("Failed to encode animation: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image codec backends.
///
/// Images are opaque to the pipeline; the backend picks the representation.
/// `Sync` plus a `Send + Sync` image type lets frames be rendered in parallel
/// from one shared pre-scaled source.
pub trait ImageBackend: Sync {
    type Image: Send + Sync;

    /// Decode raw upload bytes into an RGB raster.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, BackendError>;

    /// Report the size of a decoded image.
    fn dimensions(&self, image: &Self::Image) -> Dimensions;

    /// Resize to exactly `width` × `height`.
    fn resize(&self, image: &Self::Image, width: u32, height: u32)
    -> Result<Self::Image, BackendError>;

    /// Cut out `rect`. Fractional coordinates are rounded by the backend.
    fn crop(&self, image: &Self::Image, rect: &CropRectangle) -> Result<Self::Image, BackendError>;

    /// Encode frames, in order, as a looping animated image.
    fn encode_animation(
        &self,
        frames: Vec<Self::Image>,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError>;
}
