//! Shared test utilities for the kenburns-gif test suite.
//!
//! Builds small in-memory images so backend and pipeline tests never need
//! fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let png = encode_png(&solid_rgb(1000, 500, [255, 0, 0]));
//! let img = backend.decode(&png).unwrap();
//! ```

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

/// A `width` × `height` image filled with one color.
pub fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Encode an RGB image as PNG bytes, as a client would upload it.
pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}
