//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from content) |
//! | **Pre-scale / frame resize** | `resize_exact` with Lanczos3 |
//! | **Frame crop** | `crop_imm` on centered rectangles from the planner |
//! | **Encode** | `GifEncoder`, infinite or finite repeat |
//!
//! The module is split into:
//! - **Calculations**: Pure Ken Burns frame geometry (unit testable)
//! - **Parameters**: Animation config, crop rectangles, encoder settings
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The render pipeline combining calculations + backend

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{FramePlan, PlanError, plan_frames};
pub use operations::{RenderError, RenderOptions, RenderedAnimation, render_animation};
pub use params::{AnimationConfig, CropRectangle, EncodeParams};
pub use rust_backend::RustBackend;
