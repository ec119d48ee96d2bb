//! # Ken Burns GIF
//!
//! A small HTTP service that turns one uploaded photo into a looping animated
//! GIF with a Ken Burns zoom-out: the first frame is a tight centered crop,
//! each following frame widens the crop a little, and the last frame shows
//! `zoom_factor` times more of the picture.
//!
//! # Architecture
//!
//! Each request runs the same stateless pipeline:
//!
//! ```text
//! upload ─► decode + RGB ─► pre-scale (cover fit) ─► plan crops ─► crop + resize × N ─► GIF
//! ```
//!
//! The only original logic is the frame geometry, kept as pure functions in
//! [`imaging::calculations`]. Pixel work goes through the
//! [`imaging::ImageBackend`] trait so the pipeline can be tested against a
//! recording mock without decoding anything.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Frame geometry, codec backend, and the render pipeline |
//! | [`server`] | `axum` router: `GET /`, `POST /generate/`, error responses, CORS |
//! | [`config`] | TOML config loading, stock defaults, merging, validation |
//!
//! # Design Decisions
//!
//! ## Fixed Parameters, Operator-Tunable
//!
//! Clients send only an image. Frame size, frame count, delay, zoom, and loop
//! count come from the server's config and default to 300×300, 10 frames,
//! 100 ms, 1.3×, infinite loop. There is no per-request override.
//!
//! ## Cover Fit Before Cropping
//!
//! The source is scaled once, uniformly, so that it covers the widest crop
//! (`target * zoom_factor`). Every frame is then a centered window inside that
//! image, so no frame is ever letterboxed or stretched.
//!
//! ## No Shared State
//!
//! Nothing persists between requests. The router state is an immutable
//! bundle of backend and render options built at startup. Frames within one
//! request are cut in parallel on the rayon pool; requests never coordinate.

pub mod config;
pub mod imaging;
pub mod server;

#[cfg(test)]
pub(crate) mod test_helpers;
