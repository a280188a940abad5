//! Real-time skeleton and garment overlays for live video.
//!
//! A [`Session`] wires two independently paced loops together:
//!
//! - The [`scheduler::EstimationScheduler`] invokes a [`PoseEstimator`] on the newest camera frame
//!   at a fixed interval and publishes the result into a [`snapshot::SnapshotCell`].
//! - The [`render::RenderLoop`] runs once per display refresh, draws the newest camera frame and
//!   composites the overlays for whatever poses were published last.
//!
//! The loops never wait on each other. The render loop may draw poses that are up to one
//! estimation interval old.
//!
//! # Coordinates
//!
//! Landmarks, bounding boxes and all overlay geometry live in *source-frame* pixel space (the
//! camera image, X pointing right and Y pointing down). They are converted to surface space
//! exactly once, at the final draw call, via [`surface::FrameScale`].
//!
//! # Environment Variables
//!
//! * `TRYON_JPEG_BACKEND`: Configures the JPEG decoder used for webcam frames. Allowed values are
//!   `jpeg-decoder` (the default) and `zune-jpeg`.
//! * `TRYON_WEBCAM_NAME`: Forces the device to use for [`Webcam`]s opened without an explicit
//!   device name. If unset, the first device that supports a compatible image format will be used.
//!
//! [`Session`]: session::Session
//! [`PoseEstimator`]: estimator::PoseEstimator
//! [`Webcam`]: video::webcam::Webcam

use log::LevelFilter;

pub mod compositor;
pub mod config;
pub mod error;
pub mod estimator;
pub mod garment;
pub mod gui;
pub mod image;
pub mod landmark;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod skeleton;
pub mod snapshot;
pub mod surface;
pub mod timer;
pub mod video;
pub mod worker;

#[cfg(test)]
mod test;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this library will log at *trace*
/// level. Otherwise, they will log at *debug* level. `RUST_LOG` overrides both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
