//! Non-fatal error types.
//!
//! Initialization failures are fatal and use [`anyhow::Error`]. The errors here describe failures
//! that only affect a single frame and are handled by skipping work.

use thiserror::Error;

use crate::image::Rect;

/// A single estimator invocation failed.
///
/// The scheduler keeps the previous snapshot and tries again on the next tick.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("estimation failed: {0}")]
    Failed(#[from] anyhow::Error),
}

/// Drawing one overlay failed.
///
/// Reported by the compositor; other overlays of the same frame are unaffected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DrawError {
    #[error("cannot draw into degenerate rectangle {0:?}")]
    DegenerateRect(Rect),

    #[error("sample region lies outside the source frame")]
    EmptyRegion,

    #[error("overlay asset has invalid dimensions {width}x{height}")]
    InvalidAsset { width: u32, height: u32 },
}
