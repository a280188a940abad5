//! Per-frame composition of the camera frame and all overlays.

use std::fmt;

use crate::{
    config::{Config, Overlays},
    error::DrawError,
    garment::{Garment, GarmentAligner, Garments},
    image::Image,
    landmark::Pose,
    skeleton::SkeletonRenderer,
    surface::{FrameScale, Surface},
};

/// The independently drawn parts of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Frame,
    LowerGarment,
    UpperGarment,
    FaceHighlight,
}

impl fmt::Display for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Overlay::Frame => "frame",
            Overlay::LowerGarment => "lower garment",
            Overlay::UpperGarment => "upper garment",
            Overlay::FaceHighlight => "face highlight",
        })
    }
}

/// Draws one complete frame onto a [`Surface`].
///
/// The order is: clear, camera frame, lower garment, upper garment, then bones, joints and face
/// highlight of every pose. Garments are aligned to the first pose only.
#[derive(Debug, Clone)]
pub struct Compositor {
    overlays: Overlays,
    skeleton: SkeletonRenderer,
    garments: GarmentAligner,
}

impl Compositor {
    pub fn new(config: &Config) -> Self {
        Self {
            overlays: config.overlays,
            skeleton: SkeletonRenderer::new(config.confidence_threshold, config.style),
            garments: GarmentAligner::new(config.confidence_threshold),
        }
    }

    /// Composes a frame.
    ///
    /// A failure drawing one overlay does not stop the others; all failures are returned.
    /// Without a `frame`, the surface is only cleared.
    pub fn compose<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        frame: Option<&Image>,
        poses: &[Pose],
        garments: &Garments,
    ) -> Vec<(Overlay, DrawError)> {
        let mut failures = Vec::new();
        surface.clear();

        let Some(frame) = frame else {
            return failures;
        };
        let target = surface.resolution();
        if let Err(e) = surface.draw_image(frame, frame.rect(), target.rect()) {
            failures.push((Overlay::Frame, e));
        }

        // Dimensions are re-read every frame, both sides may have changed.
        let Some(scale) = FrameScale::new(frame.resolution(), target) else {
            return failures;
        };

        if self.overlays.garments {
            if let Some(pose) = poses.first() {
                for (garment, overlay) in [
                    (Garment::Lower, Overlay::LowerGarment),
                    (Garment::Upper, Overlay::UpperGarment),
                ] {
                    let Some(asset) = garments.get(garment) else {
                        continue;
                    };
                    if let Err(e) = self.garments.draw(surface, garment, asset, pose, scale) {
                        failures.push((overlay, e));
                    }
                }
            }
        }

        for pose in poses {
            if self.overlays.skeleton {
                self.skeleton.draw_bones(surface, pose, scale);
            }
            if self.overlays.keypoints {
                self.skeleton.draw_joints(surface, pose, scale);
            }
            if self.overlays.face_highlight {
                if let Err(e) = self.skeleton.draw_face_highlight(surface, pose, frame, scale) {
                    failures.push((Overlay::FaceHighlight, e));
                }
            }
        }

        failures
    }
}
