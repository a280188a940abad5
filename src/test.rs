//! Shared test fixtures.

use nalgebra::Point2;

use crate::{
    error::{DrawError, EstimateError},
    estimator::PoseEstimator,
    image::{Color, Image, Rect, Resolution},
    landmark::{BodyPart, Landmark, Pose},
    surface::Surface,
};

/// Builds a pose from `(part, x, y, score)` tuples.
pub fn pose(landmarks: &[(BodyPart, f32, f32, f32)]) -> Pose {
    let mut pose = Pose::new();
    for &(part, x, y, score) in landmarks {
        pose.set(part, Landmark::new(x, y, score));
    }
    pose
}

/// Returns a pose with every landmark present, at distinct positions, with the same `score`.
pub fn full_pose(score: f32) -> Pose {
    let mut pose = Pose::new();
    for part in BodyPart::ALL {
        let i = part.index() as f32;
        pose.set(part, Landmark::new(10.0 + 17.0 * i, 20.0 + 13.0 * i, score));
    }
    pose
}

/// A [`PoseEstimator`] backed by a closure.
pub struct FnEstimator<F>(F);

pub fn fn_estimator<F>(estimate: F) -> FnEstimator<F>
where
    F: FnMut(&Image) -> Result<Vec<Pose>, EstimateError> + Send + 'static,
{
    FnEstimator(estimate)
}

impl<F> PoseEstimator for FnEstimator<F>
where
    F: FnMut(&Image) -> Result<Vec<Pose>, EstimateError> + Send + 'static,
{
    fn estimate(&mut self, frame: &Image) -> Result<Vec<Pose>, EstimateError> {
        (self.0)(frame)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear(Rect),
    Image {
        size: Resolution,
        src: Rect,
        dst: Rect,
    },
    Line {
        from: Point2<f32>,
        to: Point2<f32>,
        color: Color,
        width: u32,
    },
    Circle {
        center: Point2<f32>,
        radius: f32,
        fill: Color,
        stroke: Option<(Color, u32)>,
    },
    Save,
    Restore,
    ClipCircle {
        center: Point2<f32>,
        radius: f32,
    },
}

/// A [`Surface`] that records every call instead of drawing.
pub struct RecordingSurface {
    pub res: Resolution,
    pub calls: Vec<DrawCall>,
    /// Make `draw_image` fail for images of this size.
    pub fail_images_of: Option<Resolution>,
}

impl RecordingSurface {
    pub fn new(res: Resolution) -> Self {
        Self {
            res,
            calls: Vec::new(),
            fail_images_of: None,
        }
    }

    /// Returns the sizes of all images drawn, in order.
    pub fn image_sizes(&self) -> Vec<Resolution> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Image { size, .. } => Some(*size),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn resolution(&self) -> Resolution {
        self.res
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.calls.push(DrawCall::Clear(rect));
    }

    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect) -> Result<(), DrawError> {
        if self.fail_images_of == Some(image.resolution()) {
            return Err(DrawError::EmptyRegion);
        }
        self.calls.push(DrawCall::Image {
            size: image.resolution(),
            src,
            dst,
        });
        Ok(())
    }

    fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, color: Color, width: u32) {
        self.calls.push(DrawCall::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn draw_circle(
        &mut self,
        center: Point2<f32>,
        radius: f32,
        fill: Color,
        stroke: Option<(Color, u32)>,
    ) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            fill,
            stroke,
        });
    }

    fn save(&mut self) {
        self.calls.push(DrawCall::Save);
    }

    fn restore(&mut self) {
        self.calls.push(DrawCall::Restore);
    }

    fn clip_circle(&mut self, center: Point2<f32>, radius: f32) {
        self.calls.push(DrawCall::ClipCircle { center, radius });
    }
}
