//! Skeleton visualization: bones, joints and the face highlight.
//!
//! Geometry is computed by the pure functions [`bones`], [`joints`] and [`face_highlight`] in
//! source-frame space. [`SkeletonRenderer`] converts the result to surface space and draws it.

use nalgebra::Point2;

use crate::{
    config::Style,
    error::DrawError,
    image::{Color, Image, Rect, Resolution},
    landmark::{BodyPart, Landmark, Pose},
    surface::{FrameScale, Surface},
};

use BodyPart::*;

/// An endpoint of a bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// A landmark reported by the estimator.
    Part(BodyPart),
    /// The midpoint between two landmarks. Its score is the lower of the two.
    Mid(BodyPart, BodyPart),
    /// A point straight below a landmark, at the configured ankle stub distance. Shares the
    /// landmark's score.
    Below(BodyPart),
}

impl Anchor {
    /// Resolves the anchor against `pose`. Returns [`None`] if a required landmark is absent.
    pub fn resolve(self, pose: &Pose, style: &Style) -> Option<Landmark> {
        match self {
            Anchor::Part(part) => pose.get(part),
            Anchor::Mid(a, b) => pose.midpoint(a, b),
            Anchor::Below(part) => {
                let lm = pose.get(part)?;
                Some(Landmark::new(lm.x(), lm.y() + style.ankle_stub, lm.score()))
            }
        }
    }
}

/// Bone color groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneGroup {
    Head,
    Spine,
    Shoulders,
    Pelvis,
    Arm,
    Hand,
    Leg,
}

impl BoneGroup {
    pub fn color(self) -> Color {
        match self {
            BoneGroup::Head => Color::from_rgb8(0xff, 0x6b, 0x6b),
            BoneGroup::Spine | BoneGroup::Shoulders => Color::from_rgb8(0x4e, 0xcd, 0xc4),
            BoneGroup::Pelvis => Color::from_rgb8(0x45, 0xb7, 0xd1),
            BoneGroup::Arm => Color::from_rgb8(0x96, 0xce, 0xb4),
            BoneGroup::Hand => Color::from_rgb8(0xfe, 0xca, 0x57),
            BoneGroup::Leg => Color::from_rgb8(0xff, 0x9f, 0xf3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bone {
    pub from: Anchor,
    pub to: Anchor,
    pub group: BoneGroup,
}

const fn bone(from: Anchor, to: Anchor, group: BoneGroup) -> Bone {
    Bone { from, to, group }
}

const EYES: Anchor = Anchor::Mid(LeftEye, RightEye);
const SHOULDERS: Anchor = Anchor::Mid(LeftShoulder, RightShoulder);
const HIPS: Anchor = Anchor::Mid(LeftHip, RightHip);

use Anchor::{Below, Part};

/// The fixed bone topology, in draw order.
pub const BONES: &[Bone] = &[
    bone(Part(Nose), EYES, BoneGroup::Head),
    bone(EYES, SHOULDERS, BoneGroup::Head),
    bone(SHOULDERS, HIPS, BoneGroup::Spine),
    bone(Part(LeftShoulder), Part(RightShoulder), BoneGroup::Shoulders),
    bone(Part(LeftHip), Part(RightHip), BoneGroup::Pelvis),
    bone(Part(LeftShoulder), Part(LeftHip), BoneGroup::Spine),
    bone(Part(RightShoulder), Part(RightHip), BoneGroup::Spine),
    bone(Part(LeftShoulder), Part(LeftElbow), BoneGroup::Arm),
    bone(Part(LeftElbow), Part(LeftWrist), BoneGroup::Arm),
    bone(Part(RightShoulder), Part(RightElbow), BoneGroup::Arm),
    bone(Part(RightElbow), Part(RightWrist), BoneGroup::Arm),
    bone(Part(LeftHip), Part(LeftKnee), BoneGroup::Leg),
    bone(Part(LeftKnee), Part(LeftAnkle), BoneGroup::Leg),
    bone(Part(RightHip), Part(RightKnee), BoneGroup::Leg),
    bone(Part(RightKnee), Part(RightAnkle), BoneGroup::Leg),
    bone(Part(LeftWrist), Part(LeftThumb), BoneGroup::Hand),
    bone(Part(LeftWrist), Part(LeftIndex), BoneGroup::Hand),
    bone(Part(LeftWrist), Part(LeftPinky), BoneGroup::Hand),
    bone(Part(RightWrist), Part(RightThumb), BoneGroup::Hand),
    bone(Part(RightWrist), Part(RightIndex), BoneGroup::Hand),
    bone(Part(RightWrist), Part(RightPinky), BoneGroup::Hand),
    bone(Part(LeftAnkle), Below(LeftAnkle), BoneGroup::Leg),
    bone(Part(RightAnkle), Below(RightAnkle), BoneGroup::Leg),
];

/// A line segment in source-frame space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point2<f32>,
    pub to: Point2<f32>,
    pub color: Color,
}

/// A joint marker in source-frame space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub part: BodyPart,
    pub center: Point2<f32>,
    pub color: Color,
}

/// Returns the bones of `pose` whose endpoints both score strictly above `threshold`.
pub fn bones(pose: &Pose, threshold: f32, style: &Style) -> Vec<Segment> {
    BONES
        .iter()
        .filter_map(|bone| {
            let from = bone.from.resolve(pose, style)?;
            let to = bone.to.resolve(pose, style)?;
            if !(from.is_confident(threshold) && to.is_confident(threshold)) {
                return None;
            }
            Some(Segment {
                from: from.position(),
                to: to.position(),
                color: bone.group.color(),
            })
        })
        .collect()
}

/// Returns a joint for every landmark of `pose` scoring strictly above `threshold`.
pub fn joints(pose: &Pose, threshold: f32) -> Vec<Joint> {
    pose.iter()
        .filter(|(_, lm)| lm.is_confident(threshold))
        .map(|(part, lm)| Joint {
            part,
            center: lm.position(),
            color: part.region().color(),
        })
        .collect()
}

/// Placement of the face highlight, in source-frame space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceHighlight {
    /// Region of the source frame to sample.
    pub sample: Rect,
    /// Square the sample is stretched into, centered on the nose.
    pub target: Rect,
    /// Center of the clip circle (the nose).
    pub center: Point2<f32>,
    /// Radius of the clip circle, half the side length of `target`.
    pub radius: f32,
}

/// Computes the face highlight for `pose`.
///
/// Requires the nose and both eyes to score above `threshold`. The box around them is padded by
/// `style.face_padding`, made square, and shifted upwards by `style.face_upward_bias` of its size.
/// The sample region is clamped to the frame; [`None`] is returned if nothing of it remains.
pub fn face_highlight(
    pose: &Pose,
    threshold: f32,
    style: &Style,
    frame: Resolution,
) -> Option<FaceHighlight> {
    let nose = pose.confident(Nose, threshold)?;
    let left = pose.confident(LeftEye, threshold)?;
    let right = pose.confident(RightEye, threshold)?;

    let bounds = Rect::bounding([nose.position(), left.position(), right.position()])?;
    let padding = style.face_padding;
    let size = (bounds.width() + 2.0 * padding).max(bounds.height() + 2.0 * padding);
    let x = (bounds.x() - padding).max(0.0);
    let y = (bounds.y() - padding - size * style.face_upward_bias).max(0.0);
    let w = (frame.width() as f32 - x).min(size);
    let h = (frame.height() as f32 - y).min(size);
    if !(w > 0.0 && h > 0.0) {
        return None;
    }

    Some(FaceHighlight {
        sample: Rect::from_top_left(x, y, w, h),
        target: Rect::from_center(nose.x(), nose.y(), size, size),
        center: nose.position(),
        radius: size / 2.0,
    })
}

/// Draws skeletons onto a [`Surface`].
#[derive(Debug, Clone)]
pub struct SkeletonRenderer {
    threshold: f32,
    style: Style,
}

impl SkeletonRenderer {
    pub fn new(threshold: f32, style: Style) -> Self {
        Self { threshold, style }
    }

    pub fn draw_bones<S: Surface + ?Sized>(&self, surface: &mut S, pose: &Pose, scale: FrameScale) {
        for seg in bones(pose, self.threshold, &self.style) {
            surface.draw_line(
                scale.point(seg.from),
                scale.point(seg.to),
                seg.color,
                self.style.bone_width,
            );
        }
    }

    pub fn draw_joints<S: Surface + ?Sized>(&self, surface: &mut S, pose: &Pose, scale: FrameScale) {
        for joint in joints(pose, self.threshold) {
            surface.draw_circle(
                scale.point(joint.center),
                self.style.joint_radius as f32,
                joint.color,
                Some((Color::BLACK, self.style.joint_outline_width)),
            );
        }
    }

    /// Draws the face highlight, sampling from `frame` rather than from the surface.
    ///
    /// Does nothing if the face landmarks are not confident enough.
    pub fn draw_face_highlight<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        pose: &Pose,
        frame: &Image,
        scale: FrameScale,
    ) -> Result<(), DrawError> {
        let Some(face) = face_highlight(pose, self.threshold, &self.style, frame.resolution())
        else {
            return Ok(());
        };

        // Copy the region out first, so that the draw below never sees overlay pixels.
        let sample = frame.crop(face.sample).ok_or(DrawError::EmptyRegion)?;
        let target = scale.rect(face.target);
        if !target.is_drawable() {
            return Err(DrawError::DegenerateRect(target));
        }

        surface.save();
        surface.clip_circle(scale.point(face.center), face.radius * scale.min());
        let res = surface.draw_image(&sample, sample.rect(), target);
        surface.restore();
        res
    }
}

impl Default for SkeletonRenderer {
    fn default() -> Self {
        Self::new(0.3, Style::default())
    }
}
