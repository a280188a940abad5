//! Body landmarks and poses.
//!
//! A [`Pose`] is a fixed-size record with one slot per [`BodyPart`]. Slots of landmarks the
//! estimator did not report are empty. All positions are in source-frame pixel coordinates.

use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::image::Color;

/// A single detected body landmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    position: Point2<f32>,
    score: f32,
}

impl Landmark {
    #[inline]
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            score,
        }
    }

    #[inline]
    pub fn position(&self) -> Point2<f32> {
        self.position
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.position.y
    }

    /// Returns the estimator's confidence in this landmark, in range 0.0 to 1.0.
    #[inline]
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Returns whether the confidence score is strictly greater than `threshold`.
    #[inline]
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

macro_rules! body_parts {
    ( $( $variant:ident = $name:literal, )+ ) => {
        /// Identifies one of the 23 body landmarks.
        ///
        /// The discriminant is the landmark's index in a [`Pose`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum BodyPart {
            $( $variant, )+
        }

        impl BodyPart {
            /// All body parts, in index order.
            pub const ALL: [BodyPart; BodyPart::COUNT] = [ $( BodyPart::$variant, )+ ];

            /// Returns the `snake_case` name estimators use for this body part.
            pub fn name(self) -> &'static str {
                match self {
                    $( BodyPart::$variant => $name, )+
                }
            }

            /// Looks up a body part by its `snake_case` name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some(BodyPart::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

body_parts! {
    Nose = "nose",
    LeftEye = "left_eye",
    RightEye = "right_eye",
    LeftEar = "left_ear",
    RightEar = "right_ear",
    LeftShoulder = "left_shoulder",
    RightShoulder = "right_shoulder",
    LeftElbow = "left_elbow",
    RightElbow = "right_elbow",
    LeftWrist = "left_wrist",
    RightWrist = "right_wrist",
    LeftHip = "left_hip",
    RightHip = "right_hip",
    LeftKnee = "left_knee",
    RightKnee = "right_knee",
    LeftAnkle = "left_ankle",
    RightAnkle = "right_ankle",
    LeftThumb = "left_thumb",
    RightThumb = "right_thumb",
    LeftIndex = "left_index",
    RightIndex = "right_index",
    LeftPinky = "left_pinky",
    RightPinky = "right_pinky",
}

impl BodyPart {
    pub const COUNT: usize = 23;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the region of the body this part belongs to.
    pub fn region(self) -> BodyRegion {
        match self.index() {
            0..=4 => BodyRegion::Face,
            5..=10 => BodyRegion::Arm,
            11..=16 => BodyRegion::Leg,
            _ => BodyRegion::Hand,
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse body regions, used to color joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRegion {
    Face,
    Arm,
    Leg,
    Hand,
}

impl BodyRegion {
    pub fn color(self) -> Color {
        match self {
            BodyRegion::Face => Color::from_rgb8(0xff, 0x6b, 0x6b),
            BodyRegion::Arm => Color::from_rgb8(0x96, 0xce, 0xb4),
            BodyRegion::Leg => Color::from_rgb8(0xff, 0x9f, 0xf3),
            BodyRegion::Hand => Color::from_rgb8(0xfe, 0xca, 0x57),
        }
    }
}

/// A landmark as reported by an estimator: identified by name, with an optional score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLandmark {
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// The landmarks detected for one subject in one frame.
#[derive(Clone, PartialEq, Default)]
pub struct Pose {
    landmarks: [Option<Landmark>; BodyPart::COUNT],
}

impl Pose {
    /// Creates a pose with no landmarks present.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pose from named landmarks.
    ///
    /// Unknown names are ignored and a missing score counts as 0. If a name appears more than
    /// once, the last occurrence wins.
    pub fn from_named<'a, I: IntoIterator<Item = &'a NamedLandmark>>(named: I) -> Self {
        let mut pose = Self::new();
        for lm in named {
            match BodyPart::from_name(&lm.name) {
                Some(part) => pose.set(part, Landmark::new(lm.x, lm.y, lm.score.unwrap_or(0.0))),
                None => log::trace!("ignoring unknown landmark '{}'", lm.name),
            }
        }
        pose
    }

    /// Converts this pose back to its named form, in index order.
    pub fn to_named(&self) -> Vec<NamedLandmark> {
        self.iter()
            .map(|(part, lm)| NamedLandmark {
                name: part.name().to_string(),
                x: lm.x(),
                y: lm.y(),
                score: Some(lm.score()),
            })
            .collect()
    }

    #[inline]
    pub fn get(&self, part: BodyPart) -> Option<Landmark> {
        self.landmarks[part.index()]
    }

    #[inline]
    pub fn set(&mut self, part: BodyPart, landmark: Landmark) {
        self.landmarks[part.index()] = Some(landmark);
    }

    #[inline]
    pub fn remove(&mut self, part: BodyPart) {
        self.landmarks[part.index()] = None;
    }

    /// Returns the landmark for `part` if it is present and its score exceeds `threshold`.
    pub fn confident(&self, part: BodyPart, threshold: f32) -> Option<Landmark> {
        self.get(part).filter(|lm| lm.is_confident(threshold))
    }

    /// Returns the midpoint of two landmarks, with the lower of their two scores.
    ///
    /// Returns [`None`] if either landmark is absent.
    pub fn midpoint(&self, a: BodyPart, b: BodyPart) -> Option<Landmark> {
        let (a, b) = (self.get(a)?, self.get(b)?);
        let mid = nalgebra::center(&a.position(), &b.position());
        Some(Landmark::new(mid.x, mid.y, a.score().min(b.score())))
    }

    /// Returns an iterator over all present landmarks.
    pub fn iter(&self) -> impl Iterator<Item = (BodyPart, Landmark)> + '_ {
        BodyPart::ALL
            .iter()
            .filter_map(|&part| self.get(part).map(|lm| (part, lm)))
    }

    /// Returns the number of present landmarks.
    pub fn len(&self) -> usize {
        self.landmarks.iter().filter(|lm| lm.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn indices_and_names() {
        for (i, part) in BodyPart::ALL.iter().enumerate() {
            assert_eq!(part.index(), i);
            assert_eq!(BodyPart::from_name(part.name()), Some(*part));
        }
        assert_eq!(BodyPart::RightPinky.index(), 22);
        assert_eq!(BodyPart::from_name("left_heel"), None);
    }

    #[test]
    fn regions() {
        assert_eq!(BodyPart::RightEar.region(), BodyRegion::Face);
        assert_eq!(BodyPart::LeftShoulder.region(), BodyRegion::Arm);
        assert_eq!(BodyPart::RightWrist.region(), BodyRegion::Arm);
        assert_eq!(BodyPart::LeftHip.region(), BodyRegion::Leg);
        assert_eq!(BodyPart::RightAnkle.region(), BodyRegion::Leg);
        assert_eq!(BodyPart::LeftThumb.region(), BodyRegion::Hand);
    }

    #[test]
    fn from_named() {
        let named: Vec<NamedLandmark> = serde_json::from_str(
            r#"[
                {"name": "nose", "x": 10, "y": 20, "score": 0.9},
                {"name": "left_hip", "x": 1.5, "y": 2.5},
                {"name": "left_heel", "x": 0, "y": 0, "score": 1}
            ]"#,
        )
        .unwrap();
        let pose = Pose::from_named(&named);

        assert_eq!(pose.len(), 2);
        assert_eq!(pose.get(BodyPart::Nose), Some(Landmark::new(10.0, 20.0, 0.9)));
        assert_eq!(pose.get(BodyPart::LeftHip), Some(Landmark::new(1.5, 2.5, 0.0)));
        assert_eq!(pose.get(BodyPart::RightHip), None);

        let back = Pose::from_named(&pose.to_named());
        assert_eq!(back, pose);
    }

    #[test]
    fn confidence_is_strict() {
        let mut pose = Pose::new();
        pose.set(BodyPart::Nose, Landmark::new(0.0, 0.0, 0.3));
        assert!(pose.confident(BodyPart::Nose, 0.3).is_none());
        assert!(pose.confident(BodyPart::Nose, 0.29).is_some());
        assert!(pose.confident(BodyPart::LeftEye, 0.0).is_none());
    }

    #[test]
    fn midpoint() {
        let mut pose = Pose::new();
        pose.set(BodyPart::LeftShoulder, Landmark::new(100.0, 200.0, 0.9));
        pose.set(BodyPart::RightShoulder, Landmark::new(200.0, 220.0, 0.4));

        let mid = pose
            .midpoint(BodyPart::LeftShoulder, BodyPart::RightShoulder)
            .unwrap();
        assert_relative_eq!(mid.x(), 150.0);
        assert_relative_eq!(mid.y(), 210.0);
        assert_relative_eq!(mid.score(), 0.4);

        assert!(pose.midpoint(BodyPart::LeftHip, BodyPart::RightHip).is_none());
    }
}
