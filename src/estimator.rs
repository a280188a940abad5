//! Landmark estimation capability.
//!
//! The estimator itself is an external collaborator. This module defines the interface the
//! [`scheduler`](crate::scheduler) drives, plus [`ReplayEstimator`], which plays back recorded
//! estimator output.

use std::{fs, path::Path};

use anyhow::Context;

use crate::{
    error::EstimateError,
    image::Image,
    landmark::{NamedLandmark, Pose},
};

/// A request/response landmark estimator.
///
/// Call latency is unspecified and may vary between calls. Implementations are moved onto the
/// estimation worker thread and never called concurrently.
pub trait PoseEstimator: Send + 'static {
    /// Prepares the estimator (loads the model, opens devices, etc.).
    ///
    /// Called once, before any loop starts. A failure here is fatal.
    fn init(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Estimates the poses of all subjects visible in `frame`.
    ///
    /// Landmark coordinates are in `frame`'s pixel space.
    fn estimate(&mut self, frame: &Image) -> Result<Vec<Pose>, EstimateError>;
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for Box<E> {
    fn init(&mut self) -> anyhow::Result<()> {
        (**self).init()
    }

    fn estimate(&mut self, frame: &Image) -> Result<Vec<Pose>, EstimateError> {
        (**self).estimate(frame)
    }
}

/// Replays recorded estimator output, one recorded frame per call, looping forever.
///
/// The recording is a JSON array of frames, each an array of poses, each an array of named
/// landmarks (`{"name": "left_hip", "x": 100, "y": 300, "score": 0.9}`).
#[derive(Debug, Clone)]
pub struct ReplayEstimator {
    frames: Vec<Vec<Pose>>,
    next: usize,
}

impl ReplayEstimator {
    pub fn new(frames: Vec<Vec<Pose>>) -> Self {
        Self { frames, next: 0 }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read pose recording '{}'", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("invalid pose recording '{}'", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let recorded: Vec<Vec<Vec<NamedLandmark>>> = serde_json::from_str(json)?;
        let frames = recorded
            .iter()
            .map(|poses| poses.iter().map(|lms| Pose::from_named(lms)).collect())
            .collect::<Vec<Vec<_>>>();
        log::debug!("loaded pose recording with {} frames", frames.len());
        Ok(Self::new(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl PoseEstimator for ReplayEstimator {
    fn init(&mut self) -> anyhow::Result<()> {
        if self.frames.is_empty() {
            anyhow::bail!("pose recording contains no frames");
        }
        Ok(())
    }

    fn estimate(&mut self, _frame: &Image) -> Result<Vec<Pose>, EstimateError> {
        let poses = self
            .frames
            .get(self.next)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("pose recording is empty"))?;
        self.next = (self.next + 1) % self.frames.len();
        Ok(poses)
    }
}

#[cfg(test)]
mod tests {
    use crate::landmark::BodyPart;

    use super::*;

    const RECORDING: &str = r#"[
        [[{"name": "nose", "x": 10, "y": 20, "score": 0.9}, {"name": "left_hip", "x": 1, "y": 2}]],
        [],
        [
            [{"name": "right_ankle", "x": 5.5, "y": 6.5, "score": 0.4}],
            [{"name": "left_heel", "x": 0, "y": 0, "score": 1.0}]
        ]
    ]"#;

    #[test]
    fn replays_in_a_loop() {
        let mut est = ReplayEstimator::from_json(RECORDING).unwrap();
        est.init().unwrap();
        assert_eq!(est.len(), 3);

        let frame = Image::new(1, 1);
        let first = est.estimate(&frame).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].get(BodyPart::Nose).unwrap().score(), 0.9);
        assert_eq!(first[0].get(BodyPart::LeftHip).unwrap().score(), 0.0);

        assert!(est.estimate(&frame).unwrap().is_empty());

        let third = est.estimate(&frame).unwrap();
        assert_eq!(third.len(), 2);
        assert_eq!(third[0].get(BodyPart::RightAnkle).unwrap().x(), 5.5);
        // Unknown names are ignored.
        assert!(third[1].is_empty());

        assert_eq!(est.estimate(&frame).unwrap(), first);
    }

    #[test]
    fn empty_recording_fails_init() {
        let mut est = ReplayEstimator::from_json("[]").unwrap();
        assert!(est.init().is_err());
        assert!(matches!(
            est.estimate(&Image::new(1, 1)),
            Err(EstimateError::Failed(_))
        ));
    }

    #[test]
    fn invalid_json() {
        assert!(ReplayEstimator::from_json(r#"[[{"name": "nose"}]]"#).is_err());
    }
}
