//! End-to-end tests of a running session, presented into an in-memory surface.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use tryon::{
    config::Config,
    error::EstimateError,
    estimator::{PoseEstimator, ReplayEstimator},
    garment::{Garment, GarmentSelection, Garments, OverlayAsset},
    image::{Color, Image, Resolution},
    landmark::{BodyPart, Landmark, Pose},
    render::Presenter,
    session::Session,
    video::{CaptureSource, StillImage},
};

/// Records the color of one pixel of every presented frame.
struct PixelSampler {
    size: Resolution,
    at: (u32, u32),
    seen: Vec<Color>,
    frames: usize,
}

impl Presenter for PixelSampler {
    fn size(&self) -> Resolution {
        self.size
    }

    fn is_open(&self) -> bool {
        self.seen.len() < self.frames
    }

    fn present(&mut self, image: &Image) -> anyhow::Result<()> {
        self.seen.push(image.get(self.at.0, self.at.1));
        thread::sleep(Duration::from_millis(2));
        Ok(())
    }
}

fn legs() -> Pose {
    let mut pose = Pose::new();
    pose.set(BodyPart::LeftHip, Landmark::new(20.0, 20.0, 0.9));
    pose.set(BodyPart::RightHip, Landmark::new(40.0, 20.0, 0.9));
    pose.set(BodyPart::LeftKnee, Landmark::new(22.0, 40.0, 0.9));
    pose.set(BodyPart::RightKnee, Landmark::new(38.0, 40.0, 0.9));
    pose
}

/// Succeeds once, then fails forever.
struct FlakyEstimator {
    calls: Arc<AtomicUsize>,
}

impl PoseEstimator for FlakyEstimator {
    fn estimate(&mut self, _: &Image) -> Result<Vec<Pose>, EstimateError> {
        if self.calls.fetch_add(1, Ordering::Relaxed) == 0 {
            Ok(vec![legs()])
        } else {
            Err(EstimateError::Failed(anyhow::anyhow!("lost track")))
        }
    }
}

fn pants() -> Garments {
    Garments {
        lower: Some(OverlayAsset::from_image(
            "pants",
            Image::filled(10, 10, Color::BLUE),
        )),
        upper: None,
    }
}

fn config() -> Config {
    Config {
        estimation_interval_ms: 1,
        ..Config::default()
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < Duration::from_secs(5), "timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn overlays_stay_after_estimation_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (_selection, selection) = GarmentSelection::new(pants());
    let mut session = Session::start(
        &config(),
        Arc::new(StillImage::new(Image::filled(64, 64, Color::WHITE))),
        FlakyEstimator {
            calls: calls.clone(),
        },
        selection,
    )
    .unwrap();

    // Wait for the successful estimation and a few failing ones.
    wait_until(|| calls.load(Ordering::Relaxed) >= 3);
    assert!(session.poses().load().is_some());

    // The pants span x=12..48 and reach from y=17 down to y=53, below the knees.
    let mut sampler = PixelSampler {
        size: Resolution::new(64, 64),
        at: (30, 45),
        seen: Vec::new(),
        frames: 20,
    };
    session.run(&mut sampler).unwrap();

    assert!(calls.load(Ordering::Relaxed) > 3);
    assert_eq!(sampler.seen, [Color::BLUE; 20]);
}

#[test]
fn replayed_poses_drive_overlays() {
    let recording = r#"[[[
        {"name": "left_hip", "x": 20, "y": 20, "score": 0.9},
        {"name": "right_hip", "x": 40, "y": 20, "score": 0.9},
        {"name": "left_knee", "x": 22, "y": 40, "score": 0.9},
        {"name": "right_knee", "x": 38, "y": 40, "score": 0.9}
    ]]]"#;
    let (mut selection, reader) = GarmentSelection::new(Garments::default());
    let mut session = Session::start(
        &config(),
        Arc::new(StillImage::new(Image::filled(64, 64, Color::WHITE))),
        ReplayEstimator::from_json(recording).unwrap(),
        reader,
    )
    .unwrap();
    let poses = session.poses();
    wait_until(|| poses.load().is_some());

    // The selection is read every frame, so changing it takes effect immediately.
    selection.set(Garment::Lower, pants().lower);

    // Twice the source size; the garment is scaled along.
    let mut sampler = PixelSampler {
        size: Resolution::new(128, 128),
        at: (60, 90),
        seen: Vec::new(),
        frames: 1,
    };
    session.run(&mut sampler).unwrap();
    assert_eq!(sampler.seen, [Color::BLUE]);
    assert!(poses.is_closed());
}

#[test]
fn failing_init_starts_nothing() {
    let (_selection, selection) = GarmentSelection::new(Garments::default());
    let still = Arc::new(StillImage::new(Image::new(4, 4)));
    let result = Session::start(
        &config(),
        still.clone(),
        ReplayEstimator::new(Vec::new()),
        selection,
    );
    assert!(result.is_err());

    // The capture source was not released; its lifecycle belongs to the caller.
    assert!(still.current_frame().is_some());
}
