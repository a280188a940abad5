//! The display-paced render loop.

use std::sync::Arc;

use crate::{
    compositor::Compositor,
    garment::SelectionReader,
    image::{Image, Resolution},
    landmark::Pose,
    session::StopHandle,
    snapshot::SnapshotReader,
    surface::Canvas,
    timer::{FpsCounter, Timer},
    video::CaptureSource,
};

/// Something that can display rendered frames.
///
/// [`Presenter::present`] blocks until the next display refresh, which paces the render loop.
pub trait Presenter {
    /// Returns the current size of the drawable area.
    ///
    /// This may change between frames, e.g. when the user resizes the window.
    fn size(&self) -> Resolution;

    /// Returns whether the presenter still accepts frames.
    fn is_open(&self) -> bool;

    /// Displays `image`.
    fn present(&mut self, image: &Image) -> anyhow::Result<()>;
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn size(&self) -> Resolution {
        (**self).size()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn present(&mut self, image: &Image) -> anyhow::Result<()> {
        (**self).present(image)
    }
}

/// Draws the newest camera frame and the latest poses, once per display refresh.
///
/// The render loop never waits for the estimator. It reads whatever poses were published last,
/// which may be up to one estimation interval old.
pub struct RenderLoop {
    compositor: Compositor,
    capture: Arc<dyn CaptureSource>,
    poses: SnapshotReader<Vec<Pose>>,
    selection: SelectionReader,
    canvas: Canvas,
    fps: FpsCounter,
    t_compose: Timer,
    t_present: Timer,
}

impl RenderLoop {
    pub fn new(
        compositor: Compositor,
        capture: Arc<dyn CaptureSource>,
        poses: SnapshotReader<Vec<Pose>>,
        selection: SelectionReader,
    ) -> Self {
        Self {
            compositor,
            capture,
            poses,
            selection,
            canvas: Canvas::new(Resolution::new(0, 0)),
            fps: FpsCounter::new("render"),
            t_compose: Timer::new("compose"),
            t_present: Timer::new("present"),
        }
    }

    /// Renders a single frame at `size` and returns it.
    ///
    /// Failures of individual overlays are logged and otherwise ignored.
    pub fn step(&mut self, size: Resolution) -> &Image {
        self.canvas.resize(size);
        if size.is_empty() {
            return self.canvas.image();
        }

        let frame = self.capture.current_frame();
        let poses = self.poses.load();
        let garments = self.selection.load();
        let poses = poses.as_deref().map(Vec::as_slice).unwrap_or_default();

        let failures = self.t_compose.time(|| {
            self.compositor
                .compose(&mut self.canvas, frame.as_deref(), poses, &garments)
        });
        for (overlay, error) in failures {
            log::debug!("failed to draw {overlay}: {error}");
        }

        self.canvas.image()
    }

    /// Renders frames into `presenter` until it closes or `stop` is triggered.
    ///
    /// Returns an error if presenting a frame fails.
    pub fn run<P: Presenter + ?Sized>(
        &mut self,
        presenter: &mut P,
        stop: &StopHandle,
    ) -> anyhow::Result<()> {
        log::debug!("render loop starting");
        while presenter.is_open() && !stop.is_stopped() {
            let size = presenter.size();
            self.step(size);

            self.t_present
                .time(|| presenter.present(self.canvas.image()))?;

            self.fps
                .tick_with(&mut [&mut self.t_compose, &mut self.t_present]);
        }
        log::debug!("render loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{Config, Overlays},
        garment::{GarmentSelection, Garments, OverlayAsset},
        image::Color,
        landmark::BodyPart::*,
        snapshot::SnapshotCell,
        test::pose,
        video::StillImage,
    };

    use super::*;

    struct Headless {
        size: Resolution,
        frames: Vec<Image>,
        limit: usize,
    }

    impl Presenter for Headless {
        fn size(&self) -> Resolution {
            self.size
        }

        fn is_open(&self) -> bool {
            self.frames.len() < self.limit
        }

        fn present(&mut self, image: &Image) -> anyhow::Result<()> {
            self.frames.push(image.clone());
            Ok(())
        }
    }

    fn render_loop(poses: SnapshotReader<Vec<Pose>>) -> RenderLoop {
        let (_selection, selection) = GarmentSelection::new(Garments {
            lower: None,
            upper: Some(OverlayAsset::from_image(
                "shirt",
                Image::filled(10, 10, Color::RED),
            )),
        });
        let config = Config {
            overlays: Overlays {
                keypoints: false,
                skeleton: false,
                face_highlight: false,
                garments: true,
            },
            ..Config::default()
        };
        RenderLoop::new(
            Compositor::new(&config),
            Arc::new(StillImage::new(Image::filled(40, 40, Color::WHITE))),
            poses,
            selection,
        )
    }

    fn torso() -> Vec<Pose> {
        vec![pose(&[
            (LeftShoulder, 10.0, 10.0, 0.9),
            (RightShoulder, 30.0, 10.0, 0.9),
            (LeftHip, 12.0, 30.0, 0.9),
            (RightHip, 28.0, 30.0, 0.9),
        ])]
    }

    #[test]
    fn frame_without_poses() {
        let (_writer, poses) = SnapshotCell::new();
        let mut render = render_loop(poses);
        let image = render.step(Resolution::new(80, 80));
        assert_eq!(image.resolution(), Resolution::new(80, 80));
        assert_eq!(image.get(40, 40), Color::WHITE);
    }

    #[test]
    fn follows_surface_size() {
        let (writer, poses) = SnapshotCell::new();
        writer.publish(torso());
        let mut render = render_loop(poses);

        let small = render.step(Resolution::new(40, 40)).clone();
        assert_eq!(small.get(20, 20), Color::RED);
        let large = render.step(Resolution::new(120, 80)).clone();
        assert_eq!(large.resolution(), Resolution::new(120, 80));
        assert_eq!(large.get(60, 40), Color::RED);

        assert!(render.step(Resolution::new(0, 0)).resolution().is_empty());
    }

    #[test]
    fn run_until_closed_or_stopped() {
        let (_writer, poses) = SnapshotCell::new();
        let mut render = render_loop(poses);
        let mut presenter = Headless {
            size: Resolution::new(16, 16),
            frames: Vec::new(),
            limit: 3,
        };
        render.run(&mut presenter, &StopHandle::new()).unwrap();
        assert_eq!(presenter.frames.len(), 3);

        let stop = StopHandle::new();
        stop.stop();
        presenter.limit = 10;
        render.run(&mut presenter, &stop).unwrap();
        assert_eq!(presenter.frames.len(), 3);
    }
}
