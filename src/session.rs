//! Start-up and shutdown of the whole pipeline.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;

use crate::{
    compositor::Compositor,
    config::Config,
    estimator::PoseEstimator,
    garment::SelectionReader,
    landmark::Pose,
    render::{Presenter, RenderLoop},
    scheduler::EstimationScheduler,
    snapshot::SnapshotReader,
    video::CaptureSource,
};

/// Requests a running [`Session`] to stop.
///
/// Can be cloned and triggered from any thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A running pipeline: capture, estimation scheduler and render loop.
///
/// Shutting down happens in a fixed order: the render loop stops first, then the scheduler stops
/// (discarding the result of an estimation that is still running, without waiting for it), and
/// finally the capture device is released. Dropping a [`Session`] shuts it down as well.
pub struct Session {
    capture: Arc<dyn CaptureSource>,
    scheduler: EstimationScheduler,
    render: RenderLoop,
    stop: StopHandle,
    shut_down: bool,
}

impl Session {
    /// Initializes `estimator` and starts the estimation scheduler.
    ///
    /// Fails if the estimator cannot be initialized. In that case nothing has been started.
    pub fn start<E: PoseEstimator>(
        config: &Config,
        capture: Arc<dyn CaptureSource>,
        mut estimator: E,
        selection: SelectionReader,
    ) -> anyhow::Result<Self> {
        estimator
            .init()
            .context("failed to initialize pose estimator")?;

        let scheduler =
            EstimationScheduler::spawn(config.estimation_interval(), capture.clone(), estimator)
                .context("failed to spawn estimation threads")?;
        let render = RenderLoop::new(
            Compositor::new(config),
            capture.clone(),
            scheduler.poses(),
            selection,
        );
        log::info!(
            "session started (estimating every {:?}, confidence threshold {})",
            config.estimation_interval(),
            config.confidence_threshold,
        );

        Ok(Self {
            capture,
            scheduler,
            render,
            stop: StopHandle::new(),
            shut_down: false,
        })
    }

    /// Returns a handle that makes [`Session::run`] return after the current frame.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Returns a reader for the poses published by the estimation scheduler.
    pub fn poses(&self) -> SnapshotReader<Vec<Pose>> {
        self.scheduler.poses()
    }

    /// Runs the render loop on the calling thread until `presenter` closes or the session is
    /// stopped, then shuts the session down.
    pub fn run<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> anyhow::Result<()> {
        let result = self.render.run(presenter, &self.stop);
        self.shutdown();
        result
    }

    /// Shuts the session down. Does nothing if it was already shut down.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.stop.stop();
        self.scheduler.stop();
        self.capture.release();
        log::info!("session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
