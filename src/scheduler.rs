//! Fixed-interval pose estimation.
//!
//! The [`EstimationScheduler`] owns two threads: a ticker that fires at the configured interval,
//! and an estimation [`Worker`] that runs the [`PoseEstimator`]. A tick is skipped while an
//! estimation is still running, so there is never more than one estimation in flight and no
//! backlog builds up when the estimator is slower than the interval.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{select, Sender};

use crate::{
    estimator::PoseEstimator,
    image::Image,
    landmark::Pose,
    snapshot::{SnapshotCell, SnapshotCloser, SnapshotReader},
    timer::{FpsCounter, Timer},
    video::CaptureSource,
    worker::Worker,
};

/// Runs a [`PoseEstimator`] on the newest captured frame at a fixed interval.
///
/// Results are published to a snapshot cell of [`Pose`]s. A failed estimation leaves the previous
/// snapshot in place; the next tick tries again.
pub struct EstimationScheduler {
    poses: SnapshotReader<Vec<Pose>>,
    closer: SnapshotCloser<Vec<Pose>>,
    stop: Option<Sender<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl EstimationScheduler {
    /// Starts the ticker and estimation threads.
    ///
    /// `estimator` must already be initialized.
    pub fn spawn<E: PoseEstimator>(
        interval: Duration,
        capture: Arc<dyn CaptureSource>,
        mut estimator: E,
    ) -> io::Result<Self> {
        let (writer, poses) = SnapshotCell::new::<Vec<Pose>>();
        let closer = writer.closer();
        let in_flight = Arc::new(AtomicBool::new(false));

        let mut t_estimate = Timer::new("estimate");
        let mut fps = FpsCounter::new("estimation");
        let mut worker = Worker::builder()
            .name("estimation")
            .capacity(1)
            .spawn({
                let in_flight = in_flight.clone();
                move |frame: Arc<Image>| {
                    match t_estimate.time(|| estimator.estimate(&frame)) {
                        Ok(poses) => {
                            if !writer.publish(poses) {
                                log::trace!("scheduler stopped, discarding estimation result");
                            }
                        }
                        Err(e) => log::debug!("{e:#}; keeping previous poses"),
                    }
                    in_flight.store(false, Ordering::Release);
                    fps.tick_with(&mut [&mut t_estimate]);
                }
            })?;

        let (stop, stopped) = crossbeam_channel::bounded::<()>(0);
        let ticker = thread::Builder::new()
            .name("estimation ticker".into())
            .spawn(move || {
                let ticks = crossbeam_channel::tick(interval);
                loop {
                    select! {
                        recv(ticks) -> _ => {}
                        recv(stopped) -> _ => break,
                    }

                    if in_flight.swap(true, Ordering::AcqRel) {
                        log::trace!("estimation still running, skipping tick");
                        continue;
                    }
                    let Some(frame) = capture.current_frame() else {
                        in_flight.store(false, Ordering::Release);
                        log::trace!("no frame captured yet, skipping tick");
                        continue;
                    };
                    if worker.try_send(frame).is_err() {
                        in_flight.store(false, Ordering::Release);
                    }
                }

                // A running estimation is left to finish on its own. The cell was closed before
                // the ticker was stopped, so its result is discarded.
                worker.detach();
            })?;

        Ok(Self {
            poses,
            closer,
            stop: Some(stop),
            ticker: Some(ticker),
        })
    }

    /// Returns a reader for the latest estimation result.
    pub fn poses(&self) -> SnapshotReader<Vec<Pose>> {
        self.poses.clone()
    }

    /// Stops the scheduler.
    ///
    /// Any estimation still in flight will not publish its result, and is not waited for. Calling
    /// this more than once has no effect.
    pub fn stop(&mut self) {
        self.closer.close();
        drop(self.stop.take());
        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                log::error!("estimation thread panicked");
            }
            log::debug!("estimation scheduler stopped");
        }
    }
}

impl Drop for EstimationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc,
        },
        time::Instant,
    };

    use crate::{
        error::EstimateError,
        landmark::BodyPart,
        test::{fn_estimator, pose},
        video::StillImage,
    };

    use super::*;

    fn still() -> Arc<dyn CaptureSource> {
        Arc::new(StillImage::new(Image::new(4, 4)))
    }

    fn wait_for<T>(timeout: Duration, mut f: impl FnMut() -> Option<T>) -> T {
        let start = Instant::now();
        loop {
            if let Some(t) = f() {
                return t;
            }
            assert!(start.elapsed() < timeout, "timed out");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn nose_at(x: f32) -> Vec<Pose> {
        vec![pose(&[(BodyPart::Nose, x, 0.0, 1.0)])]
    }

    #[test]
    fn publishes_latest_result() {
        let mut calls = 0.0;
        let scheduler = EstimationScheduler::spawn(
            Duration::from_millis(2),
            still(),
            fn_estimator(move |_: &Image| {
                calls += 1.0;
                Ok(nose_at(calls))
            }),
        )
        .unwrap();

        let poses = scheduler.poses();
        let x = wait_for(Duration::from_secs(5), || {
            poses
                .load()
                .map(|p| p[0].get(BodyPart::Nose).unwrap().x())
                .filter(|x| *x >= 3.0)
        });
        assert!(x >= 3.0);
    }

    #[test]
    fn at_most_one_estimation_in_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut scheduler = EstimationScheduler::spawn(Duration::from_millis(1), still(), {
            let calls = calls.clone();
            fn_estimator(move |_: &Image| {
                calls.fetch_add(1, Ordering::Relaxed);
                thread::sleep(Duration::from_millis(20));
                Ok(Vec::new())
            })
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        scheduler.stop();

        // Roughly 100 ticks fired, but each estimation takes 20ms.
        let calls = calls.load(Ordering::Relaxed);
        assert!((1..=10).contains(&calls), "{calls} calls");
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut first = true;
        let attempts = Arc::new(AtomicUsize::new(0));
        let scheduler = EstimationScheduler::spawn(Duration::from_millis(1), still(), {
            let attempts = attempts.clone();
            fn_estimator(move |_: &Image| {
                attempts.fetch_add(1, Ordering::Relaxed);
                if first {
                    first = false;
                    Ok(nose_at(7.0))
                } else {
                    Err(EstimateError::Failed(anyhow::anyhow!("model hiccup")))
                }
            })
        })
        .unwrap();

        wait_for(Duration::from_secs(5), || {
            (attempts.load(Ordering::Relaxed) >= 5).then_some(())
        });
        let poses = scheduler.poses().load().unwrap();
        assert_eq!(*poses, nose_at(7.0));
    }

    #[test]
    fn no_frame_no_estimation() {
        struct NoFrames;
        impl CaptureSource for NoFrames {
            fn current_frame(&self) -> Option<Arc<Image>> {
                None
            }
            fn release(&self) {}
        }

        let mut scheduler = EstimationScheduler::spawn(
            Duration::from_millis(1),
            Arc::new(NoFrames),
            fn_estimator(|_: &Image| -> Result<Vec<Pose>, EstimateError> {
                panic!("estimator called without a frame")
            }),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(20));
        scheduler.stop();
        assert!(scheduler.poses().load().is_none());
    }

    #[test]
    fn stop_discards_in_flight_result() {
        let (started_tx, started) = mpsc::channel();
        let (finish, finish_rx) = mpsc::channel::<()>();
        let (done_tx, done) = mpsc::channel();
        let mut scheduler = EstimationScheduler::spawn(
            Duration::from_millis(1),
            still(),
            fn_estimator(move |_: &Image| {
                started_tx.send(()).ok();
                finish_rx.recv().ok();
                done_tx.send(()).ok();
                Ok(nose_at(1.0))
            }),
        )
        .unwrap();
        let poses = scheduler.poses();

        // Returns while the estimation is still blocked.
        started.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.stop();
        assert!(poses.is_closed());

        // Let the estimation complete after the scheduler has stopped.
        drop(finish);
        done.recv_timeout(Duration::from_secs(5)).unwrap();
        thread::sleep(Duration::from_millis(10));
        assert!(poses.load().is_none());
    }

    #[test]
    fn stop_does_not_wait_for_slow_estimation() {
        let (started_tx, started) = mpsc::channel();
        let mut scheduler = EstimationScheduler::spawn(
            Duration::from_millis(1),
            still(),
            fn_estimator(move |_: &Image| {
                started_tx.send(()).ok();
                thread::sleep(Duration::from_secs(3));
                Ok(nose_at(1.0))
            }),
        )
        .unwrap();

        started.recv_timeout(Duration::from_secs(5)).unwrap();
        let start = Instant::now();
        scheduler.stop();
        assert!(start.elapsed() < Duration::from_secs(1), "{:?}", start.elapsed());
    }
}
