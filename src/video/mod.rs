//! Video capture.
//!
//! A [`CaptureSource`] always offers the newest frame without blocking. [`LiveCapture`] runs a
//! [`FrameReader`] (such as a [`webcam::Webcam`]) on its own thread to provide that.

pub mod webcam;

use std::{
    io,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use parking_lot::Mutex;

use crate::{
    image::Image,
    snapshot::{SnapshotCell, SnapshotCloser, SnapshotReader},
    timer::{FpsCounter, Timer},
};

/// A camera (or camera stand-in) as seen by the render loop and the estimation scheduler.
pub trait CaptureSource: Send + Sync {
    /// Returns the newest frame, or [`None`] if no frame has been captured yet.
    ///
    /// This must not block.
    fn current_frame(&self) -> Option<Arc<Image>>;

    /// Stops capturing and releases the device. Calling this more than once has no effect.
    fn release(&self);
}

/// A blocking source of frames, driven by [`LiveCapture`].
pub trait FrameReader: Send + 'static {
    /// Blocks until the next frame is available and returns it.
    ///
    /// An error ends the capture.
    fn read_frame(&mut self) -> anyhow::Result<Image>;

    /// Returns timers to include in the periodic FPS log.
    fn timers(&mut self) -> Vec<&mut Timer> {
        Vec::new()
    }
}

/// Reads frames from a [`FrameReader`] on a background thread.
pub struct LiveCapture {
    frames: SnapshotReader<Image>,
    closer: SnapshotCloser<Image>,
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl LiveCapture {
    /// Spawns the capture thread.
    ///
    /// The reader is dropped on the capture thread when capturing stops.
    pub fn spawn<R: FrameReader>(name: &str, mut reader: R) -> io::Result<Self> {
        let (writer, frames) = SnapshotCell::new();
        let closer = writer.closer();
        let stop = Arc::new(AtomicBool::new(false));

        let thread = thread::Builder::new().name(format!("capture {name}")).spawn({
            let stop = stop.clone();
            let mut fps = FpsCounter::new(format!("capture {name}"));
            move || {
                log::trace!("capture thread starting");
                while !stop.load(Ordering::Acquire) {
                    match reader.read_frame() {
                        Ok(frame) => {
                            if !writer.publish(frame) {
                                break;
                            }
                        }
                        Err(e) => {
                            log::error!("capture failed: {e:#}");
                            break;
                        }
                    }
                    fps.tick_with(&mut reader.timers());
                }
                // Dropping the reader stops the stream.
                drop(reader);
                log::trace!("capture thread exiting");
            }
        })?;

        Ok(Self {
            frames,
            closer,
            stop,
            thread: Mutex::new(Some(thread)),
        })
    }
}

impl CaptureSource for LiveCapture {
    fn current_frame(&self) -> Option<Arc<Image>> {
        self.frames.load()
    }

    fn release(&self) {
        self.stop.store(true, Ordering::Release);
        self.closer.close();
        if let Some(thread) = self.thread.lock().take() {
            // The thread exits after its current read returns.
            if thread.join().is_err() {
                log::error!("capture thread panicked");
            }
            log::debug!("capture device released");
        }
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// A fixed image used in place of a camera.
pub struct StillImage {
    frame: Arc<Image>,
    released: AtomicBool,
}

impl StillImage {
    pub fn new(image: Image) -> Self {
        Self {
            frame: Arc::new(image),
            released: AtomicBool::new(false),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self::new(Image::load(path)?))
    }
}

impl CaptureSource for StillImage {
    fn current_frame(&self) -> Option<Arc<Image>> {
        if self.released.load(Ordering::Acquire) {
            None
        } else {
            Some(self.frame.clone())
        }
    }

    fn release(&self) {
        self.released.store(true, Ordering::Release);
    }
}
