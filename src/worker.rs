//! Named worker threads fed through a bounded channel.

use std::{
    io,
    panic::resume_unwind,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Sender, TrySendError};

/// A builder object that can be used to configure and spawn a [`Worker`].
#[derive(Clone)]
pub struct WorkerBuilder {
    name: Option<String>,
    capacity: usize,
}

impl WorkerBuilder {
    /// Sets the name of the [`Worker`] thread.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the channel capacity of the [`Worker`].
    ///
    /// By default, a capacity of 0 is used, which means that [`Worker::try_send`] only succeeds
    /// while the worker is idle and waiting for a message.
    pub fn capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Spawns a [`Worker`] thread that uses `handler` to process incoming messages.
    pub fn spawn<I, F>(self, mut handler: F) -> io::Result<Worker<I>>
    where
        I: Send + 'static,
        F: FnMut(I) + Send + 'static,
    {
        let (sender, recv) = crossbeam_channel::bounded(self.capacity);
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        let name = self.name.unwrap_or_else(|| String::from("<unnamed>"));
        let handle = builder.spawn(move || {
            log::trace!("worker '{name}' starting");
            for message in recv {
                handler(message);
            }
            log::trace!("worker '{name}' exiting");
        })?;

        Ok(Worker {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

/// A handle to a worker thread that processes messages of type `I`.
///
/// When dropped, the channel to the thread will be closed and the thread will be joined, after it
/// has finished processing the messages already sent. If the thread has panicked, the panic will
/// be forwarded to the thread dropping the `Worker`.
pub struct Worker<I: Send + 'static> {
    sender: Option<Sender<I>>,
    handle: Option<JoinHandle<()>>,
}

impl<I: Send + 'static> Drop for Worker<I> {
    fn drop(&mut self) {
        // Close the channel to signal the thread to exit.
        drop(self.sender.take());

        self.wait_for_exit();
    }
}

impl Worker<()> {
    /// Returns a builder that can be used to configure and spawn a [`Worker`].
    #[inline]
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder {
            name: None,
            capacity: 0,
        }
    }
}

impl<I: Send + 'static> Worker<I> {
    fn wait_for_exit(&mut self) {
        // Wait for it to exit and propagate its panic if it panicked.
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => {}
                Err(payload) => {
                    if !thread::panicking() {
                        resume_unwind(payload);
                    }
                }
            }
        }
    }

    /// Attempts to send a message to the worker thread without blocking.
    ///
    /// If the worker's channel is full, the message is handed back as `Err`.
    ///
    /// If the worker has panicked, this will propagate the panic to the calling thread.
    pub fn try_send(&mut self, msg: I) -> Result<(), I> {
        let Some(sender) = &self.sender else {
            return Err(msg);
        };
        match sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(msg)) => Err(msg),
            Err(TrySendError::Disconnected(msg)) => {
                self.wait_for_exit();
                Err(msg)
            }
        }
    }

    /// Closes the channel to the worker thread without waiting for it to exit.
    ///
    /// The thread finishes the message it is processing in the background. A panic on the thread
    /// is no longer propagated.
    pub fn detach(mut self) {
        drop(self.sender.take());
        drop(self.handle.take());
    }
}

#[cfg(test)]
mod tests {
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        sync::{mpsc, Arc, Barrier},
        time::Duration,
    };

    use super::*;

    fn silent_panic(payload: String) {
        resume_unwind(Box::new(payload));
    }

    #[test]
    fn worker_propagates_panic_on_drop() {
        let mut worker = Worker::builder()
            .capacity(1)
            .spawn(|_: ()| silent_panic("worker panic".into()))
            .unwrap();
        worker.try_send(()).unwrap();
        catch_unwind(AssertUnwindSafe(|| drop(worker))).unwrap_err();
    }

    #[test]
    fn worker_propagates_panic_on_send() {
        let mut worker = Worker::builder()
            .capacity(1)
            .spawn(|_| silent_panic("worker panic".into()))
            .unwrap();
        worker.try_send(()).unwrap();
        catch_unwind(AssertUnwindSafe(|| loop {
            worker.try_send(()).ok();
            thread::sleep(Duration::from_millis(1));
        }))
        .unwrap_err();
        catch_unwind(AssertUnwindSafe(|| drop(worker))).unwrap();
    }

    #[test]
    fn try_send_rejects_when_full() {
        let barrier = Arc::new(Barrier::new(2));
        let (started_tx, started) = mpsc::channel();
        let mut worker = Worker::builder()
            .name("busy")
            .capacity(1)
            .spawn({
                let barrier = barrier.clone();
                move |_: u32| {
                    started_tx.send(()).ok();
                    barrier.wait();
                }
            })
            .unwrap();

        // The thread blocks on the barrier while handling the first message, and the second one
        // fills the channel.
        worker.try_send(0).unwrap();
        started.recv().unwrap();
        worker.try_send(1).unwrap();
        assert_eq!(worker.try_send(2), Err(2));

        barrier.wait();
        barrier.wait();
        drop(worker);
    }

    #[test]
    fn detach_does_not_wait_for_handler() {
        let (finish, finish_rx) = mpsc::channel::<()>();
        let (done_tx, done) = mpsc::channel();
        let mut worker = Worker::builder()
            .name("slow")
            .capacity(1)
            .spawn(move |_: ()| {
                finish_rx.recv().ok();
                done_tx.send(()).ok();
            })
            .unwrap();
        worker.try_send(()).unwrap();

        // Dropping would block here, since the handler waits for `finish`.
        worker.detach();
        assert!(done.try_recv().is_err());

        drop(finish);
        done.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
