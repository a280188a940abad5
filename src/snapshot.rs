//! Single-slot, last-write-wins value sharing between threads.
//!
//! A [`SnapshotCell`] holds at most one value. Publishing a new value fully replaces the previous
//! one; nothing is ever queued. Readers get an [`Arc`] to whatever value was published last, so a
//! reader can never observe a partially written value, and holding on to a snapshot does not
//! delay the writer.
//!
//! The cell is split into a single [`SnapshotWriter`] and any number of [`SnapshotReader`]s. The
//! writer can hand out [`SnapshotCloser`]s, which permanently stop it from publishing further
//! values.

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

struct Slot<T> {
    value: Option<Arc<T>>,
    closed: bool,
}

struct Shared<T> {
    // Held only for the duration of an `Arc` clone or swap.
    slot: RwLock<Slot<T>>,
}

/// Constructor namespace for a new cell.
pub struct SnapshotCell;

impl SnapshotCell {
    /// Creates an empty cell, returning its writer and a first reader.
    pub fn new<T>() -> (SnapshotWriter<T>, SnapshotReader<T>) {
        Self::with_value(None)
    }

    /// Creates a cell that initially holds `value`.
    pub fn with_value<T>(value: Option<T>) -> (SnapshotWriter<T>, SnapshotReader<T>) {
        let shared = Arc::new(Shared {
            slot: RwLock::new(Slot {
                value: value.map(Arc::new),
                closed: false,
            }),
        });
        (
            SnapshotWriter {
                shared: shared.clone(),
            },
            SnapshotReader { shared },
        )
    }
}

/// The write half of a snapshot cell.
///
/// There is exactly one writer per cell, and it cannot be cloned.
pub struct SnapshotWriter<T> {
    shared: Arc<Shared<T>>,
}

impl<T> SnapshotWriter<T> {
    /// Replaces the value in the cell.
    ///
    /// Returns `false` and drops `value` if the cell has been closed.
    pub fn publish(&self, value: T) -> bool {
        self.publish_arc(Arc::new(value))
    }

    /// Replaces the value in the cell with an already shared value.
    pub fn publish_arc(&self, value: Arc<T>) -> bool {
        let old = {
            let mut slot = self.shared.slot.write();
            if slot.closed {
                return false;
            }
            slot.value.replace(value)
        };
        // The previous value may be the last reference; drop it outside the lock.
        drop(old);
        true
    }

    /// Empties the cell. Does nothing if the cell has been closed.
    pub fn clear(&self) -> bool {
        let old = {
            let mut slot = self.shared.slot.write();
            if slot.closed {
                return false;
            }
            slot.value.take()
        };
        drop(old);
        true
    }

    /// Returns a new reader for this cell.
    pub fn reader(&self) -> SnapshotReader<T> {
        SnapshotReader {
            shared: self.shared.clone(),
        }
    }

    /// Returns a handle that can close this cell from another thread.
    pub fn closer(&self) -> SnapshotCloser<T> {
        SnapshotCloser {
            shared: self.shared.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.slot.read().closed
    }
}

impl<T> fmt::Debug for SnapshotWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotWriter")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// A read handle to a snapshot cell.
pub struct SnapshotReader<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SnapshotReader<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> SnapshotReader<T> {
    /// Returns the most recently published value, or [`None`] if nothing was published yet.
    ///
    /// This never waits for the writer beyond the duration of a pointer swap.
    pub fn load(&self) -> Option<Arc<T>> {
        self.shared.slot.read().value.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.slot.read().closed
    }
}

impl<T> fmt::Debug for SnapshotReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Closes a snapshot cell for writing.
pub struct SnapshotCloser<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SnapshotCloser<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> SnapshotCloser<T> {
    /// Closes the cell.
    ///
    /// Once this returns, no publish can modify the cell anymore. The current value stays
    /// readable. Closing an already closed cell does nothing.
    pub fn close(&self) {
        self.shared.slot.write().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn last_write_wins() {
        let (writer, reader) = SnapshotCell::new();
        assert!(reader.load().is_none());

        assert!(writer.publish(1));
        assert!(writer.publish(2));
        assert_eq!(reader.load().as_deref(), Some(&2));
        assert_eq!(reader.clone().load().as_deref(), Some(&2));

        let held = reader.load().unwrap();
        assert!(writer.publish(3));
        assert_eq!(*held, 2);
        assert_eq!(reader.load().as_deref(), Some(&3));

        assert!(writer.clear());
        assert!(reader.load().is_none());
    }

    #[test]
    fn close_discards_writes() {
        let (writer, reader) = SnapshotCell::with_value(Some("a"));
        let closer = writer.closer();
        closer.close();
        closer.close();

        assert!(writer.is_closed());
        assert!(reader.is_closed());
        assert!(!writer.publish("b"));
        assert!(!writer.clear());
        assert_eq!(reader.load().as_deref(), Some(&"a"));
    }

    #[test]
    fn readers_never_see_torn_values() {
        // Each published value is internally consistent; readers check that invariant.
        let (writer, reader) = SnapshotCell::new::<Vec<u32>>();
        let readers = (0..4)
            .map(|_| {
                let reader = reader.clone();
                thread::spawn(move || {
                    let mut seen = 0;
                    while seen < 1000 {
                        if let Some(v) = reader.load() {
                            assert!(v.iter().all(|x| *x == v[0]), "{v:?}");
                            seen += 1;
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        let mut i = 0;
        while !readers.iter().all(|r| r.is_finished()) {
            writer.publish(vec![i; 64]);
            i += 1;
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}
