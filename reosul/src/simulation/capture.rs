use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::symbols::SingleOutput;

use super::ViolationKind;

/// What a read on an output port observed during one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Observation {
    Datum(String),
    Nothing,
}

/// The shared data of a `CaptureBuffer`.
struct Inner {
    capacity: usize,
    has_overflowed: AtomicBool,
    buffer: Mutex<VecDeque<Observation>>,
}

/// Per-output-port record of the observations of a run, one per step.
///
/// Observations beyond the capacity are dropped and flag the buffer as
/// overflowed.
pub(crate) struct CaptureBuffer {
    inner: Arc<Inner>,
}

impl CaptureBuffer {
    /// Creates a buffer holding up to `capacity` observations.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                has_overflowed: AtomicBool::new(false),
                buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            }),
        }
    }

    /// Returns a writer handle to this buffer.
    pub(crate) fn writer(&self) -> CaptureWriter {
        CaptureWriter {
            inner: self.inner.clone(),
        }
    }

    /// Converts the observations into one output per step, in step order.
    ///
    /// On failure, returns the first offending step with the kind of
    /// violation.
    pub(crate) fn drain(self) -> Result<Vec<SingleOutput>, (usize, ViolationKind)> {
        let capacity = self.inner.capacity;
        if self.inner.has_overflowed.load(Ordering::Relaxed) {
            return Err((capacity, ViolationKind::Overflow));
        }

        let mut buffer = self.inner.buffer.lock();
        let outputs = (0..capacity)
            .map(|step| match buffer.pop_front() {
                None => Err((step, ViolationKind::MissingObservation)),
                Some(Observation::Nothing) => Ok(SingleOutput::Empty),
                Some(Observation::Datum(value)) if value.is_empty() => {
                    Err((step, ViolationKind::EmptyDatum))
                }
                Some(Observation::Datum(value)) => Ok(SingleOutput::Datum(value)),
            })
            .collect();

        outputs
    }
}

impl fmt::Debug for CaptureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.inner.buffer.lock().len())
            .finish_non_exhaustive()
    }
}

/// A producer handle of a `CaptureBuffer`.
pub(crate) struct CaptureWriter {
    inner: Arc<Inner>,
}

impl CaptureWriter {
    /// Appends an observation.
    pub(crate) fn write(&self, observation: Observation) {
        let mut buffer = self.inner.buffer.lock();
        if buffer.len() == self.inner.capacity {
            self.inner.has_overflowed.store(true, Ordering::Relaxed);

            return;
        }
        buffer.push_back(observation);
    }
}
