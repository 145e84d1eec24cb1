use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crossbeam_queue::SegQueue;

use crate::shared::LocationSample;

#[derive(Debug, Default)]
struct Inner {
    queue: SegQueue<LocationSample>,
    closed: AtomicBool,
}

/// FIFO hand-off between a location provider and the controller.
///
/// Providers may push from any thread; the controller is the only consumer and
/// drains it in arrival order. Once closed every push is dropped, so a provider
/// that keeps firing after unsubscribing can not leak samples into a later session.
#[derive(Debug, Clone, Default)]
pub struct SampleInbox {
    inner: Arc<Inner>,
}

impl SampleInbox {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns `false` when the inbox is closed and the sample was dropped.
    pub fn push(&self, sample: LocationSample) -> bool {
        if self.is_closed() {
            return false;
        }
        self.inner.queue.push(sample);
        true
    }

    pub fn pop(&self) -> Option<LocationSample> {
        self.inner.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Closes the inbox and discards anything still queued.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        while self.inner.queue.pop().is_some() {}
    }
}
