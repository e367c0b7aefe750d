//! In-process envelope buffer between `track` and `flush`.
//!
//! Producers never block: envelopes go onto a channel. Draining holds a
//! re-entrant lock for as long as the batch is being delivered, so flushes
//! from different threads run one after another while a fault raised on the
//! flushing thread itself can still flush again.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};

use parking_lot::ReentrantMutex;

use crate::contracts::Envelope;

pub(crate) struct EnvelopeBuffer {
    sender: Sender<Envelope>,
    receiver: ReentrantMutex<Receiver<Envelope>>,
    pending: AtomicUsize,
}

impl EnvelopeBuffer {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver: ReentrantMutex::new(receiver),
            pending: AtomicUsize::new(0),
        }
    }

    /// Queue an envelope; returns the number now pending.
    pub(crate) fn push(&self, envelope: Envelope) -> usize {
        // Count before sending so a concurrent drain never subtracts first.
        let pending = self.pending.fetch_add(1, Ordering::AcqRel) + 1;
        // The receiver lives as long as self, so send cannot fail.
        if self.sender.send(envelope).is_err() {
            return self.pending.fetch_sub(1, Ordering::AcqRel) - 1;
        }
        pending
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Take everything queued so far and pass it to `deliver` before releasing
    /// the drain lock. Waits for a delivery running on another thread.
    pub(crate) fn drain_into<R>(&self, deliver: impl FnOnce(Vec<Envelope>) -> R) -> R {
        let receiver = self.receiver.lock();
        let batch: Vec<Envelope> = receiver.try_iter().collect();
        self.pending.fetch_sub(batch.len(), Ordering::AcqRel);
        deliver(batch)
    }
}
