#![forbid(unsafe_code)]

//! Bounded multi-producer intake queue.
//!
//! Producers on any thread hand finished [`Notification`] values to the
//! overlay; the main thread pulls at most one per logic tick. Built on
//! `std::sync::mpsc::sync_channel`, whose `try_send` never blocks.
//!
//! # Invariants
//!
//! 1. At most `capacity` notifications wait at once; a push into a full
//!    queue is dropped and counted, never blocked on.
//! 2. Entries leave in push order.
//! 3. A flush discards every plain entry pushed before it. Task entries are
//!    never flushed, since their task's binding slot points at them.
//! 4. `pending()` never underflows: it is raised before a send and lowered
//!    only after a successful receive or a failed send.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use crate::error::{OverlayError, Result};
use crate::notification::Notification;

/// Counters describing intake traffic since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    /// Notifications accepted into the queue.
    pub pushed: u64,
    /// Notifications dropped because the queue was full.
    pub dropped: u64,
    /// Plain notifications discarded by a flush.
    pub flushed: u64,
}

struct Entry {
    note: Notification,
    epoch: u64,
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    flush_epoch: AtomicU64,
    pushed: AtomicU64,
    dropped: AtomicU64,
    flushed: AtomicU64,
}

/// Create a queue holding at most `capacity` notifications.
pub(crate) fn channel(capacity: usize) -> (IntakeSender, IntakeReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let counters = Arc::new(Counters::default());
    (
        IntakeSender {
            tx,
            counters: Arc::clone(&counters),
        },
        IntakeReceiver { rx, counters },
    )
}

/// Producer end; cheap to clone across threads.
#[derive(Clone)]
pub(crate) struct IntakeSender {
    tx: SyncSender<Entry>,
    counters: Arc<Counters>,
}

impl IntakeSender {
    /// Enqueue a notification, optionally flushing older plain entries.
    ///
    /// On failure the notification is handed back so the caller can release
    /// whatever it holds.
    pub(crate) fn push(
        &self,
        note: Notification,
        flush: bool,
    ) -> std::result::Result<(), (OverlayError, Notification)> {
        let epoch = if flush {
            self.counters.flush_epoch.fetch_add(1, Ordering::AcqRel) + 1
        } else {
            self.counters.flush_epoch.load(Ordering::Acquire)
        };

        self.counters.pending.fetch_add(1, Ordering::AcqRel);
        match self.tx.try_send(Entry { note, epoch }) {
            Ok(()) => {
                self.counters.pushed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.counters.pending.fetch_sub(1, Ordering::AcqRel);
                let (reason, entry) = match err {
                    TrySendError::Full(entry) => {
                        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                        (OverlayError::QueueFull, entry)
                    }
                    TrySendError::Disconnected(entry) => (OverlayError::Inactive, entry),
                };
                Err((reason, entry.note))
            }
        }
    }

    /// Number of notifications waiting for admission.
    pub(crate) fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::Acquire)
    }

    pub(crate) fn stats(&self) -> IntakeStats {
        IntakeStats {
            pushed: self.counters.pushed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            flushed: self.counters.flushed.load(Ordering::Relaxed),
        }
    }
}

/// Consumer end, owned by the main thread.
pub(crate) struct IntakeReceiver {
    rx: Receiver<Entry>,
    counters: Arc<Counters>,
}

impl IntakeReceiver {
    /// Take the oldest notification that survived any flush.
    pub(crate) fn drain_one(&mut self) -> Option<Notification> {
        loop {
            let entry = self.rx.try_recv().ok()?;
            self.counters.pending.fetch_sub(1, Ordering::AcqRel);
            let current = self.counters.flush_epoch.load(Ordering::Acquire);
            if entry.epoch < current && !entry.note.is_task_bound() {
                self.counters.flushed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(text = %entry.note.text(), "flushed pending notification");
                continue;
            }
            return Some(entry.note);
        }
    }

    /// Take every waiting notification, flushed or not.
    pub(crate) fn drain_all(&mut self, mut release: impl FnMut(Notification)) -> usize {
        let mut count = 0;
        while let Ok(entry) = self.rx.try_recv() {
            self.counters.pending.fetch_sub(1, Ordering::AcqRel);
            release(entry.note);
            count += 1;
        }
        count
    }
}
