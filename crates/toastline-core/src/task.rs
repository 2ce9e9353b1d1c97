#![forbid(unsafe_code)]

//! Background task state shared with the overlay.
//!
//! A [`TaskHandle`] is owned by the producer running the work. The overlay
//! only ever holds a [`WeakTask`], so dropping the last handle tears the task
//! down without coordinating with the render thread.
//!
//! Each task carries a binding slot naming the notification currently
//! displaying it. The slot is the deduplication point: a push for a task
//! whose slot is already occupied only updates the task, it never enqueues a
//! second notification.
//!
//! # Invariants
//!
//! 1. A task is bound to at most one notification. The slot moves
//!    `None → Pending → Live(key)` and back to `None` when the notification is
//!    freed or its push was dropped.
//! 2. Clearing the slot on free only happens when it still names the freed
//!    key; a newer binding is never clobbered.
//! 3. Title changes are detected by content: setting an identical title does
//!    not bump the revision.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::{OverlayError, Result};
use crate::registry::NotificationKey;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw identifier.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Reported task progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progress {
    /// The task cannot estimate how far along it is.
    #[default]
    Unknown,
    /// Percentage complete, `0..=100`.
    Percent(u8),
}

impl Progress {
    /// Known progress, clamped to 100.
    #[must_use]
    pub fn percent(value: u8) -> Self {
        Self::Percent(value.min(100))
    }

    /// Fraction complete, if known.
    #[must_use]
    pub fn fraction(self) -> Option<f32> {
        match self {
            Self::Unknown => None,
            Self::Percent(p) => Some(f32::from(p) / 100.0),
        }
    }
}

/// Which notification, if any, displays a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// A notification was pushed and waits in the intake queue.
    Pending,
    /// The notification is on screen under `key`.
    Live(NotificationKey),
}

/// Point-in-time copy of the fields the overlay mirrors every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Last reported progress.
    pub progress: Progress,
    /// The task completed, successfully or not.
    pub finished: bool,
    /// The task was cancelled.
    pub cancelled: bool,
    /// The task reported an error.
    pub error_present: bool,
    /// Retitles swap text immediately instead of blending.
    pub alternative_look: bool,
    /// Bumped on every title change.
    pub title_revision: u64,
}

impl TaskSnapshot {
    /// Snapshot used when the task is gone: finished, nothing else known.
    #[must_use]
    pub const fn stale() -> Self {
        Self {
            progress: Progress::Unknown,
            finished: true,
            cancelled: false,
            error_present: false,
            alternative_look: false,
            title_revision: 0,
        }
    }

    /// Whether the task reached a terminal state.
    #[inline]
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.finished || self.cancelled
    }
}

#[derive(Debug)]
struct TaskState {
    title: String,
    title_revision: u64,
    progress: Progress,
    finished: bool,
    cancelled: bool,
    error: Option<String>,
    alternative_look: bool,
    binding: Option<Binding>,
}

#[derive(Debug)]
struct TaskShared {
    id: TaskId,
    state: Mutex<TaskState>,
}

impl TaskShared {
    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self) -> TaskSnapshot {
        let state = self.lock();
        TaskSnapshot {
            progress: state.progress,
            finished: state.finished,
            cancelled: state.cancelled,
            error_present: state.error.is_some(),
            alternative_look: state.alternative_look,
            title_revision: state.title_revision,
        }
    }
}

// ---------------------------------------------------------------------------
// Producer handle
// ---------------------------------------------------------------------------

/// Producer-side handle to a background task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    /// Create a running task.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(TaskShared {
                id: TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)),
                state: Mutex::new(TaskState {
                    title: title.into(),
                    title_revision: 0,
                    progress: Progress::Unknown,
                    finished: false,
                    cancelled: false,
                    error: None,
                    alternative_look: false,
                    binding: None,
                }),
            }),
        }
    }

    /// Task identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Current title.
    #[must_use]
    pub fn title(&self) -> String {
        self.shared.lock().title.clone()
    }

    /// Replace the title. Returns `true` if the content changed.
    pub fn set_title(&self, title: &str) -> bool {
        let mut state = self.shared.lock();
        if state.title == title {
            return false;
        }
        state.title.clear();
        state.title.push_str(title);
        state.title_revision = state.title_revision.wrapping_add(1);
        true
    }

    /// Current progress.
    #[must_use]
    pub fn progress(&self) -> Progress {
        self.shared.lock().progress
    }

    /// Report progress.
    pub fn set_progress(&self, progress: Progress) {
        let progress = match progress {
            Progress::Percent(p) => Progress::percent(p),
            Progress::Unknown => Progress::Unknown,
        };
        self.shared.lock().progress = progress;
    }

    /// Mark the task finished.
    pub fn finish(&self) {
        self.shared.lock().finished = true;
    }

    /// Mark the task cancelled.
    pub fn cancel(&self) {
        self.shared.lock().cancelled = true;
    }

    /// Record an error and mark the task finished.
    pub fn fail(&self, error: impl Into<String>) {
        let mut state = self.shared.lock();
        state.error = Some(error.into());
        state.finished = true;
    }

    /// Run the task again: clears the terminal flags, error and progress.
    ///
    /// A notification still displaying the task stops expiring.
    pub fn restart(&self) {
        let mut state = self.shared.lock();
        state.finished = false;
        state.cancelled = false;
        state.error = None;
        state.progress = Progress::Unknown;
    }

    /// Error message, if the task failed.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.shared.lock().error.clone()
    }

    /// Request immediate text swaps on retitle.
    pub fn set_alternative_look(&self, alternative: bool) {
        self.shared.lock().alternative_look = alternative;
    }

    /// Copy the mirrored fields.
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        self.shared.snapshot()
    }

    /// Notification currently displaying this task.
    #[must_use]
    pub fn binding(&self) -> Option<Binding> {
        self.shared.lock().binding
    }

    /// Claim the binding slot for a new notification.
    ///
    /// Returns `false` when a notification already displays (or is about to
    /// display) this task.
    pub(crate) fn claim_binding(&self) -> bool {
        let mut state = self.shared.lock();
        if state.binding.is_some() {
            return false;
        }
        state.binding = Some(Binding::Pending);
        true
    }

    /// Undo a claim whose notification never reached the intake queue.
    pub(crate) fn release_pending(&self) {
        let mut state = self.shared.lock();
        if state.binding == Some(Binding::Pending) {
            state.binding = None;
        }
    }

    pub(crate) fn downgrade(&self) -> WeakTask {
        WeakTask {
            id: self.shared.id,
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for TaskHandle {}

// ---------------------------------------------------------------------------
// Overlay-side back-reference
// ---------------------------------------------------------------------------

/// Non-owning reference the overlay keeps to a task.
#[derive(Debug, Clone)]
pub struct WeakTask {
    id: TaskId,
    shared: Weak<TaskShared>,
}

impl WeakTask {
    /// Identity of the referenced task, even after it is gone.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Whether the producer still holds the task.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Copy the mirrored fields.
    ///
    /// # Errors
    ///
    /// [`OverlayError::StaleTaskReference`] when the task was dropped.
    pub fn snapshot(&self) -> Result<TaskSnapshot> {
        self.shared
            .upgrade()
            .map(|shared| shared.snapshot())
            .ok_or(OverlayError::StaleTaskReference)
    }

    /// Current title.
    ///
    /// # Errors
    ///
    /// [`OverlayError::StaleTaskReference`] when the task was dropped.
    pub fn title(&self) -> Result<String> {
        let shared = self.shared.upgrade().ok_or(OverlayError::StaleTaskReference)?;
        let title = shared.lock().title.clone();
        Ok(title)
    }

    /// Record that the task's notification is on screen under `key`.
    pub(crate) fn bind_live(&self, key: NotificationKey) {
        if let Some(shared) = self.shared.upgrade() {
            shared.lock().binding = Some(Binding::Live(key));
        }
    }

    /// Drop a pending claim (push discarded before admission).
    pub(crate) fn release_pending(&self) {
        if let Some(shared) = self.shared.upgrade() {
            let mut state = shared.lock();
            if state.binding == Some(Binding::Pending) {
                state.binding = None;
            }
        }
    }

    /// Clear the binding if it still names `key`.
    pub(crate) fn release_if(&self, key: NotificationKey) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut state = shared.lock();
        if state.binding == Some(Binding::Live(key)) {
            state.binding = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn key() -> NotificationKey {
        let mut reg = Registry::with_capacity(1);
        reg.insert((), true).unwrap().0
    }

    #[test]
    fn ids_are_unique() {
        let a = TaskHandle::new("a");
        let b = TaskHandle::new("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone(), a);
        assert_ne!(a, b);
    }

    #[test]
    fn title_revision_tracks_content() {
        let task = TaskHandle::new("Loading");
        let rev = task.snapshot().title_revision;
        assert!(!task.set_title("Loading"));
        assert_eq!(task.snapshot().title_revision, rev);
        assert!(task.set_title("Loaded"));
        assert_eq!(task.snapshot().title_revision, rev + 1);
        assert_eq!(task.title(), "Loaded");
    }

    #[test]
    fn progress_is_clamped() {
        let task = TaskHandle::new("t");
        task.set_progress(Progress::Percent(250));
        assert_eq!(task.progress(), Progress::Percent(100));
        assert_eq!(Progress::percent(50).fraction(), Some(0.5));
        assert_eq!(Progress::Unknown.fraction(), None);
    }

    #[test]
    fn fail_marks_finished_with_error() {
        let task = TaskHandle::new("t");
        task.fail("disk full");
        let snap = task.snapshot();
        assert!(snap.finished);
        assert!(snap.error_present);
        assert!(snap.is_done());
        assert_eq!(task.error().as_deref(), Some("disk full"));
    }

    #[test]
    fn binding_claims_once() {
        let task = TaskHandle::new("t");
        assert!(task.claim_binding());
        assert!(!task.claim_binding());
        task.release_pending();
        assert_eq!(task.binding(), None);
        assert!(task.claim_binding());
    }

    #[test]
    fn release_only_clears_matching_key() {
        let task = TaskHandle::new("t");
        let weak = task.downgrade();
        let k = key();
        assert!(task.claim_binding());
        weak.bind_live(k);
        assert_eq!(task.binding(), Some(Binding::Live(k)));

        weak.release_pending();
        assert_eq!(task.binding(), Some(Binding::Live(k)));

        assert!(weak.release_if(k));
        assert!(!weak.release_if(k));
        assert_eq!(task.binding(), None);
    }

    #[test]
    fn dropped_task_is_stale() {
        let task = TaskHandle::new("t");
        let weak = task.downgrade();
        assert!(weak.is_alive());
        drop(task);
        assert!(!weak.is_alive());
        assert_eq!(weak.snapshot(), Err(OverlayError::StaleTaskReference));
        assert_eq!(weak.title(), Err(OverlayError::StaleTaskReference));
        assert!(!weak.release_if(key()));
    }
}
