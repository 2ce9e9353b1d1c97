#![forbid(unsafe_code)]

//! A single toast or task banner.
//!
//! A [`Notification`] is built on push, travels through the intake queue by
//! value, and is owned by the registry once admitted. Its animated scalars
//! (`offset_y`, `opacity`, `unfold`, `text_blend`, `hourglass_angle`) are
//! written only by the lifecycle when it applies scheduler samples.
//!
//! # Invariants
//!
//! 1. `width` and `text_block_height` are fixed at creation; only a task
//!    retitle recomputes `width`.
//! 2. Once [`NotificationFlags::DYING`] is set no flag other than `DYING`
//!    changes and retitles are ignored.
//! 3. Task notifications are born unfolded; plain ones are born folded
//!    unless icons are unavailable.

use std::time::Duration;

use bitflags::bitflags;
use toastline_anim::TimerId;

use crate::config::StackMetrics;
use crate::metrics::{TextMetrics, wrap_two_lines};
use crate::task::{TaskSnapshot, WeakTask};

bitflags! {
    /// Lifecycle flags of a live notification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NotificationFlags: u8 {
        /// The expiration timer fired; the next scan may kill it.
        const EXPIRED   = 0b0000_0001;
        /// The kill animation runs; the entry is on its way out.
        const DYING     = 0b0000_0010;
        /// The icon reveal finished or was skipped.
        const UNFOLDED  = 0b0000_0100;
        /// The icon reveal animation runs.
        const UNFOLDING = 0b0000_1000;
    }
}

/// Observable lifecycle state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting in the intake queue.
    Pending,
    /// On screen, moving toward its stack position or unfolding.
    Settling,
    /// On screen, at rest, no expiration armed.
    Idle,
    /// On screen, blending to a new task title.
    Updating,
    /// On screen with its expiration timer armed or fired.
    Expiring,
    /// Fading out.
    Dying,
    /// Removed from the registry.
    Freed,
}

/// Mirror of the bound task's fields, refreshed every tick.
#[derive(Debug)]
pub(crate) struct TaskMirror {
    pub(crate) task: WeakTask,
    pub(crate) snapshot: TaskSnapshot,
    pub(crate) seen_revision: u64,
    pub(crate) epoch: u32,
}

impl TaskMirror {
    fn new(task: WeakTask) -> Self {
        let snapshot = task.snapshot().unwrap_or_else(|_| TaskSnapshot::stale());
        Self {
            task,
            seen_revision: snapshot.title_revision,
            snapshot,
            epoch: 1,
        }
    }
}

/// Producer request turned into a notification.
#[derive(Debug)]
pub(crate) struct NotificationInit {
    pub(crate) text: String,
    pub(crate) display_duration: Duration,
    pub(crate) priority: u32,
    pub(crate) task: Option<WeakTask>,
}

/// One queued or on-screen notification.
///
/// Owned by exactly one place at a time: the intake queue, the registry, or
/// the producer a rejected push hands it back to. It cannot be duplicated.
///
/// ```compile_fail
/// fn duplicate<T: Clone>() {}
/// duplicate::<toastline_core::Notification>();
/// ```
#[derive(Debug)]
pub struct Notification {
    pub(crate) text: String,
    pub(crate) pending_text: Option<String>,
    pub(crate) text_blend: f32,
    pub(crate) width: f32,
    pub(crate) text_block_height: f32,
    pub(crate) offset_y: f32,
    pub(crate) opacity: f32,
    pub(crate) unfold: f32,
    pub(crate) hourglass_angle: f32,
    pub(crate) display_duration: Duration,
    pub(crate) priority: u32,
    pub(crate) flags: NotificationFlags,
    pub(crate) expiration: Option<TimerId>,
    pub(crate) task: Option<TaskMirror>,
}

impl Notification {
    pub(crate) fn new(
        init: NotificationInit,
        metrics: &dyn TextMetrics,
        stack: &StackMetrics,
        icons_available: bool,
    ) -> Self {
        let NotificationInit {
            text,
            display_duration,
            priority,
            task,
        } = init;

        let mut note = Self {
            text: String::new(),
            pending_text: None,
            text_blend: 0.0,
            width: 0.0,
            text_block_height: metrics.line_height(),
            offset_y: 0.0,
            opacity: 1.0,
            unfold: 0.0,
            hourglass_angle: 0.0,
            display_duration,
            priority,
            flags: NotificationFlags::empty(),
            expiration: None,
            task: None,
        };

        match task {
            Some(task) => {
                let text = task.title().unwrap_or(text);
                note.width = metrics.text_width(&text) + stack.padding / 2.0;
                note.text = text;
                note.task = Some(TaskMirror::new(task));
                note.unfold = 1.0;
                note.flags.insert(NotificationFlags::UNFOLDED);
            }
            None => {
                let (text, width, lines) = layout_plain(&text, metrics, stack);
                note.text = text;
                note.width = width;
                note.text_block_height *= lines as f32;
                if !icons_available {
                    note.unfold = 1.0;
                    note.flags.insert(NotificationFlags::UNFOLDED);
                }
            }
        }
        note
    }

    /// Displayed text.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replacement text in flight, if a retitle is blending.
    #[inline]
    #[must_use]
    pub fn pending_text(&self) -> Option<&str> {
        self.pending_text.as_deref()
    }

    /// Rect width in pixels.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Height of the text block (one or two lines).
    #[inline]
    #[must_use]
    pub fn text_block_height(&self) -> f32 {
        self.text_block_height
    }

    /// Distance from the bottom of the stack.
    #[inline]
    #[must_use]
    pub fn offset_y(&self) -> f32 {
        self.offset_y
    }

    /// Opacity in `0..=1`.
    #[inline]
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Icon reveal progress in `0..=1`.
    #[inline]
    #[must_use]
    pub fn unfold(&self) -> f32 {
        self.unfold
    }

    /// Vertical blend offset of a retitle in flight.
    #[inline]
    #[must_use]
    pub fn text_blend(&self) -> f32 {
        self.text_blend
    }

    /// Requested display duration.
    #[inline]
    #[must_use]
    pub fn display_duration(&self) -> Duration {
        self.display_duration
    }

    /// Producer priority.
    #[inline]
    #[must_use]
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Lifecycle flags.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> NotificationFlags {
        self.flags
    }

    /// Whether the kill animation runs.
    #[inline]
    #[must_use]
    pub fn is_dying(&self) -> bool {
        self.flags.contains(NotificationFlags::DYING)
    }

    /// Whether the expiration timer fired.
    #[inline]
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.flags.contains(NotificationFlags::EXPIRED)
    }

    /// Whether the icon reveal completed or was skipped.
    #[inline]
    #[must_use]
    pub fn is_unfolded(&self) -> bool {
        self.flags.contains(NotificationFlags::UNFOLDED)
    }

    /// Whether an expiration timer is armed.
    #[inline]
    #[must_use]
    pub fn is_expiration_armed(&self) -> bool {
        self.expiration.is_some()
    }

    /// Whether the notification tracks a task.
    #[inline]
    #[must_use]
    pub fn is_task_bound(&self) -> bool {
        self.task.is_some()
    }

    /// Last mirrored task state.
    #[must_use]
    pub fn task_snapshot(&self) -> Option<TaskSnapshot> {
        self.task.as_ref().map(|m| m.snapshot)
    }

    /// Number of titles this notification has shown for its task.
    #[must_use]
    pub fn task_epoch(&self) -> Option<u32> {
        self.task.as_ref().map(|m| m.epoch)
    }

    /// Hourglass rotation in radians.
    #[inline]
    #[must_use]
    pub fn hourglass_angle(&self) -> f32 {
        self.hourglass_angle
    }
}

/// Lay out plain text: returns the (possibly wrapped) text, rect width and
/// line count.
///
/// Text wider than `max_text_width` wraps onto two lines. The rect shrinks to
/// three quarters of the text width when that still exceeds the maximum, so
/// the second line is never a stub.
pub(crate) fn layout_plain(
    text: &str,
    metrics: &dyn TextMetrics,
    stack: &StackMetrics,
) -> (String, f32, u32) {
    let text_width = metrics.text_width(text);
    let mut width = stack.max_text_width;
    let (text, lines) = if text_width > width {
        if text_width * 0.75 < width {
            width = text_width * 0.75;
        }
        let len = unicode_segmentation::UnicodeSegmentation::graphemes(text, true).count();
        let column = ((len as f32 * width) / text_width) as usize;
        (wrap_two_lines(text, column), 2)
    } else {
        width = text_width;
        (text.to_owned(), 1)
    };
    (text, width + stack.padding / 2.0, lines)
}
