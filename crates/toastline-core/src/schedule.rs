#![forbid(unsafe_code)]

//! Subjects and cues the overlay schedules on the animation service.
//!
//! Every animated field and every timer completion in the overlay is named
//! here, so a single `match` in the logic tick routes all of them.

use toastline_anim::{Tag, Tweener};

use crate::registry::NotificationKey;

/// Tag shared by everything the overlay schedules that is not tied to one
/// notification (the achievement popup sequence).
pub const GENERIC_TAG: Tag = Tag::new(u64::MAX);

/// Scheduler specialised to overlay subjects and cues.
pub type Scheduler = Tweener<Subject, Cue>;

/// Animated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// Stack offset of a notification.
    Offset(NotificationKey),
    /// Opacity of a notification.
    Opacity(NotificationKey),
    /// Icon reveal of a notification.
    Unfold(NotificationKey),
    /// Retitle blend of a task notification.
    TextBlend(NotificationKey),
    /// Hourglass rotation of a task notification.
    Hourglass(NotificationKey),
    /// Vertical offset of the achievement popup.
    PopupOffset,
    /// Reveal fraction of the achievement popup.
    PopupUnfold,
}

/// Completion reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// The last offset tween of a reflow finished. `unfold` names the
    /// top-most entry still waiting for its reveal.
    ReflowSettled {
        /// Entry to unfold next, if any.
        unfold: Option<NotificationKey>,
    },
    /// An icon reveal finished.
    UnfoldSettled(NotificationKey),
    /// An expiration timer fired.
    Expired(NotificationKey),
    /// A kill fade finished; the entry can be freed.
    KillSettled(NotificationKey),
    /// A retitle blend finished; swap in the pending text.
    TextSwap(NotificationKey),
    /// The hourglass rest elapsed; start a spin.
    HourglassSpin(NotificationKey),
    /// A hourglass spin finished; rest again.
    HourglassRest(NotificationKey),
    /// Achievement popup sequence step.
    Popup(PopupCue),
}

/// Steps of the achievement popup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopupCue {
    /// The popup reached its on-screen position.
    SlidIn,
    /// The hold timer elapsed.
    HoldElapsed,
    /// The popup folded back.
    Folded,
    /// The popup left the screen.
    Dismissed,
}
