#![forbid(unsafe_code)]

//! Render-pass view models.
//!
//! The overlay does not draw. Once per frame it hands the owner's
//! [`Renderer`] one [`NotificationView`] per live entry, top of the stack
//! first, and at most one [`AchievementView`]. Views borrow from the overlay
//! and are only valid for the duration of the call.

use std::fmt;

use crate::achievement::{PopupSequence, PopupStage, TextureHandle};
use crate::lifecycle::Lifecycle;
use crate::notification::Notification;
use crate::registry::NotificationKey;
use crate::task::{Progress, TaskSnapshot};

/// Drawing backend supplied by the owner.
pub trait Renderer {
    /// Draw one notification.
    fn draw_notification(&mut self, view: &NotificationView<'_>);

    /// Draw the achievement popup.
    fn draw_achievement(&mut self, view: &AchievementView<'_>);
}

/// Text shown at the end of a task banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskLabel {
    /// Finished with an error.
    Failed,
    /// Finished cleanly; the label area stays blank.
    Blank,
    /// Running with known progress.
    Percent(u8),
    /// Running without a progress estimate.
    Unknown,
}

impl TaskLabel {
    fn from_snapshot(snapshot: &TaskSnapshot) -> Self {
        if snapshot.finished {
            if snapshot.error_present {
                Self::Failed
            } else {
                Self::Blank
            }
        } else {
            match snapshot.progress {
                Progress::Percent(p) => Self::Percent(p),
                Progress::Unknown => Self::Unknown,
            }
        }
    }
}

impl fmt::Display for TaskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => f.write_str("Task failed"),
            Self::Blank => f.write_str(" "),
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Unknown => Ok(()),
        }
    }
}

/// Icon drawn at the start of a task banner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskIcon {
    /// Still running; rotated by `angle` radians.
    Hourglass {
        /// Current rotation.
        angle: f32,
    },
    /// Finished.
    Check,
}

/// Palette slot for task banner quads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTint {
    /// Plain notification background.
    Background,
    /// First progress color.
    Progress1,
    /// Second progress color, used once a banner was reused.
    Progress2,
}

/// Progress bar of a running task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBar {
    /// Filled fraction in `0..=1`.
    pub fraction: f32,
    /// Fill color.
    pub tint: TaskTint,
}

/// Task-specific part of a notification view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskView {
    /// Trailing label.
    pub label: TaskLabel,
    /// Icon.
    pub icon: TaskIcon,
    /// Background color of the banner.
    pub tint: TaskTint,
    /// Progress bar, only while running with known progress.
    pub bar: Option<ProgressBar>,
}

impl TaskView {
    /// Derive the task view from mirrored task state.
    ///
    /// `epoch` counts the titles the banner has shown; reused banners switch
    /// palette so consecutive tasks stay distinguishable.
    #[must_use]
    pub fn new(snapshot: &TaskSnapshot, epoch: u32, hourglass_angle: f32) -> Self {
        let first = epoch <= 1;
        let tint = match (snapshot.finished, first) {
            (true, true) => TaskTint::Progress1,
            (true, false) => TaskTint::Progress2,
            (false, true) => TaskTint::Background,
            (false, false) => TaskTint::Progress1,
        };
        let bar = match (snapshot.finished, snapshot.progress.fraction()) {
            (false, Some(fraction)) => Some(ProgressBar {
                fraction,
                tint: if first {
                    TaskTint::Progress1
                } else {
                    TaskTint::Progress2
                },
            }),
            _ => None,
        };
        let icon = if snapshot.finished {
            TaskIcon::Check
        } else {
            TaskIcon::Hourglass {
                angle: hourglass_angle,
            }
        };
        Self {
            label: TaskLabel::from_snapshot(snapshot),
            icon,
            tint,
            bar,
        }
    }
}

/// Kind-specific presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotificationBody {
    /// Plain toast.
    Plain,
    /// Task banner.
    Task(TaskView),
}

/// Everything a renderer needs to draw one notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotificationView<'a> {
    /// Registry key.
    pub key: NotificationKey,
    /// Displayed text.
    pub text: &'a str,
    /// Text blending in during a retitle.
    pub incoming_text: Option<&'a str>,
    /// Vertical blend offset of the retitle.
    pub text_blend: f32,
    /// Rect width.
    pub width: f32,
    /// Text block height.
    pub text_block_height: f32,
    /// Distance from the bottom of the stack.
    pub offset_y: f32,
    /// Opacity.
    pub opacity: f32,
    /// Icon reveal progress.
    pub unfold: f32,
    /// Producer priority.
    pub priority: u32,
    /// Kind-specific presentation.
    pub body: NotificationBody,
}

impl<'a> NotificationView<'a> {
    /// Build the view of a live notification.
    #[must_use]
    pub fn new(key: NotificationKey, note: &'a Notification) -> Self {
        let body = match (note.task_snapshot(), note.task_epoch()) {
            (Some(snapshot), Some(epoch)) => {
                NotificationBody::Task(TaskView::new(&snapshot, epoch, note.hourglass_angle()))
            }
            _ => NotificationBody::Plain,
        };
        Self {
            key,
            text: note.text(),
            incoming_text: note.pending_text(),
            text_blend: note.text_blend(),
            width: note.width(),
            text_block_height: note.text_block_height(),
            offset_y: note.offset_y(),
            opacity: note.opacity(),
            unfold: note.unfold(),
            priority: note.priority(),
            body,
        }
    }
}

/// Everything a renderer needs to draw the achievement popup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AchievementView<'a> {
    /// Header line.
    pub header: &'a str,
    /// Achievement title.
    pub title: &'a str,
    /// Badge texture, if loaded.
    pub badge: Option<TextureHandle>,
    /// Vertical offset; `-height` is off-screen.
    pub y: f32,
    /// Reveal fraction.
    pub unfold: f32,
    /// Popup width.
    pub width: f32,
    /// Popup height.
    pub height: f32,
}

/// Draw every live notification, then the popup if one shows.
pub(crate) fn render(lifecycle: &Lifecycle, popup: &PopupSequence, renderer: &mut dyn Renderer) {
    for (key, note) in lifecycle.registry().iter() {
        renderer.draw_notification(&NotificationView::new(key, note));
    }
    if popup.stage() == PopupStage::Hidden {
        return;
    }
    if let Some(slot) = popup.shown() {
        renderer.draw_achievement(&AchievementView {
            header: crate::achievement::ACHIEVEMENT_HEADER,
            title: &slot.title,
            badge: slot.badge,
            y: popup.y(),
            unfold: popup.unfold(),
            width: popup.width(),
            height: popup.height(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(progress: Progress, finished: bool, error_present: bool) -> TaskSnapshot {
        TaskSnapshot {
            progress,
            finished,
            cancelled: false,
            error_present,
            alternative_look: false,
            title_revision: 0,
        }
    }

    #[test]
    fn label_text() {
        assert_eq!(TaskLabel::Failed.to_string(), "Task failed");
        assert_eq!(TaskLabel::Blank.to_string(), " ");
        assert_eq!(TaskLabel::Percent(42).to_string(), "42%");
        assert_eq!(TaskLabel::Unknown.to_string(), "");
    }

    #[test]
    fn running_task_shows_percent_and_bar() {
        let view = TaskView::new(&snapshot(Progress::Percent(50), false, false), 1, -1.0);
        assert_eq!(view.label, TaskLabel::Percent(50));
        assert_eq!(view.icon, TaskIcon::Hourglass { angle: -1.0 });
        assert_eq!(view.tint, TaskTint::Background);
        assert_eq!(
            view.bar,
            Some(ProgressBar {
                fraction: 0.5,
                tint: TaskTint::Progress1
            })
        );
    }

    #[test]
    fn finished_task_drops_progress() {
        let view = TaskView::new(&snapshot(Progress::Percent(50), true, false), 1, -1.0);
        assert_eq!(view.label, TaskLabel::Blank);
        assert_eq!(view.icon, TaskIcon::Check);
        assert_eq!(view.tint, TaskTint::Progress1);
        assert_eq!(view.bar, None);
    }

    #[test]
    fn failed_task_reads_task_failed() {
        let view = TaskView::new(&snapshot(Progress::Percent(50), true, true), 1, 0.0);
        assert_eq!(view.label.to_string(), "Task failed");
    }

    #[test]
    fn reused_banner_switches_palette() {
        let running = TaskView::new(&snapshot(Progress::Percent(10), false, false), 2, 0.0);
        assert_eq!(running.tint, TaskTint::Progress1);
        assert_eq!(running.bar.map(|b| b.tint), Some(TaskTint::Progress2));
        let done = TaskView::new(&snapshot(Progress::Unknown, true, false), 3, 0.0);
        assert_eq!(done.tint, TaskTint::Progress2);
    }

    #[test]
    fn unknown_progress_has_no_bar() {
        let view = TaskView::new(&snapshot(Progress::Unknown, false, false), 1, 0.0);
        assert_eq!(view.label, TaskLabel::Unknown);
        assert_eq!(view.bar, None);
    }
}
