#![forbid(unsafe_code)]

//! Overlay configuration.
//!
//! [`OverlayConfig`] fixes capacities and timings at construction.
//! [`StackMetrics`] carries the pixel proportions of the notification stack;
//! the owner computes them from its display layout and may replace them at
//! any time with [`Overlay::set_stack_metrics`](crate::Overlay::set_stack_metrics).

use std::time::Duration;

/// Capacities and timings for the overlay.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OverlayConfig {
    /// Maximum number of notifications on screen at once.
    pub onscreen_max: usize,
    /// Maximum number of notifications waiting for admission.
    pub pending_max: usize,
    /// Number of achievement popups the ring can hold.
    pub achievement_capacity: usize,
    /// Duration of reflow, unfold, kill and popup slide animations.
    pub animation_duration: Duration,
    /// How long a finished task stays on screen before expiring.
    pub task_finished_duration: Duration,
    /// Rest between two hourglass spins.
    pub hourglass_interval: Duration,
    /// Duration of one hourglass spin.
    pub hourglass_duration: Duration,
    /// How long an unfolded achievement popup stays before folding.
    pub achievement_hold: Duration,
    /// Whether notification icons are loaded. Without icons nothing unfolds.
    pub icons_available: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            onscreen_max: 4,
            pending_max: 32,
            achievement_capacity: 8,
            animation_duration: Duration::from_millis(330),
            task_finished_duration: Duration::from_millis(3000),
            hourglass_interval: Duration::from_millis(5000),
            hourglass_duration: Duration::from_millis(1000),
            achievement_hold: Duration::from_millis(4000),
            icons_available: true,
        }
    }
}

impl OverlayConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the on-screen capacity (clamped to at least 1).
    #[must_use]
    pub fn onscreen_max(mut self, max: usize) -> Self {
        self.onscreen_max = max.max(1);
        self
    }

    /// Set the pending capacity (clamped to at least 1).
    #[must_use]
    pub fn pending_max(mut self, max: usize) -> Self {
        self.pending_max = max.max(1);
        self
    }

    /// Set the achievement ring capacity (clamped to at least 1).
    #[must_use]
    pub fn achievement_capacity(mut self, capacity: usize) -> Self {
        self.achievement_capacity = capacity.max(1);
        self
    }

    /// Set the base animation duration.
    #[must_use]
    pub fn animation_duration(mut self, duration: Duration) -> Self {
        self.animation_duration = duration;
        self
    }

    /// Set how long finished tasks linger.
    #[must_use]
    pub fn task_finished_duration(mut self, duration: Duration) -> Self {
        self.task_finished_duration = duration;
        self
    }

    /// Set the hourglass rest interval.
    #[must_use]
    pub fn hourglass_interval(mut self, interval: Duration) -> Self {
        self.hourglass_interval = interval;
        self
    }

    /// Set the hourglass spin duration.
    #[must_use]
    pub fn hourglass_duration(mut self, duration: Duration) -> Self {
        self.hourglass_duration = duration;
        self
    }

    /// Set how long achievement popups hold once unfolded.
    #[must_use]
    pub fn achievement_hold(mut self, hold: Duration) -> Self {
        self.achievement_hold = hold;
        self
    }

    /// Declare whether notification icons are available.
    #[must_use]
    pub fn icons_available(mut self, available: bool) -> Self {
        self.icons_available = available;
        self
    }

    /// Expiration delay for a plain notification asking for `display`.
    #[inline]
    #[must_use]
    pub fn plain_expiration(&self, display: Duration) -> Duration {
        self.animation_duration * 2 + display
    }
}

/// Pixel proportions of the notification stack.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackMetrics {
    /// Height of a plain notification. Task notifications use half.
    pub item_height: f32,
    /// Gap between stacked notifications.
    pub spacing: f32,
    /// Horizontal padding inside a notification.
    pub padding: f32,
    /// Widest text line before a plain notification wraps.
    pub max_text_width: f32,
}

impl StackMetrics {
    /// Derive the stack proportions from a font line height.
    #[must_use]
    pub fn from_line_height(line_height: f32, max_text_width: f32) -> Self {
        let item_height = line_height * 2.5;
        Self {
            item_height,
            spacing: item_height / 3.0,
            padding: line_height,
            max_text_width,
        }
    }

    /// Vertical space one notification claims in the stack.
    #[inline]
    #[must_use]
    pub fn slot_height(&self, task_bound: bool) -> f32 {
        let height = if task_bound {
            self.item_height / 2.0
        } else {
            self.item_height
        };
        height + self.spacing
    }
}

impl Default for StackMetrics {
    fn default() -> Self {
        Self::from_line_height(16.0, 640.0)
    }
}
