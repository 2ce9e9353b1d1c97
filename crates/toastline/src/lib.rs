#![forbid(unsafe_code)]

//! Toastline public facade crate.
//!
//! Re-exports the overlay surface from `toastline-core` and the animation
//! primitives from `toastline-anim`, plus a prelude for day-to-day usage.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use toastline::prelude::*;
//!
//! struct Log(Vec<String>);
//!
//! impl Renderer for Log {
//!     fn draw_notification(&mut self, view: &NotificationView<'_>) {
//!         self.0.push(view.text.to_owned());
//!     }
//!
//!     fn draw_achievement(&mut self, view: &AchievementView<'_>) {
//!         self.0.push(view.title.to_owned());
//!     }
//! }
//!
//! let mut overlay = Overlay::new(
//!     OverlayConfig::default(),
//!     Arc::new(MonospaceMetrics::default()),
//!     Arc::new(NoTextures),
//! );
//! overlay
//!     .handle()
//!     .push_notification(None, "Saved state", Duration::from_secs(2), 0, false);
//!
//! overlay.tick_logic_elapsed(Duration::from_millis(16));
//! let mut log = Log(Vec::new());
//! overlay.render_frame(&mut log);
//! assert_eq!(log.0, ["Saved state"]);
//! ```

// --- Overlay re-exports ----------------------------------------------------

pub use toastline_core::{
    Overlay, OverlayConfig, OverlayError, OverlayHandle, Result, StackMetrics,
};

// --- Notification re-exports -----------------------------------------------

pub use toastline_core::{
    IntakeStats, Notification, NotificationFlags, NotificationKey, Phase, Progress, TaskHandle,
    TaskId, TaskSnapshot,
};

// --- Achievement re-exports ------------------------------------------------

pub use toastline_core::{
    ACHIEVEMENT_HEADER, AchievementRing, NoTextures, PopupStage, TextureHandle, TextureService,
};

// --- Render re-exports -----------------------------------------------------

pub use toastline_core::{
    AchievementView, MonospaceMetrics, NotificationBody, NotificationView, ProgressBar, Renderer,
    TaskIcon, TaskLabel, TaskTint, TaskView, TextMetrics,
};

// --- Animation re-exports --------------------------------------------------

pub use toastline_anim::{Clock, Easing, ManualClock, SystemClock};

// --- Prelude ---------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AchievementView, MonospaceMetrics, NoTextures, NotificationView, Overlay, OverlayConfig,
        OverlayError, OverlayHandle, Progress, Renderer, Result, TaskHandle, TextMetrics,
        TextureService,
    };

    pub use crate::{anim, core};
}

pub use toastline_anim as anim;
pub use toastline_core as core;
