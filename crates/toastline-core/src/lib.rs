#![forbid(unsafe_code)]

//! Toastline Core
//!
//! Notification lifecycle and scheduling for overlays drawn on top of a
//! real-time rendered frame: toasts, task-progress banners and achievement
//! popups.
//!
//! # Key Components
//!
//! - [`Overlay`] - Main-thread context, ticked once per frame
//! - [`OverlayHandle`] - Thread-safe producer handle
//! - [`TaskHandle`] - Background task state a banner mirrors
//! - [`Lifecycle`] - Per-notification state machine over the registry
//! - [`AchievementRing`] - Lock-guarded single-slack popup ring
//! - [`Renderer`] - Drawing seam fed with view models each frame
//!
//! # Role in Toastline
//! `toastline-core` decides *when* a notification appears, where it sits in
//! the stack, how it animates and when it is freed. Animation timing comes
//! from `toastline-anim`; drawing, fonts and textures come from the owner
//! through [`Renderer`], [`TextMetrics`] and [`TextureService`].
//!
//! # Threading
//! Producers call [`OverlayHandle`] from any thread. Everything else runs on
//! the thread that owns the [`Overlay`]; no callback ever reaches into the
//! registry from a producer thread.

pub mod achievement;
pub mod config;
pub mod error;
pub mod intake;
pub mod lifecycle;
pub mod metrics;
pub mod notification;
pub mod overlay;
pub mod registry;
pub mod render;
pub mod schedule;
pub mod task;

pub use achievement::{
    ACHIEVEMENT_HEADER, AchievementRing, NoTextures, PopupSequence, PopupSlot, PopupStage,
    TextureHandle, TextureService,
};
pub use config::{OverlayConfig, StackMetrics};
pub use error::{OverlayError, Result};
pub use intake::IntakeStats;
pub use lifecycle::Lifecycle;
pub use metrics::{MonospaceMetrics, TextMetrics};
pub use notification::{Notification, NotificationFlags, Phase};
pub use overlay::{Overlay, OverlayHandle};
pub use registry::{NotificationKey, Registry};
pub use render::{
    AchievementView, NotificationBody, NotificationView, ProgressBar, Renderer, TaskIcon,
    TaskLabel, TaskTint, TaskView,
};
pub use schedule::{Cue, GENERIC_TAG, PopupCue, Scheduler, Subject};
pub use task::{Binding, Progress, TaskHandle, TaskId, TaskSnapshot, WeakTask};
