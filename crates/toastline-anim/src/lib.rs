#![forbid(unsafe_code)]

//! Animation services for the toastline overlay.
//!
//! # Role in toastline
//! `toastline-anim` is the timer/animation collaborator the overlay core
//! schedules against. It knows nothing about notifications: it interpolates
//! opaque subjects, fires one-shot timers, and reports completion as typed
//! cue values.
//!
//! # Primary responsibilities
//! - **Easing**: the curves tweens interpolate with.
//! - **Tweener**: tagged tweens and timers with idempotent bulk cancellation.
//! - **Clock**: wall and manual time sources for frame deltas.

pub mod clock;
pub mod easing;
pub mod tweener;

pub use clock::{Clock, ManualClock, SystemClock};
pub use easing::Easing;
pub use tweener::{Step, Tag, TimerId, TweenSpec, Tweener};
