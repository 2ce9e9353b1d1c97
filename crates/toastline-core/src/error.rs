#![forbid(unsafe_code)]

//! Backpressure outcomes.
//!
//! Nothing in the overlay is fatal. Every variant here describes a request
//! that was dropped, deferred or rejected; callers decide whether to care.

use std::fmt;

/// Why an overlay request did not take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayError {
    /// The overlay is not active; the request was dropped.
    Inactive,
    /// The intake queue is full; the notification was dropped.
    QueueFull,
    /// The on-screen registry is full; admission is deferred to a later tick.
    RegistryFull,
    /// The achievement ring is full; the popup was rejected.
    RingFull,
    /// A task back-reference no longer resolves; treated as a finished task.
    StaleTaskReference,
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "overlay is not active"),
            Self::QueueFull => write!(f, "notification intake queue is full"),
            Self::RegistryFull => write!(f, "on-screen notification registry is full"),
            Self::RingFull => write!(f, "achievement popup ring is full"),
            Self::StaleTaskReference => write!(f, "task reference is stale"),
        }
    }
}

impl std::error::Error for OverlayError {}

/// Result alias for overlay requests.
pub type Result<T> = std::result::Result<T, OverlayError>;
