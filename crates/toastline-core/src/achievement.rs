#![forbid(unsafe_code)]

//! Achievement popups.
//!
//! Two halves:
//!
//! - [`AchievementRing`]: a fixed-capacity circular buffer shared between
//!   producer threads (unlock computations) and the main thread. Every read
//!   or write of indices and slots happens under one mutex.
//! - [`PopupSequence`]: the main-thread state machine that slides the
//!   current popup in, unfolds it, holds, folds, slides it out and then
//!   advances the ring.
//!
//! # Invariants
//!
//! 1. Single slack: the ring is empty iff `read == write` and the read slot
//!    holds no title; it is full iff `read == write` and the read slot holds
//!    a title. No separate counter exists.
//! 2. Only the slot at `read` is ever displayed, and it is released only
//!    after the sequence has dropped its own copy.
//! 3. Producers never start animations. An enqueue into an empty ring sets a
//!    start request that the next logic tick consumes.
//! 4. The sequence runs one popup at a time; a start while not hidden is
//!    ignored.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use toastline_anim::{Easing, TweenSpec};

use crate::config::OverlayConfig;
use crate::metrics::TextMetrics;
use crate::schedule::{Cue, GENERIC_TAG, PopupCue, Scheduler, Subject};

/// Header shown above every achievement title.
pub const ACHIEVEMENT_HEADER: &str = "Achievement Unlocked";

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

/// Opaque handle to a texture owned by the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u64);

impl TextureHandle {
    /// Wrap a backend texture id.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Backend texture id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Texture loading provided by the render backend.
pub trait TextureService: Send + Sync {
    /// Load the badge image named `badge_id`. `None` when unavailable.
    fn load_badge(&self, badge_id: &str) -> Option<TextureHandle>;

    /// Release a texture returned by [`load_badge`](Self::load_badge).
    fn unload(&self, handle: TextureHandle);
}

/// Texture service for frontends without badge images.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextures;

impl TextureService for NoTextures {
    fn load_badge(&self, _badge_id: &str) -> Option<TextureHandle> {
        None
    }

    fn unload(&self, _handle: TextureHandle) {}
}

// ---------------------------------------------------------------------------
// Ring
// ---------------------------------------------------------------------------

/// One pending or displayed achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupSlot {
    /// Achievement title.
    pub title: Arc<str>,
    /// Badge texture, if one was loaded.
    pub badge: Option<TextureHandle>,
}

#[derive(Debug)]
struct RingState {
    slots: Box<[Option<PopupSlot>]>,
    read: usize,
    write: usize,
    start_requested: bool,
}

impl RingState {
    fn is_empty(&self) -> bool {
        self.read == self.write && self.slots[self.read].is_none()
    }

    fn is_full(&self) -> bool {
        self.read == self.write && self.slots[self.read].is_some()
    }
}

/// Lock-guarded circular buffer of achievement popups.
#[derive(Debug)]
pub struct AchievementRing {
    state: Mutex<RingState>,
}

impl AchievementRing {
    /// Create a ring of `capacity` slots (at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(RingState {
                slots: (0..capacity).map(|_| None).collect(),
                read: 0,
                write: 0,
                start_requested: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    /// Number of popups waiting or showing.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.lock();
        let capacity = state.slots.len();
        if state.read == state.write {
            if state.slots[state.read].is_some() { capacity } else { 0 }
        } else {
            (state.write + capacity - state.read) % capacity
        }
    }

    /// Whether no popup waits or shows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether the next enqueue would be rejected.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    /// Enqueue a popup with an already loaded badge.
    ///
    /// Returns `false` when the ring is full; the badge is then left to the
    /// caller.
    pub fn enqueue(&self, title: &str, badge: Option<TextureHandle>) -> bool {
        self.enqueue_with(title, || badge)
    }

    /// Enqueue a popup, loading its badge only once room is confirmed.
    ///
    /// `load` runs under the ring lock. Returns `false` when the ring is
    /// full, in which case `load` is never called.
    pub fn enqueue_with(&self, title: &str, load: impl FnOnce() -> Option<TextureHandle>) -> bool {
        let mut state = self.lock();
        if state.is_full() {
            tracing::debug!(title, "achievement ring full");
            return false;
        }

        let was_empty = state.is_empty();
        let write = state.write;
        state.slots[write] = Some(PopupSlot {
            title: Arc::from(title),
            badge: load(),
        });
        state.write = (write + 1) % state.slots.len();
        if was_empty {
            state.start_requested = true;
        }
        tracing::debug!(title, slot = write, "achievement queued");
        true
    }

    /// Copy of the slot at the read index.
    #[must_use]
    pub fn current(&self) -> Option<PopupSlot> {
        let state = self.lock();
        state.slots[state.read].clone()
    }

    /// Consume a pending start request.
    pub(crate) fn take_start_request(&self) -> bool {
        std::mem::take(&mut self.lock().start_requested)
    }

    /// Release the read slot and move to the next one.
    ///
    /// Returns whether the new read slot holds a popup.
    pub(crate) fn advance(&self, mut release: impl FnMut(PopupSlot)) -> bool {
        let mut state = self.lock();
        let read = state.read;
        let Some(slot) = state.slots[read].take() else {
            return false;
        };
        release(slot);
        state.read = (read + 1) % state.slots.len();
        let read = state.read;
        state.slots[read].is_some()
    }

    /// Release every slot, leaving the ring empty.
    pub(crate) fn drain(&self, mut release: impl FnMut(PopupSlot)) -> usize {
        let mut state = self.lock();
        let mut count = 0;
        loop {
            let read = state.read;
            let Some(slot) = state.slots[read].take() else {
                break;
            };
            release(slot);
            state.read = (read + 1) % state.slots.len();
            count += 1;
        }
        state.write = state.read;
        state.start_requested = false;
        count
    }
}

// ---------------------------------------------------------------------------
// Display sequence
// ---------------------------------------------------------------------------

/// Stage of the popup display sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupStage {
    /// Nothing shows.
    #[default]
    Hidden,
    /// Sliding down to its resting position.
    SlidingIn,
    /// Unfolded (or unfolding) and waiting for the hold timer.
    Holding,
    /// Folding back.
    Folding,
    /// Sliding off-screen.
    SlidingOut,
}

/// Main-thread driver of the achievement popup.
pub struct PopupSequence {
    stage: PopupStage,
    shown: Option<PopupSlot>,
    y: f32,
    unfold: f32,
    width: f32,
    height: f32,
    padding: f32,
    animation: Duration,
    hold: Duration,
    metrics: Arc<dyn TextMetrics>,
    textures: Arc<dyn TextureService>,
}

impl std::fmt::Debug for PopupSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupSequence")
            .field("stage", &self.stage)
            .field("shown", &self.shown)
            .field("y", &self.y)
            .field("unfold", &self.unfold)
            .finish()
    }
}

impl PopupSequence {
    /// Create a hidden sequence.
    #[must_use]
    pub fn new(
        config: &OverlayConfig,
        padding: f32,
        metrics: Arc<dyn TextMetrics>,
        textures: Arc<dyn TextureService>,
    ) -> Self {
        Self {
            stage: PopupStage::Hidden,
            shown: None,
            y: 0.0,
            unfold: 0.0,
            width: 0.0,
            height: 0.0,
            padding,
            animation: config.animation_duration,
            hold: config.achievement_hold,
            metrics,
            textures,
        }
    }

    /// Current stage.
    #[inline]
    #[must_use]
    pub fn stage(&self) -> PopupStage {
        self.stage
    }

    /// Popup being displayed.
    #[inline]
    #[must_use]
    pub fn shown(&self) -> Option<&PopupSlot> {
        self.shown.as_ref()
    }

    /// Vertical offset; `-height` is fully off-screen, 0 is resting.
    #[inline]
    #[must_use]
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Reveal fraction in `0..=1`.
    #[inline]
    #[must_use]
    pub fn unfold(&self) -> f32 {
        self.unfold
    }

    /// Popup width.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Popup height.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Horizontal padding used for the next popup's width.
    pub fn set_padding(&mut self, padding: f32) {
        self.padding = padding;
    }

    /// Start displaying the ring's current popup.
    ///
    /// Returns `false` if a popup already shows or the ring is empty.
    pub fn start(&mut self, ring: &AchievementRing, sched: &mut Scheduler) -> bool {
        if self.stage != PopupStage::Hidden {
            return false;
        }
        let Some(slot) = ring.current() else {
            return false;
        };

        let header = self.metrics.text_width(ACHIEVEMENT_HEADER);
        let title = self.metrics.text_width(&slot.title);
        self.height = self.metrics.line_height() * 4.0;
        self.width = header.max(title) + self.padding * 2.0;
        self.y = -self.height;
        self.unfold = 0.0;
        self.stage = PopupStage::SlidingIn;
        tracing::debug!(title = %slot.title, "achievement popup started");
        self.shown = Some(slot);

        sched.push(
            TweenSpec::new(Subject::PopupOffset, self.y, 0.0, self.animation)
                .easing(Easing::OutQuad)
                .tag(GENERIC_TAG)
                .on_complete(Cue::Popup(PopupCue::SlidIn)),
        );
        true
    }

    /// Write a scheduler sample into the popup geometry.
    pub fn apply_sample(&mut self, subject: Subject, value: f32) {
        match subject {
            Subject::PopupOffset => self.y = value,
            Subject::PopupUnfold => self.unfold = value,
            _ => {}
        }
    }

    /// Advance the sequence on a popup cue.
    pub fn on_cue(&mut self, cue: PopupCue, ring: &AchievementRing, sched: &mut Scheduler) {
        tracing::trace!(?cue, stage = ?self.stage, "popup cue");
        match (self.stage, cue) {
            (PopupStage::SlidingIn, PopupCue::SlidIn) => {
                self.stage = PopupStage::Holding;
                sched.push(
                    TweenSpec::new(Subject::PopupUnfold, self.unfold, 1.0, self.animation)
                        .easing(Easing::OutQuad)
                        .tag(GENERIC_TAG),
                );
                sched.start_timer(
                    self.animation + self.hold,
                    GENERIC_TAG,
                    Cue::Popup(PopupCue::HoldElapsed),
                );
            }
            (PopupStage::Holding, PopupCue::HoldElapsed) => {
                self.stage = PopupStage::Folding;
                sched.push(
                    TweenSpec::new(Subject::PopupUnfold, self.unfold, 0.0, self.animation)
                        .easing(Easing::OutQuad)
                        .tag(GENERIC_TAG)
                        .on_complete(Cue::Popup(PopupCue::Folded)),
                );
            }
            (PopupStage::Folding, PopupCue::Folded) => {
                self.stage = PopupStage::SlidingOut;
                sched.push(
                    TweenSpec::new(Subject::PopupOffset, self.y, -self.height, self.animation)
                        .easing(Easing::OutQuad)
                        .tag(GENERIC_TAG)
                        .on_complete(Cue::Popup(PopupCue::Dismissed)),
                );
            }
            (PopupStage::SlidingOut, PopupCue::Dismissed) => {
                self.stage = PopupStage::Hidden;
                self.shown = None;
                let textures = Arc::clone(&self.textures);
                let more = ring.advance(|slot| {
                    if let Some(badge) = slot.badge {
                        textures.unload(badge);
                    }
                });
                if more {
                    self.start(ring, sched);
                }
            }
            (stage, cue) => {
                tracing::trace!(?stage, ?cue, "stale popup cue ignored");
            }
        }
    }

    /// Hide immediately and release every ring slot.
    ///
    /// The caller cancels [`GENERIC_TAG`] first.
    pub fn teardown(&mut self, ring: &AchievementRing) -> usize {
        self.stage = PopupStage::Hidden;
        self.shown = None;
        self.unfold = 0.0;
        let textures = Arc::clone(&self.textures);
        ring.drain(|slot| {
            if let Some(badge) = slot.badge {
                textures.unload(badge);
            }
        })
    }
}
