#![forbid(unsafe_code)]

//! Tagged tween and timer scheduler.
//!
//! A [`Tweener`] interpolates numeric subjects toward targets and fires
//! one-shot timers. Completion is reported as a typed cue value `C` rather
//! than a closure, so callers can route every completion through a single
//! `match` and unit-test their chains without a renderer.
//!
//! Subjects are identifiers (`S`), not references: the tweener produces
//! `(subject, value)` samples on every [`advance`](Tweener::advance) and the
//! owner writes them back into its own fields.
//!
//! # Invariants
//!
//! 1. A subject is driven by at most one tween. Pushing a tween for a
//!    subject that is already animating replaces the old tween; the old
//!    tween's cue never fires.
//! 2. A completed tween or fired timer is removed before its cue is handed
//!    out, so no cue can fire twice.
//! 3. Within one `advance`, samples precede cues, tween cues precede timer
//!    cues, and each group keeps scheduling order.
//! 4. `cancel_all(tag)` removes every tween and timer carrying `tag` and is
//!    idempotent.
//!
//! # Failure Modes
//!
//! - Zero duration: clamped to 1ns, completes on the next non-zero advance.
//! - Cancelling an unknown timer or an unused tag is a no-op.

use std::fmt;
use std::time::Duration;

use crate::easing::Easing;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Opaque identity used to bulk-cancel related tweens and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u64);

impl Tag {
    /// Create a tag from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw tag value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Handle to a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw timer value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Tween description
// ---------------------------------------------------------------------------

/// Description of a tween, built fluently and handed to [`Tweener::push`].
#[derive(Debug, Clone)]
pub struct TweenSpec<S, C> {
    subject: S,
    from: f32,
    to: f32,
    duration: Duration,
    easing: Easing,
    tag: Tag,
    delay: Duration,
    on_complete: Option<C>,
}

impl<S, C> TweenSpec<S, C> {
    /// Tween `subject` from `from` to `to` over `duration`.
    #[must_use]
    pub fn new(subject: S, from: f32, to: f32, duration: Duration) -> Self {
        Self {
            subject,
            from,
            to,
            duration: if duration.is_zero() {
                Duration::from_nanos(1)
            } else {
                duration
            },
            easing: Easing::default(),
            tag: Tag::new(0),
            delay: Duration::ZERO,
            on_complete: None,
        }
    }

    /// Set the easing curve.
    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Set the cancellation tag.
    #[must_use]
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    /// Hold the subject for `delay` before interpolation starts.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cue to fire when the tween reaches its target.
    #[must_use]
    pub fn on_complete(mut self, cue: C) -> Self {
        self.on_complete = Some(cue);
        self
    }

    /// Target value.
    #[inline]
    #[must_use]
    pub fn target(&self) -> f32 {
        self.to
    }
}

struct Tween<S, C> {
    spec: TweenSpec<S, C>,
    elapsed: Duration,
}

struct Timer<C> {
    id: TimerId,
    tag: Tag,
    remaining: Duration,
    cue: C,
}

// ---------------------------------------------------------------------------
// Step output
// ---------------------------------------------------------------------------

/// Reusable output buffer for [`Tweener::advance`].
///
/// Keep one `Step` alive across frames; its buffers retain their capacity so
/// steady-state frames do not allocate.
pub struct Step<S, C> {
    samples: Vec<(S, f32)>,
    fired: Vec<C>,
}

impl<S, C> Step<S, C> {
    /// Create an empty step buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            fired: Vec::new(),
        }
    }

    /// Subject values produced by the last advance, in scheduling order.
    #[inline]
    #[must_use]
    pub fn samples(&self) -> &[(S, f32)] {
        &self.samples
    }

    /// Number of cues waiting to be drained.
    #[inline]
    #[must_use]
    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }

    /// Take the cues fired by the last advance.
    pub fn drain_fired(&mut self) -> std::vec::Drain<'_, C> {
        self.fired.drain(..)
    }

    /// Forget all samples and cues, keeping capacity.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.fired.clear();
    }
}

impl<S, C> Default for Step<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: fmt::Debug, C: fmt::Debug> fmt::Debug for Step<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("samples", &self.samples)
            .field("fired", &self.fired)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Tween and timer scheduler keyed by subject `S`, reporting cues `C`.
pub struct Tweener<S, C> {
    tweens: Vec<Tween<S, C>>,
    timers: Vec<Timer<C>>,
    next_timer: u64,
}

impl<S, C> fmt::Debug for Tweener<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tweener")
            .field("tweens", &self.tweens.len())
            .field("timers", &self.timers.len())
            .finish()
    }
}

impl<S, C> Default for Tweener<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> Tweener<S, C> {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tweens: Vec::new(),
            timers: Vec::new(),
            next_timer: 1,
        }
    }

    /// Schedule a one-shot timer that fires `cue` after `duration`.
    pub fn start_timer(&mut self, duration: Duration, tag: Tag, cue: C) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer = self.next_timer.wrapping_add(1);
        self.timers.push(Timer {
            id,
            tag,
            remaining: duration,
            cue,
        });
        id
    }

    /// Cancel one timer. Returns `false` if it already fired or never existed.
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        match self.timers.iter().position(|t| t.id == id) {
            Some(pos) => {
                self.timers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Time left before a timer fires.
    #[must_use]
    pub fn timer_remaining(&self, id: TimerId) -> Option<Duration> {
        self.timers.iter().find(|t| t.id == id).map(|t| t.remaining)
    }

    /// Cancel every tween and timer carrying `tag`. Returns how many were removed.
    pub fn cancel_all(&mut self, tag: Tag) -> usize {
        let before = self.tweens.len() + self.timers.len();
        self.tweens.retain(|t| t.spec.tag != tag);
        self.timers.retain(|t| t.tag != tag);
        let removed = before - (self.tweens.len() + self.timers.len());
        if removed > 0 {
            tracing::trace!(tag = tag.get(), removed, "cancelled tagged animations");
        }
        removed
    }

    /// Whether anything tagged `tag` is still scheduled.
    #[must_use]
    pub fn is_tag_active(&self, tag: Tag) -> bool {
        self.tweens.iter().any(|t| t.spec.tag == tag) || self.timers.iter().any(|t| t.tag == tag)
    }

    /// Number of running tweens.
    #[inline]
    #[must_use]
    pub fn tween_count(&self) -> usize {
        self.tweens.len()
    }

    /// Number of pending timers.
    #[inline]
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Number of running tweens and pending timers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tweens.len() + self.timers.len()
    }

    /// Whether nothing is scheduled.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty() && self.timers.is_empty()
    }

    /// Drop everything without firing any cue.
    pub fn clear(&mut self) {
        self.tweens.clear();
        self.timers.clear();
    }
}

impl<S: PartialEq + Clone, C> Tweener<S, C> {
    /// Start a tween, replacing any tween already driving the same subject.
    pub fn push(&mut self, spec: TweenSpec<S, C>) {
        if let Some(pos) = self.tweens.iter().position(|t| t.spec.subject == spec.subject) {
            self.tweens.remove(pos);
        }
        self.tweens.push(Tween {
            spec,
            elapsed: Duration::ZERO,
        });
    }

    /// Whether a tween currently drives `subject`.
    #[must_use]
    pub fn is_subject_active(&self, subject: &S) -> bool {
        self.tweens.iter().any(|t| t.spec.subject == *subject)
    }

    /// Target of the tween currently driving `subject`.
    #[must_use]
    pub fn target_of(&self, subject: &S) -> Option<f32> {
        self.tweens
            .iter()
            .find(|t| t.spec.subject == *subject)
            .map(|t| t.spec.to)
    }

    /// Advance every tween and timer by `dt`, writing results into `step`.
    ///
    /// `step` is cleared first. Delayed tweens produce no sample until their
    /// delay has elapsed.
    pub fn advance(&mut self, dt: Duration, step: &mut Step<S, C>) {
        step.clear();

        let mut i = 0;
        while i < self.tweens.len() {
            let tween = &mut self.tweens[i];
            tween.elapsed = tween.elapsed.saturating_add(dt);
            if tween.elapsed < tween.spec.delay {
                i += 1;
                continue;
            }
            let active = tween.elapsed - tween.spec.delay;
            let t = (active.as_secs_f64() / tween.spec.duration.as_secs_f64()).min(1.0) as f32;
            let spec = &tween.spec;
            if t >= 1.0 {
                step.samples.push((spec.subject.clone(), spec.to));
                let done = self.tweens.remove(i);
                if let Some(cue) = done.spec.on_complete {
                    step.fired.push(cue);
                }
            } else {
                let value = spec.easing.lerp(spec.from, spec.to, t);
                step.samples.push((spec.subject.clone(), value));
                i += 1;
            }
        }

        let mut i = 0;
        while i < self.timers.len() {
            let timer = &mut self.timers[i];
            timer.remaining = timer.remaining.saturating_sub(dt);
            if timer.remaining.is_zero() {
                let done = self.timers.remove(i);
                step.fired.push(done.cue);
            } else {
                i += 1;
            }
        }
    }
}
