#![forbid(unsafe_code)]

//! Notification lifecycle state machine.
//!
//! [`Lifecycle`] owns the on-screen registry and drives every entry through
//! admission, reflow, unfold, task updates, expiration, kill and free. It
//! never reads a clock: all time flows through the scheduler, and every
//! transition is triggered either by a logic-tick call or by a [`Cue`].
//!
//! # Invariants
//!
//! 1. While `moving` is set no entry is admitted and no expired entry is
//!    killed. A reflow clears it when its last tween settles (or when the
//!    unfold it starts settles); a free clears it unconditionally.
//! 2. At most one live entry is folded at a time. Admission waits for the
//!    previous reveal to finish, and a reflow unfolds only the top-most
//!    folded entry.
//! 3. Entering `Dying` cancels everything tagged with the entry's key before
//!    the kill tweens are pushed. A second kill of the same key is a no-op.
//! 4. At most one entry dies per scan.
//! 5. Freeing releases the task binding only while it still names the freed
//!    key.
//!
//! # Failure Modes
//!
//! - Cues naming a freed key are ignored (generation mismatch).
//! - A task dropped by its producer reads as finished.

use std::f32::consts::TAU;
use std::sync::Arc;

use toastline_anim::{Easing, TweenSpec};

use crate::config::{OverlayConfig, StackMetrics};
use crate::error::OverlayError;
use crate::metrics::TextMetrics;
use crate::notification::{Notification, NotificationFlags, Phase};
use crate::registry::{NotificationKey, Registry};
use crate::schedule::{Cue, Scheduler, Subject};
use crate::task::TaskSnapshot;

/// Registry plus the transition logic for its entries.
pub struct Lifecycle {
    registry: Registry<Notification>,
    config: OverlayConfig,
    stack: StackMetrics,
    metrics: Arc<dyn TextMetrics>,
    moving: bool,
    moves: Vec<(NotificationKey, f32, f32)>,
    keys: Vec<NotificationKey>,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("registry", &self.registry)
            .field("moving", &self.moving)
            .field("stack", &self.stack)
            .finish()
    }
}

impl Lifecycle {
    /// Create an empty lifecycle sized by `config.onscreen_max`.
    #[must_use]
    pub fn new(config: OverlayConfig, stack: StackMetrics, metrics: Arc<dyn TextMetrics>) -> Self {
        let capacity = config.onscreen_max.max(1);
        Self {
            registry: Registry::with_capacity(capacity),
            config,
            stack,
            metrics,
            moving: false,
            moves: Vec::with_capacity(capacity),
            keys: Vec::with_capacity(capacity),
        }
    }

    /// Live entries.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry<Notification> {
        &self.registry
    }

    /// Whether a reflow, unfold or kill currently blocks admission.
    #[inline]
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Current stack proportions.
    #[inline]
    #[must_use]
    pub fn stack_metrics(&self) -> StackMetrics {
        self.stack
    }

    /// Replace the stack proportions. Takes effect on the next reflow.
    pub fn set_stack_metrics(&mut self, stack: StackMetrics) {
        self.stack = stack;
    }

    /// Whether an admission attempt would succeed this tick.
    #[must_use]
    pub fn can_admit(&self) -> bool {
        !self.moving && !self.registry.is_full()
    }

    /// Observable state of `key`.
    #[must_use]
    pub fn phase(&self, key: NotificationKey, sched: &Scheduler) -> Phase {
        let Some(note) = self.registry.get(key) else {
            return Phase::Freed;
        };
        if note.is_dying() {
            Phase::Dying
        } else if note.pending_text.is_some() {
            Phase::Updating
        } else if sched.is_subject_active(&Subject::Offset(key))
            || note.flags.contains(NotificationFlags::UNFOLDING)
        {
            Phase::Settling
        } else if note.is_expiration_armed() || note.is_expired() {
            Phase::Expiring
        } else {
            Phase::Idle
        }
    }

    // -----------------------------------------------------------------------
    // Admission and reflow
    // -----------------------------------------------------------------------

    /// Admit `note` into the registry and reflow.
    ///
    /// # Errors
    ///
    /// Hands the notification back with [`OverlayError::RegistryFull`] when
    /// the registry is full or a reflow is still running.
    pub fn admit(
        &mut self,
        mut note: Notification,
        sched: &mut Scheduler,
    ) -> Result<NotificationKey, (OverlayError, Notification)> {
        if !self.can_admit() {
            return Err((OverlayError::RegistryFull, note));
        }

        // A task retitled while its notification waited shows the latest
        // title straight away.
        if let Some(mirror) = note.task.as_mut() {
            if let Ok(snapshot) = mirror.task.snapshot() {
                if snapshot.title_revision != mirror.seen_revision {
                    if let Ok(title) = mirror.task.title() {
                        note.width = self.metrics.text_width(&title) + self.stack.padding / 2.0;
                        note.text = title;
                    }
                    mirror.seen_revision = snapshot.title_revision;
                }
                mirror.snapshot = snapshot;
            }
        }

        let task_bound = note.is_task_bound();
        let display = note.display_duration;
        let live = self.registry.len() + 1;
        let (key, position) = self
            .registry
            .insert(note, task_bound)
            .map_err(|note| (OverlayError::RegistryFull, note))?;

        let tag = key.tag();
        if let Some(note) = self.registry.get_mut(key) {
            if let Some(mirror) = note.task.as_ref() {
                mirror.task.bind_live(key);
                note.hourglass_angle = 0.0;
                sched.start_timer(self.config.hourglass_interval, tag, Cue::HourglassSpin(key));
            } else {
                let delay = self.config.plain_expiration(display);
                note.expiration = Some(sched.start_timer(delay, tag, Cue::Expired(key)));
            }
            tracing::debug!(
                text = %note.text,
                position,
                task_bound,
                live,
                "admitted notification"
            );
        }

        self.reflow(sched);
        Ok(key)
    }

    /// Retarget every live entry's stack offset, bottom up.
    ///
    /// Entries that already sit at their target are left alone. The last
    /// pushed tween carries [`Cue::ReflowSettled`], naming the top-most
    /// entry that still needs its reveal.
    pub fn reflow(&mut self, sched: &mut Scheduler) {
        self.moves.clear();
        let mut y = 0.0;
        let mut unfold = None;

        for &key in self.registry.keys().iter().rev() {
            let Some(note) = self.registry.get(key) else {
                continue;
            };
            if note.is_dying() {
                continue;
            }
            y += self.stack.slot_height(note.is_task_bound());
            if !note.is_unfolded() {
                unfold = Some(key);
            }
            if note.offset_y != y {
                self.moves.push((key, note.offset_y, y));
            }
        }

        let last = self.moves.len();
        for (i, &(key, from, to)) in self.moves.iter().enumerate() {
            let mut spec = TweenSpec::new(
                Subject::Offset(key),
                from,
                to,
                self.config.animation_duration,
            )
            .easing(Easing::OutQuad)
            .tag(key.tag());
            if i + 1 == last {
                spec = spec.on_complete(Cue::ReflowSettled { unfold });
            }
            sched.push(spec);
        }
        if last > 0 {
            self.moving = true;
            tracing::trace!(moved = last, ?unfold, "reflow started");
        }
    }

    // -----------------------------------------------------------------------
    // Kill and free
    // -----------------------------------------------------------------------

    /// Start the kill fade for `key` and reflow the survivors.
    ///
    /// A bound task is released immediately; the fading entry no longer
    /// accepts its updates.
    pub fn kill(&mut self, key: NotificationKey, sched: &mut Scheduler) {
        let Some(note) = self.registry.get_mut(key) else {
            return;
        };
        if note.is_dying() {
            return;
        }

        let tag = key.tag();
        sched.cancel_all(tag);
        note.expiration = None;
        note.pending_text = None;
        note.text_blend = 0.0;
        note.flags.remove(NotificationFlags::UNFOLDING);
        note.flags.insert(NotificationFlags::DYING);
        self.moving = true;

        // Pushes for the task from now on queue a fresh notification.
        if let Some(mirror) = note.task.as_ref() {
            mirror.task.release_if(key);
        }

        let duration = self.config.animation_duration;
        sched.push(
            TweenSpec::new(
                Subject::Offset(key),
                note.offset_y,
                note.offset_y - self.stack.item_height / 4.0,
                duration,
            )
            .easing(Easing::OutQuad)
            .tag(tag),
        );
        sched.push(
            TweenSpec::new(Subject::Opacity(key), note.opacity, 0.0, duration)
                .easing(Easing::OutQuad)
                .tag(tag)
                .on_complete(Cue::KillSettled(key)),
        );
        tracing::debug!(text = %note.text, "killing notification");

        self.reflow(sched);
    }

    /// Remove `key` from the registry without animation.
    ///
    /// Returns `false` if the key no longer resolves.
    pub fn free(&mut self, key: NotificationKey, sched: &mut Scheduler) -> bool {
        sched.cancel_all(key.tag());
        let Some(note) = self.registry.remove(key) else {
            return false;
        };
        if let Some(mirror) = note.task.as_ref() {
            mirror.task.release_if(key);
        }
        self.moving = false;
        tracing::debug!(text = %note.text, live = self.registry.len(), "freed notification");
        true
    }

    /// Free every entry without kill animations.
    ///
    /// Cancels all per-entry animations before releasing anything.
    pub fn teardown(&mut self, sched: &mut Scheduler) -> usize {
        for &key in self.registry.keys() {
            sched.cancel_all(key.tag());
        }
        let mut freed = 0;
        self.registry.clear_with(|key, note| {
            if let Some(mirror) = note.task.as_ref() {
                mirror.task.release_if(key);
            }
            freed += 1;
        });
        self.moving = false;
        freed
    }

    // -----------------------------------------------------------------------
    // Per-tick polling
    // -----------------------------------------------------------------------

    /// Mirror bound task state into every live task notification.
    pub fn poll_tasks(&mut self, sched: &mut Scheduler) {
        self.keys.clear();
        self.keys.extend_from_slice(self.registry.keys());

        for i in 0..self.keys.len() {
            let key = self.keys[i];
            let Some(note) = self.registry.get_mut(key) else {
                continue;
            };
            if note.is_dying() {
                continue;
            }
            let Some(mirror) = note.task.as_mut() else {
                continue;
            };

            let snapshot = match mirror.task.snapshot() {
                Ok(snapshot) => snapshot,
                Err(_) => TaskSnapshot {
                    finished: true,
                    ..mirror.snapshot
                },
            };
            let retitle = snapshot.title_revision != mirror.seen_revision && mirror.task.is_alive();
            mirror.snapshot = snapshot;

            if !snapshot.is_done() {
                if let Some(id) = note.expiration.take() {
                    sched.cancel_timer(id);
                    note.flags.remove(NotificationFlags::EXPIRED);
                    tracing::trace!(text = %note.text, "task revived, expiration cancelled");
                }
            }

            if retitle {
                self.retitle(key, sched);
            }
        }
    }

    fn retitle(&mut self, key: NotificationKey, sched: &mut Scheduler) {
        let Some(note) = self.registry.get_mut(key) else {
            return;
        };
        let Some(mirror) = note.task.as_mut() else {
            return;
        };
        let Ok(title) = mirror.task.title() else {
            return;
        };
        mirror.seen_revision = mirror.snapshot.title_revision;
        mirror.epoch = mirror.epoch.wrapping_add(1);
        let alternative = mirror.snapshot.alternative_look;

        note.width = self.metrics.text_width(&title) + self.stack.padding / 2.0;
        note.text_blend = 0.0;
        tracing::debug!(from = %note.text, to = %title, "retitling task notification");

        if alternative {
            note.text = title;
            note.pending_text = None;
        } else {
            note.pending_text = Some(title);
            sched.push(
                TweenSpec::new(
                    Subject::TextBlend(key),
                    0.0,
                    self.stack.item_height / 2.0,
                    self.config.animation_duration * 2,
                )
                .easing(Easing::OutQuad)
                .tag(key.tag())
                .on_complete(Cue::TextSwap(key)),
            );
        }
    }

    /// Arm finished-task expirations and kill the first expired entry.
    ///
    /// Returns the killed key, if any.
    pub fn scan(&mut self, sched: &mut Scheduler) -> Option<NotificationKey> {
        let mut victim = None;
        self.keys.clear();
        self.keys.extend_from_slice(self.registry.keys());

        for i in 0..self.keys.len() {
            let key = self.keys[i];
            let Some(note) = self.registry.get_mut(key) else {
                continue;
            };
            if note.is_dying() {
                continue;
            }
            let done = note.task.as_ref().is_some_and(|m| m.snapshot.is_done());
            if done && note.expiration.is_none() {
                note.expiration = Some(sched.start_timer(
                    self.config.task_finished_duration,
                    key.tag(),
                    Cue::Expired(key),
                ));
            }
            if note.is_expired() && !self.moving {
                victim = Some(key);
                break;
            }
        }
        if let Some(key) = victim {
            self.kill(key, sched);
        }
        victim
    }

    // -----------------------------------------------------------------------
    // Scheduler output
    // -----------------------------------------------------------------------

    /// Write a scheduler sample into its notification field.
    pub fn apply_sample(&mut self, subject: Subject, value: f32) {
        let key = match subject {
            Subject::Offset(key)
            | Subject::Opacity(key)
            | Subject::Unfold(key)
            | Subject::TextBlend(key)
            | Subject::Hourglass(key) => key,
            Subject::PopupOffset | Subject::PopupUnfold => return,
        };
        let Some(note) = self.registry.get_mut(key) else {
            return;
        };
        let field = match subject {
            Subject::Offset(_) => &mut note.offset_y,
            Subject::Opacity(_) => &mut note.opacity,
            Subject::Unfold(_) => &mut note.unfold,
            Subject::TextBlend(_) => &mut note.text_blend,
            Subject::Hourglass(_) => &mut note.hourglass_angle,
            Subject::PopupOffset | Subject::PopupUnfold => return,
        };
        *field = value;
    }

    /// React to a notification cue. Popup cues are ignored.
    pub fn on_cue(&mut self, cue: Cue, sched: &mut Scheduler) {
        tracing::trace!(?cue, "notification cue");
        match cue {
            Cue::ReflowSettled { unfold } => {
                let target = unfold.filter(|&key| {
                    self.registry
                        .get(key)
                        .is_some_and(|n| !n.is_dying() && !n.is_unfolded())
                });
                match target {
                    Some(key) => self.start_unfold(key, sched),
                    None => self.moving = false,
                }
            }
            Cue::UnfoldSettled(key) => {
                if let Some(note) = self.registry.get_mut(key) {
                    note.flags.remove(NotificationFlags::UNFOLDING);
                }
                self.moving = false;
            }
            Cue::Expired(key) => {
                if let Some(note) = self.registry.get_mut(key) {
                    note.flags.insert(NotificationFlags::EXPIRED);
                }
            }
            Cue::KillSettled(key) => {
                self.free(key, sched);
            }
            Cue::TextSwap(key) => {
                if let Some(note) = self.registry.get_mut(key) {
                    if let Some(text) = note.pending_text.take() {
                        note.text = text;
                    }
                    note.text_blend = 0.0;
                }
            }
            Cue::HourglassSpin(key) => {
                if self.registry.contains(key) {
                    sched.push(
                        TweenSpec::new(
                            Subject::Hourglass(key),
                            0.0,
                            -TAU,
                            self.config.hourglass_duration,
                        )
                        .easing(Easing::OutQuad)
                        .tag(key.tag())
                        .on_complete(Cue::HourglassRest(key)),
                    );
                }
            }
            Cue::HourglassRest(key) => {
                if let Some(note) = self.registry.get_mut(key) {
                    note.hourglass_angle = 0.0;
                    sched.start_timer(
                        self.config.hourglass_interval,
                        key.tag(),
                        Cue::HourglassSpin(key),
                    );
                }
            }
            Cue::Popup(_) => {}
        }
    }

    fn start_unfold(&mut self, key: NotificationKey, sched: &mut Scheduler) {
        let Some(note) = self.registry.get_mut(key) else {
            return;
        };
        note.flags.insert(NotificationFlags::UNFOLDED | NotificationFlags::UNFOLDING);
        sched.push(
            TweenSpec::new(
                Subject::Unfold(key),
                note.unfold,
                1.0,
                self.config.animation_duration,
            )
            .easing(Easing::OutQuad)
            .tag(key.tag())
            .on_complete(Cue::UnfoldSettled(key)),
        );
    }
}
