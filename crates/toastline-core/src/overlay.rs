#![forbid(unsafe_code)]

//! Overlay context.
//!
//! [`Overlay`] is the main-thread side: it owns the scheduler, the
//! lifecycle, the popup sequence and the consumer end of the intake queue,
//! and is driven by exactly one [`tick_logic`](Overlay::tick_logic) and one
//! [`render_frame`](Overlay::render_frame) per frame, in that order.
//!
//! [`OverlayHandle`] is the producer side: cheap to clone, `Send + Sync`,
//! and limited to pushing notifications and achievements.
//!
//! # Tick order
//!
//! 1. Advance the scheduler by the frame delta.
//! 2. Apply samples, then dispatch cues in firing order.
//! 3. Start the achievement popup if a producer requested it.
//! 4. Mirror task state into task notifications.
//! 5. Admit at most one pending notification.
//! 6. Arm finished-task expirations and kill at most one expired entry.
//!
//! # Failure Modes
//!
//! - Pushes while inactive are dropped with [`OverlayError::Inactive`].
//! - A full intake queue drops the push with [`OverlayError::QueueFull`].
//! - A full achievement ring rejects with [`OverlayError::RingFull`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use toastline_anim::{Clock, Step, SystemClock};
use web_time::Instant;

use crate::achievement::{AchievementRing, PopupSequence, PopupStage, TextureService};
use crate::config::{OverlayConfig, StackMetrics};
use crate::error::{OverlayError, Result};
use crate::intake::{self, IntakeReceiver, IntakeSender, IntakeStats};
use crate::lifecycle::Lifecycle;
use crate::metrics::TextMetrics;
use crate::notification::{Notification, NotificationInit, Phase};
use crate::registry::{NotificationKey, Registry};
use crate::render::{self, Renderer};
use crate::schedule::{Cue, GENERIC_TAG, Scheduler, Subject};
use crate::task::{Binding, TaskHandle};

struct Shared {
    active: AtomicBool,
    persistent: AtomicBool,
    config: OverlayConfig,
    metrics: Arc<dyn TextMetrics>,
    textures: Arc<dyn TextureService>,
    stack: Mutex<StackMetrics>,
    intake: IntakeSender,
    ring: OnceLock<AchievementRing>,
}

impl Shared {
    fn stack(&self) -> StackMetrics {
        *self.stack.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ring(&self) -> &AchievementRing {
        self.ring
            .get_or_init(|| AchievementRing::with_capacity(self.config.achievement_capacity))
    }
}

// ---------------------------------------------------------------------------
// Producer handle
// ---------------------------------------------------------------------------

/// Thread-safe producer handle.
#[derive(Clone)]
pub struct OverlayHandle {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for OverlayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayHandle")
            .field("active", &self.is_active())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl OverlayHandle {
    /// Queue a notification, dropping it silently on backpressure.
    ///
    /// With a task, `text` (when non-empty) becomes the task's title and the
    /// push is routed to the task's existing notification if it has one.
    /// `flush` discards plain notifications still waiting for admission.
    pub fn push_notification(
        &self,
        task: Option<&TaskHandle>,
        text: &str,
        duration: Duration,
        priority: u32,
        flush: bool,
    ) {
        if let Err(err) = self.try_push_notification(task, text, duration, priority, flush) {
            tracing::debug!(%err, text, "notification dropped");
        }
    }

    /// Queue a notification, reporting backpressure.
    ///
    /// # Errors
    ///
    /// [`OverlayError::Inactive`] when the overlay is inactive,
    /// [`OverlayError::QueueFull`] when the intake queue is full.
    pub fn try_push_notification(
        &self,
        task: Option<&TaskHandle>,
        text: &str,
        duration: Duration,
        priority: u32,
        flush: bool,
    ) -> Result<()> {
        if !self.is_active() {
            return Err(OverlayError::Inactive);
        }

        if let Some(task) = task {
            if !text.is_empty() {
                task.set_title(text);
            }
            if !task.claim_binding() {
                tracing::trace!(task = task.id().get(), "push routed to bound notification");
                return Ok(());
            }
        }

        let shared = &self.shared;
        let note = Notification::new(
            NotificationInit {
                text: text.to_owned(),
                display_duration: duration,
                priority,
                task: task.map(TaskHandle::downgrade),
            },
            shared.metrics.as_ref(),
            &shared.stack(),
            shared.config.icons_available,
        );

        shared.intake.push(note, flush).map_err(|(err, _)| {
            if let Some(task) = task {
                task.release_pending();
            }
            err
        })
    }

    /// Queue an achievement popup.
    ///
    /// The badge is loaded through the texture service only if the ring has
    /// room.
    ///
    /// # Errors
    ///
    /// [`OverlayError::Inactive`] when the overlay is inactive,
    /// [`OverlayError::RingFull`] when every slot is taken.
    pub fn push_achievement(&self, title: &str, badge_id: Option<&str>) -> Result<()> {
        if !self.is_active() {
            return Err(OverlayError::Inactive);
        }
        let textures = &self.shared.textures;
        let accepted = self
            .shared
            .ring()
            .enqueue_with(title, || badge_id.and_then(|id| textures.load_badge(id)));
        if accepted {
            Ok(())
        } else {
            Err(OverlayError::RingFull)
        }
    }

    /// Whether the overlay accepts pushes.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Notifications waiting for admission.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.intake.pending()
    }

    /// Intake traffic counters.
    #[must_use]
    pub fn stats(&self) -> IntakeStats {
        self.shared.intake.stats()
    }
}

// ---------------------------------------------------------------------------
// Main-thread context
// ---------------------------------------------------------------------------

/// Main-thread overlay context.
pub struct Overlay {
    shared: Arc<Shared>,
    intake: IntakeReceiver,
    lifecycle: Lifecycle,
    popup: PopupSequence,
    sched: Scheduler,
    step: Step<Subject, Cue>,
    cues: Vec<Cue>,
    clock: Arc<dyn Clock>,
    last_tick: Option<Instant>,
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("active", &self.is_active())
            .field("lifecycle", &self.lifecycle)
            .field("popup", &self.popup)
            .field("sched", &self.sched)
            .finish()
    }
}

impl Overlay {
    /// Create an active overlay measuring frame time with the wall clock.
    #[must_use]
    pub fn new(
        config: OverlayConfig,
        metrics: Arc<dyn TextMetrics>,
        textures: Arc<dyn TextureService>,
    ) -> Self {
        Self::with_clock(config, metrics, textures, Arc::new(SystemClock))
    }

    /// Create an active overlay measuring frame time with `clock`.
    #[must_use]
    pub fn with_clock(
        config: OverlayConfig,
        metrics: Arc<dyn TextMetrics>,
        textures: Arc<dyn TextureService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let stack = StackMetrics::from_line_height(
            metrics.line_height(),
            StackMetrics::default().max_text_width,
        );
        let (tx, rx) = intake::channel(config.pending_max);
        let lifecycle = Lifecycle::new(config.clone(), stack, Arc::clone(&metrics));
        let popup = PopupSequence::new(
            &config,
            stack.padding,
            Arc::clone(&metrics),
            Arc::clone(&textures),
        );
        tracing::debug!(
            onscreen_max = config.onscreen_max,
            pending_max = config.pending_max,
            achievement_capacity = config.achievement_capacity,
            "overlay initialised"
        );
        Self {
            shared: Arc::new(Shared {
                active: AtomicBool::new(true),
                persistent: AtomicBool::new(false),
                config,
                metrics,
                textures,
                stack: Mutex::new(stack),
                intake: tx,
                ring: OnceLock::new(),
            }),
            intake: rx,
            lifecycle,
            popup,
            sched: Scheduler::new(),
            step: Step::new(),
            cues: Vec::new(),
            clock,
            last_tick: None,
        }
    }

    /// Producer handle sharing this overlay's queues.
    #[must_use]
    pub fn handle(&self) -> OverlayHandle {
        OverlayHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Accept or refuse pushes. Inactive overlays neither tick nor render.
    pub fn set_active(&mut self, active: bool) {
        self.shared.active.store(active, Ordering::Release);
        if !active {
            self.last_tick = None;
        }
    }

    /// Whether the overlay is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Keep state across [`deinit`](Self::deinit), e.g. across a context loss.
    pub fn set_persistence(&mut self, persistent: bool) {
        self.shared.persistent.store(persistent, Ordering::Release);
    }

    /// Whether state survives [`deinit`](Self::deinit).
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.shared.persistent.load(Ordering::Acquire)
    }

    /// Deactivate, tearing everything down unless persistence is set.
    ///
    /// Returns whether a teardown ran.
    pub fn deinit(&mut self) -> bool {
        self.set_active(false);
        if self.is_persistent() {
            tracing::debug!("overlay deinit, state persisted");
            return false;
        }
        self.teardown();
        true
    }

    /// Free everything without animations.
    ///
    /// Cancels the generic tag and every entry tag before any structure is
    /// released. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.sched.cancel_all(GENERIC_TAG);

        let pending = self.intake.drain_all(|note| {
            if let Some(mirror) = note.task.as_ref() {
                mirror.task.release_pending();
            }
        });
        let freed = self.lifecycle.teardown(&mut self.sched);
        let popups = match self.shared.ring.get() {
            Some(ring) => self.popup.teardown(ring),
            None => 0,
        };
        self.sched.clear();
        self.step.clear();
        self.cues.clear();
        self.last_tick = None;
        tracing::debug!(pending, freed, popups, "overlay torn down");
    }

    // -----------------------------------------------------------------------
    // Frame entry points
    // -----------------------------------------------------------------------

    /// Run one logic tick, measuring the delta with the overlay clock.
    ///
    /// The first tick after construction or reactivation has a zero delta.
    pub fn tick_logic(&mut self) {
        let now = self.clock.now();
        let dt = self
            .last_tick
            .and_then(|last| now.checked_duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);
        self.tick_logic_elapsed(dt);
    }

    /// Run one logic tick with an explicit delta.
    pub fn tick_logic_elapsed(&mut self, dt: Duration) {
        if !self.is_active() {
            return;
        }

        self.sched.advance(dt, &mut self.step);
        for &(subject, value) in self.step.samples() {
            match subject {
                Subject::PopupOffset | Subject::PopupUnfold => {
                    self.popup.apply_sample(subject, value);
                }
                _ => self.lifecycle.apply_sample(subject, value),
            }
        }

        self.cues.extend(self.step.drain_fired());
        let ring = self.shared.ring.get();
        for cue in self.cues.drain(..) {
            match cue {
                Cue::Popup(cue) => {
                    if let Some(ring) = ring {
                        self.popup.on_cue(cue, ring, &mut self.sched);
                    }
                }
                cue => self.lifecycle.on_cue(cue, &mut self.sched),
            }
        }

        if let Some(ring) = ring {
            if ring.take_start_request() {
                self.popup.start(ring, &mut self.sched);
            }
        }

        self.lifecycle.poll_tasks(&mut self.sched);

        if self.lifecycle.can_admit() {
            if let Some(note) = self.intake.drain_one() {
                if let Err((err, note)) = self.lifecycle.admit(note, &mut self.sched) {
                    tracing::debug!(%err, text = %note.text(), "admission failed");
                    if let Some(mirror) = note.task.as_ref() {
                        mirror.task.release_pending();
                    }
                }
            }
        }

        self.lifecycle.scan(&mut self.sched);
    }

    /// Hand every visible element to `renderer`.
    pub fn render_frame(&self, renderer: &mut dyn Renderer) {
        if !self.is_active() {
            return;
        }
        render::render(&self.lifecycle, &self.popup, renderer);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Notifications waiting for admission.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.intake.pending()
    }

    /// Notifications on screen.
    #[must_use]
    pub fn onscreen_count(&self) -> usize {
        self.lifecycle.registry().len()
    }

    /// Live notifications in stack order.
    #[must_use]
    pub fn notifications(&self) -> &Registry<Notification> {
        self.lifecycle.registry()
    }

    /// Whether a reflow, unfold or kill currently blocks admission.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.lifecycle.is_moving()
    }

    /// Lifecycle state of an on-screen (or freed) notification.
    #[must_use]
    pub fn phase(&self, key: NotificationKey) -> Phase {
        self.lifecycle.phase(key, &self.sched)
    }

    /// Lifecycle state of the notification displaying `task`, if any.
    #[must_use]
    pub fn task_phase(&self, task: &TaskHandle) -> Option<Phase> {
        match task.binding()? {
            Binding::Pending => Some(Phase::Pending),
            Binding::Live(key) => Some(self.phase(key)),
        }
    }

    /// Stage of the achievement popup.
    #[must_use]
    pub fn achievement_stage(&self) -> PopupStage {
        self.popup.stage()
    }

    /// Achievement ring, once the first achievement was pushed.
    #[must_use]
    pub fn achievement_ring(&self) -> Option<&AchievementRing> {
        self.shared.ring.get()
    }

    /// Intake traffic counters.
    #[must_use]
    pub fn stats(&self) -> IntakeStats {
        self.shared.intake.stats()
    }

    /// Configuration fixed at construction.
    #[must_use]
    pub fn config(&self) -> &OverlayConfig {
        &self.shared.config
    }

    /// Current stack proportions.
    #[must_use]
    pub fn stack_metrics(&self) -> StackMetrics {
        self.lifecycle.stack_metrics()
    }

    /// Replace the stack proportions, e.g. after a resize.
    ///
    /// Notifications pushed from now on are laid out with the new values;
    /// positions update on the next reflow.
    pub fn set_stack_metrics(&mut self, stack: StackMetrics) {
        *self.shared.stack.lock().unwrap_or_else(|e| e.into_inner()) = stack;
        self.lifecycle.set_stack_metrics(stack);
        self.popup.set_padding(stack.padding);
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.set_active(false);
        self.teardown();
    }
}
