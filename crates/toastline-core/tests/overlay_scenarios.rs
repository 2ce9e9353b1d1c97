//! End-to-end overlay scenarios driven frame by frame.
//!
//! Every test ticks the overlay with a fixed 10 ms delta and inspects it
//! through the public queries and a recording [`Renderer`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use toastline_core::{
    AchievementView, MonospaceMetrics, NoTextures, NotificationBody, NotificationView, Overlay,
    OverlayConfig, OverlayError, Phase, PopupStage, Progress, Renderer, TaskHandle, TaskIcon,
    TaskLabel, TaskTint, TextureHandle, TextureService,
};

const FRAME: Duration = Duration::from_millis(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn config() -> OverlayConfig {
    OverlayConfig::new()
        .animation_duration(Duration::from_millis(100))
        .task_finished_duration(Duration::from_millis(500))
        .achievement_hold(Duration::from_millis(200))
}

fn overlay_with(config: OverlayConfig) -> Overlay {
    init_tracing();
    Overlay::new(
        config,
        Arc::new(MonospaceMetrics::default()),
        Arc::new(NoTextures),
    )
}

fn run(overlay: &mut Overlay, total: Duration) {
    let frames = total.as_millis() / FRAME.as_millis();
    for _ in 0..frames {
        overlay.tick_logic_elapsed(FRAME);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Drawn {
    text: String,
    offset_y: f32,
    opacity: f32,
    body: NotificationBody,
}

#[derive(Default)]
struct Recorder {
    notes: Vec<Drawn>,
    popups: Vec<(String, String, f32)>,
}

impl Renderer for Recorder {
    fn draw_notification(&mut self, view: &NotificationView<'_>) {
        self.notes.push(Drawn {
            text: view.text.to_owned(),
            offset_y: view.offset_y,
            opacity: view.opacity,
            body: view.body,
        });
    }

    fn draw_achievement(&mut self, view: &AchievementView<'_>) {
        self.popups
            .push((view.header.to_owned(), view.title.to_owned(), view.y));
    }
}

fn frame(overlay: &Overlay) -> Recorder {
    let mut recorder = Recorder::default();
    overlay.render_frame(&mut recorder);
    recorder
}

fn task_view(drawn: &Drawn) -> toastline_core::TaskView {
    match drawn.body {
        NotificationBody::Task(view) => view,
        NotificationBody::Plain => panic!("expected a task banner, got {drawn:?}"),
    }
}

// -------------------------------------------------------------------------
// Plain notifications
// -------------------------------------------------------------------------

#[test]
fn plain_toast_full_lifetime() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    handle.push_notification(None, "Saved state", Duration::from_millis(1000), 0, false);

    overlay.tick_logic_elapsed(Duration::ZERO);
    let key = overlay.notifications().keys()[0];
    assert_eq!(overlay.phase(key), Phase::Settling);

    // Reflow settles at 100 ms, the reveal at 200 ms.
    run(&mut overlay, Duration::from_millis(300));
    assert_eq!(overlay.phase(key), Phase::Expiring);
    assert!(!overlay.is_moving());
    let note = overlay.notifications().get(key).unwrap();
    assert!(note.is_unfolded());
    assert_eq!(note.unfold(), 1.0);

    let drawn = frame(&overlay);
    assert_eq!(drawn.notes.len(), 1);
    assert_eq!(drawn.notes[0].text, "Saved state");
    assert_eq!(drawn.notes[0].opacity, 1.0);
    let slot = overlay.stack_metrics().slot_height(false);
    assert!((drawn.notes[0].offset_y - slot).abs() < 1e-3);
    assert_eq!(drawn.notes[0].body, NotificationBody::Plain);

    // Expiration fires 2 * 100 ms + 1000 ms after admission.
    run(&mut overlay, Duration::from_millis(850));
    assert_eq!(overlay.phase(key), Phase::Expiring);

    run(&mut overlay, Duration::from_millis(100));
    assert_eq!(overlay.phase(key), Phase::Dying);
    assert!(overlay.is_moving());
    let fading = frame(&overlay);
    assert!(fading.notes[0].opacity < 1.0);

    run(&mut overlay, Duration::from_millis(150));
    assert_eq!(overlay.phase(key), Phase::Freed);
    assert_eq!(overlay.onscreen_count(), 0);
    assert!(!overlay.is_moving());
    assert!(frame(&overlay).notes.is_empty());
}

#[test]
fn capacity_keeps_extra_notifications_pending() {
    let mut overlay = overlay_with(config().onscreen_max(2));
    let handle = overlay.handle();
    for text in ["one", "two", "three"] {
        handle.push_notification(None, text, Duration::from_secs(60), 0, false);
    }

    overlay.tick_logic_elapsed(Duration::ZERO);
    run(&mut overlay, Duration::from_millis(1000));

    assert_eq!(overlay.onscreen_count(), 2);
    assert_eq!(overlay.pending_count(), 1);
    let texts: Vec<_> = frame(&overlay).notes.into_iter().map(|d| d.text).collect();
    assert_eq!(texts, ["one", "two"]);
}

#[test]
fn admission_waits_for_settle() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    handle.push_notification(None, "first", Duration::from_secs(60), 0, false);
    handle.push_notification(None, "second", Duration::from_secs(60), 0, false);

    overlay.tick_logic_elapsed(Duration::ZERO);
    assert_eq!(overlay.onscreen_count(), 1);

    run(&mut overlay, Duration::from_millis(150));
    assert_eq!(overlay.onscreen_count(), 1, "reveal still running");

    run(&mut overlay, Duration::from_millis(100));
    assert_eq!(overlay.onscreen_count(), 2);
    assert_eq!(overlay.pending_count(), 0);
}

#[test]
fn newer_notifications_push_older_up() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    handle.push_notification(None, "old", Duration::from_secs(60), 0, false);
    overlay.tick_logic_elapsed(Duration::ZERO);
    run(&mut overlay, Duration::from_millis(300));
    handle.push_notification(None, "new", Duration::from_secs(60), 0, false);
    run(&mut overlay, Duration::from_millis(300));

    let drawn = frame(&overlay).notes;
    assert_eq!(drawn.len(), 2);
    assert_eq!(drawn[0].text, "old");
    assert_eq!(drawn[1].text, "new");
    assert!(drawn[0].offset_y > drawn[1].offset_y);

    let keys = overlay.notifications().keys().to_vec();
    let unfolded = keys
        .iter()
        .filter(|&&k| overlay.notifications().get(k).unwrap().is_unfolded())
        .count();
    assert_eq!(unfolded, 2);
}

#[test]
fn flush_discards_older_plain_pushes() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    let task = TaskHandle::new("Copying");
    handle.push_notification(None, "stale a", Duration::from_secs(1), 0, false);
    handle.push_notification(Some(&task), "", Duration::ZERO, 0, false);
    handle.push_notification(None, "stale b", Duration::from_secs(1), 0, false);
    handle.push_notification(None, "fresh", Duration::from_secs(1), 0, true);
    assert_eq!(overlay.pending_count(), 4);

    overlay.tick_logic_elapsed(Duration::ZERO);
    run(&mut overlay, Duration::from_millis(600));

    assert_eq!(overlay.pending_count(), 0);
    assert_eq!(overlay.stats().flushed, 2);
    let mut texts: Vec<_> = frame(&overlay).notes.into_iter().map(|d| d.text).collect();
    texts.sort();
    assert_eq!(texts, ["Copying", "fresh"]);
}

#[test]
fn full_intake_reports_backpressure() {
    let overlay = overlay_with(config().pending_max(2));
    let handle = overlay.handle();
    for text in ["a", "b"] {
        handle
            .try_push_notification(None, text, Duration::from_secs(1), 0, false)
            .unwrap();
    }
    assert_eq!(
        handle.try_push_notification(None, "c", Duration::from_secs(1), 0, false),
        Err(OverlayError::QueueFull)
    );
    handle.push_notification(None, "d", Duration::from_secs(1), 0, false);
    assert_eq!(overlay.pending_count(), 2);
    assert_eq!(overlay.stats().dropped, 2);
}

#[test]
fn producers_on_many_threads() {
    let mut overlay = overlay_with(config().pending_max(64).onscreen_max(64));
    let handle = overlay.handle();
    let workers: Vec<_> = (0..4)
        .map(|t| {
            let handle = handle.clone();
            std::thread::spawn(move || {
                for i in 0..8 {
                    handle.push_notification(
                        None,
                        &format!("worker {t} #{i}"),
                        Duration::from_secs(60),
                        0,
                        false,
                    );
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(overlay.pending_count(), 32);

    overlay.tick_logic_elapsed(Duration::ZERO);
    run(&mut overlay, Duration::from_secs(10));
    assert_eq!(overlay.onscreen_count(), 32);
    assert_eq!(overlay.pending_count(), 0);
}

// -------------------------------------------------------------------------
// Task notifications
// -------------------------------------------------------------------------

#[test]
fn task_progress_then_failure() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    let task = TaskHandle::new("Downloading core");
    handle.push_notification(Some(&task), "", Duration::ZERO, 0, false);
    assert_eq!(overlay.task_phase(&task), Some(Phase::Pending));

    overlay.tick_logic_elapsed(Duration::ZERO);
    task.set_progress(Progress::percent(40));
    run(&mut overlay, Duration::from_millis(300));
    assert_eq!(overlay.task_phase(&task), Some(Phase::Idle));

    let drawn = frame(&overlay).notes;
    let view = task_view(&drawn[0]);
    assert_eq!(drawn[0].text, "Downloading core");
    assert_eq!(view.label, TaskLabel::Percent(40));
    assert!(matches!(view.icon, TaskIcon::Hourglass { .. }));
    assert_eq!(view.tint, TaskTint::Background);
    assert_eq!(view.bar.map(|b| b.fraction), Some(0.4));

    task.fail("checksum mismatch");
    overlay.tick_logic_elapsed(FRAME);
    let view = task_view(&frame(&overlay).notes[0]);
    assert_eq!(view.label.to_string(), "Task failed");
    assert_eq!(view.icon, TaskIcon::Check);
    assert_eq!(view.tint, TaskTint::Progress1);
    assert_eq!(view.bar, None);
    assert_eq!(overlay.task_phase(&task), Some(Phase::Expiring));

    // Finished tasks linger for 500 ms, then fade for 100 ms.
    run(&mut overlay, Duration::from_millis(700));
    assert_eq!(overlay.onscreen_count(), 0);
    assert_eq!(overlay.task_phase(&task), None);
}

#[test]
fn restarted_task_gets_fresh_banner_while_old_one_fades() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    let task = TaskHandle::new("Step 1");
    handle.push_notification(Some(&task), "", Duration::ZERO, 0, false);
    overlay.tick_logic_elapsed(Duration::ZERO);
    let old = overlay.notifications().keys()[0];
    run(&mut overlay, Duration::from_millis(300));

    task.finish();
    let mut frames = 0;
    while overlay.phase(old) != Phase::Dying {
        overlay.tick_logic_elapsed(FRAME);
        frames += 1;
        assert!(frames < 100, "finished task never started fading");
    }
    // The fading banner no longer owns the task.
    assert_eq!(overlay.task_phase(&task), None);

    task.restart();
    handle
        .try_push_notification(Some(&task), "Step 2", Duration::ZERO, 0, false)
        .unwrap();
    assert_eq!(overlay.pending_count(), 1);
    assert_eq!(overlay.task_phase(&task), Some(Phase::Pending));

    run(&mut overlay, Duration::from_secs(2));
    assert_eq!(overlay.phase(old), Phase::Freed);
    assert_eq!(overlay.onscreen_count(), 1);
    assert_eq!(overlay.pending_count(), 0);
    let drawn = frame(&overlay).notes;
    assert_eq!(drawn[0].text, "Step 2");
    assert_eq!(task_view(&drawn[0]).label, TaskLabel::Unknown);
    assert_eq!(overlay.task_phase(&task), Some(Phase::Idle));
}

#[test]
fn repeated_task_pushes_share_one_notification() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    let task = TaskHandle::new("Scanning");
    handle.push_notification(Some(&task), "Scanning 1/3", Duration::ZERO, 0, false);
    handle.push_notification(Some(&task), "Scanning 2/3", Duration::ZERO, 0, false);
    assert_eq!(overlay.pending_count(), 1);

    overlay.tick_logic_elapsed(Duration::ZERO);
    run(&mut overlay, Duration::from_millis(300));
    assert_eq!(overlay.onscreen_count(), 1);
    assert_eq!(frame(&overlay).notes[0].text, "Scanning 2/3");

    handle.push_notification(Some(&task), "Scanning 3/3", Duration::ZERO, 0, false);
    assert_eq!(overlay.pending_count(), 0);
    overlay.tick_logic_elapsed(FRAME);
    assert_eq!(overlay.task_phase(&task), Some(Phase::Updating));

    run(&mut overlay, Duration::from_millis(250));
    let drawn = frame(&overlay).notes;
    assert_eq!(drawn.len(), 1);
    assert_eq!(drawn[0].text, "Scanning 3/3");
    assert_eq!(overlay.task_phase(&task), Some(Phase::Idle));
}

#[test]
fn task_banners_sit_below_plain_toasts() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    let task = TaskHandle::new("Indexing");

    handle.push_notification(None, "toast 1", Duration::from_secs(60), 0, false);
    overlay.tick_logic_elapsed(Duration::ZERO);
    run(&mut overlay, Duration::from_millis(300));
    handle.push_notification(Some(&task), "", Duration::ZERO, 0, false);
    run(&mut overlay, Duration::from_millis(300));
    handle.push_notification(None, "toast 2", Duration::from_secs(60), 0, false);
    run(&mut overlay, Duration::from_millis(300));

    let drawn = frame(&overlay).notes;
    let texts: Vec<_> = drawn.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(texts, ["toast 1", "toast 2", "Indexing"]);
    let lowest = drawn
        .iter()
        .min_by(|a, b| a.offset_y.total_cmp(&b.offset_y))
        .unwrap();
    assert_eq!(lowest.text, "Indexing");
    let half = overlay.stack_metrics().slot_height(true);
    assert!((lowest.offset_y - half).abs() < 1e-3);
}

#[test]
fn dropped_task_finishes_its_banner() {
    let mut overlay = overlay_with(config());
    let handle = overlay.handle();
    let task = TaskHandle::new("Ephemeral");
    handle.push_notification(Some(&task), "", Duration::ZERO, 0, false);
    overlay.tick_logic_elapsed(Duration::ZERO);
    run(&mut overlay, Duration::from_millis(300));
    drop(task);

    overlay.tick_logic_elapsed(FRAME);
    let view = task_view(&frame(&overlay).notes[0]);
    assert_eq!(view.icon, TaskIcon::Check);

    run(&mut overlay, Duration::from_millis(700));
    assert_eq!(overlay.onscreen_count(), 0);
}

// -------------------------------------------------------------------------
// Achievements
// -------------------------------------------------------------------------

#[derive(Default)]
struct CountingTextures {
    loaded: AtomicUsize,
    unloaded: AtomicUsize,
}

impl TextureService for CountingTextures {
    fn load_badge(&self, badge_id: &str) -> Option<TextureHandle> {
        let n = self.loaded.fetch_add(1, Ordering::SeqCst);
        (!badge_id.is_empty()).then(|| TextureHandle::new(n as u64))
    }

    fn unload(&self, _handle: TextureHandle) {
        self.unloaded.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn achievements_play_back_to_back() {
    init_tracing();
    let textures = Arc::new(CountingTextures::default());
    let mut overlay = Overlay::new(
        config().achievement_capacity(2),
        Arc::new(MonospaceMetrics::default()),
        Arc::clone(&textures) as Arc<dyn TextureService>,
    );
    let handle = overlay.handle();
    handle.push_achievement("First Blood", Some("badge-1")).unwrap();
    handle.push_achievement("Speed Run", Some("badge-2")).unwrap();
    assert_eq!(
        handle.push_achievement("Overflow", Some("badge-3")),
        Err(OverlayError::RingFull)
    );
    assert_eq!(textures.loaded.load(Ordering::SeqCst), 2);

    overlay.tick_logic_elapsed(Duration::ZERO);
    assert_eq!(overlay.achievement_stage(), PopupStage::SlidingIn);
    let drawn = frame(&overlay).popups;
    assert_eq!(drawn.len(), 1);
    assert_eq!(drawn[0].0, "Achievement Unlocked");
    assert_eq!(drawn[0].1, "First Blood");
    assert!(drawn[0].2 < 0.0);

    run(&mut overlay, Duration::from_millis(150));
    assert_eq!(overlay.achievement_stage(), PopupStage::Holding);

    // Slide 100 + hold 300 + fold 100 + slide 100.
    run(&mut overlay, Duration::from_millis(500));
    assert_eq!(overlay.achievement_stage(), PopupStage::SlidingIn);
    assert_eq!(frame(&overlay).popups[0].1, "Speed Run");
    assert_eq!(textures.unloaded.load(Ordering::SeqCst), 1);

    run(&mut overlay, Duration::from_millis(700));
    assert_eq!(overlay.achievement_stage(), PopupStage::Hidden);
    assert!(overlay.achievement_ring().unwrap().is_empty());
    assert_eq!(textures.unloaded.load(Ordering::SeqCst), 2);
    assert!(frame(&overlay).popups.is_empty());

    handle.push_achievement("Again", None).unwrap();
    overlay.tick_logic_elapsed(FRAME);
    assert_eq!(overlay.achievement_stage(), PopupStage::SlidingIn);
}

#[test]
fn teardown_unloads_queued_badges() {
    init_tracing();
    let textures = Arc::new(CountingTextures::default());
    let mut overlay = Overlay::new(
        config(),
        Arc::new(MonospaceMetrics::default()),
        Arc::clone(&textures) as Arc<dyn TextureService>,
    );
    let handle = overlay.handle();
    handle.push_achievement("a", Some("1")).unwrap();
    handle.push_achievement("b", Some("2")).unwrap();
    overlay.tick_logic_elapsed(Duration::ZERO);
    run(&mut overlay, Duration::from_millis(50));

    assert!(overlay.deinit());
    assert_eq!(textures.unloaded.load(Ordering::SeqCst), 2);
    assert_eq!(overlay.achievement_stage(), PopupStage::Hidden);
    assert_eq!(
        handle.push_achievement("c", None),
        Err(OverlayError::Inactive)
    );
}
