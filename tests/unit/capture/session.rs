use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use super::*;
use crate::capture::camera::VideoFrame;

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    stops: AtomicUsize,
    grabs: AtomicUsize,
    /// Number of upcoming grabs that fail.
    grab_failures: AtomicUsize,
}

struct MockCamera {
    counters: Arc<Counters>,
    failures: VecDeque<BoothError>,
}

struct MockStream {
    counters: Arc<Counters>,
    live: bool,
}

impl MockCamera {
    fn new() -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                counters: Arc::clone(&counters),
                failures: VecDeque::new(),
            },
            counters,
        )
    }
}

#[async_trait::async_trait]
impl Camera for MockCamera {
    type Stream = MockStream;

    async fn open(&mut self) -> BoothResult<MockStream> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockStream {
            counters: Arc::clone(&self.counters),
            live: true,
        })
    }
}

impl VideoStream for MockStream {
    // Each grab yields a distinct 2x1 frame whose left and right pixels differ.
    fn grab_frame(&mut self) -> BoothResult<VideoFrame> {
        let failures = &self.counters.grab_failures;
        let pending = failures.load(Ordering::SeqCst);
        if pending > 0 {
            failures.store(pending - 1, Ordering::SeqCst);
            return Err(BoothError::validation("transient frame error"));
        }
        let n = self.counters.grabs.fetch_add(1, Ordering::SeqCst) as u8 + 1;
        VideoFrame::new(2, 1, vec![n, 0, 0, 255, 0, n, 0, 255])
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn session() -> (CaptureSession<MockCamera>, Arc<Counters>) {
    let (cam, counters) = MockCamera::new();
    (CaptureSession::new(cam, CaptureOpts::default()), counters)
}

#[tokio::test(start_paused = true)]
async fn four_cycles_complete_and_release_stream() {
    let (mut s, counters) = session();
    s.start_camera().await.unwrap();
    assert_eq!(s.phase(), CapturePhase::Live);
    assert!(s.is_armed());

    for i in 0..SLOT_COUNT {
        assert_eq!(s.current_index(), i);
        assert_eq!(s.run_until_captured().await.unwrap(), i);
        assert_eq!(s.phase(), CapturePhase::SlotFilled);
        assert!(s.completed_photos().is_none());
        let done = s.advance_slot().unwrap();
        assert_eq!(done, i == SLOT_COUNT - 1);
    }

    assert_eq!(s.phase(), CapturePhase::Complete);
    assert!(!s.is_stream_active());
    assert!(!s.is_armed());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);

    let photos = s.completed_photos().unwrap();
    for (i, a) in photos.iter().enumerate() {
        for b in &photos[i + 1..] {
            assert_ne!(a.png, b.png);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn countdown_emits_ticks_then_captures_on_schedule() {
    let (mut s, _) = session();
    let t0 = Instant::now();
    s.start_camera().await.unwrap();

    let mut events = Vec::new();
    while s.slots()[0].is_none() {
        events.push(s.next_event().await.unwrap().unwrap());
    }
    let tick = |remaining| CaptureEvent::Tick { slot: 0, remaining };
    let started = CaptureEvent::CountdownStarted {
        slot: 0,
        remaining: 5,
    };
    assert_eq!(
        events,
        vec![
            started,
            tick(4),
            tick(3),
            tick(2),
            tick(1),
            CaptureEvent::Captured { slot: 0 },
        ]
    );
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_millis(5500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(5600), "{elapsed:?}");
    assert_eq!(s.countdown_value(), None);
    assert!(!s.is_armed());
    assert_eq!(s.next_event().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn explicit_start_is_noop_while_armed() {
    let (mut s, _) = session();
    assert!(!s.start_countdown());

    s.start_camera().await.unwrap();
    assert!(!s.start_countdown(), "settle timer is armed");

    let ev = s.next_event().await.unwrap();
    assert!(matches!(ev, Some(CaptureEvent::CountdownStarted { .. })));
    assert_eq!(s.countdown_value(), Some(5));
    assert!(s.is_capturing());
    assert!(!s.start_countdown(), "countdown already running");

    s.next_event().await.unwrap();
    assert_eq!(s.countdown_value(), Some(4));
}

#[tokio::test(start_paused = true)]
async fn capture_mirrors_the_frame() {
    let (mut s, _) = session();
    s.start_camera().await.unwrap();
    s.run_until_captured().await.unwrap();
    let photo = s.slots()[0].clone().unwrap();
    assert_eq!(photo.image.pixel(0, 0), Some([0, 1, 0, 255]));
    assert_eq!(photo.image.pixel(1, 0), Some([1, 0, 0, 255]));
}

#[tokio::test(start_paused = true)]
async fn retake_leaves_other_slots_untouched() {
    let (mut s, counters) = session();
    s.start_camera().await.unwrap();
    s.run_until_captured().await.unwrap();
    s.advance_slot().unwrap();
    s.run_until_captured().await.unwrap();

    let first = s.slots()[0].clone().unwrap();
    let before = s.slots()[1].clone().unwrap();

    s.retake_photo().await.unwrap();
    assert!(s.slots()[1].is_none());
    assert_eq!(s.phase(), CapturePhase::Live);
    assert_eq!(s.current_index(), 1);

    let t0 = Instant::now();
    let ev = s.next_event().await.unwrap();
    assert!(matches!(
        ev,
        Some(CaptureEvent::CountdownStarted { slot: 1, .. })
    ));
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(200), "{elapsed:?}");

    s.run_until_captured().await.unwrap();
    let after = s.slots()[1].clone().unwrap();
    assert_ne!(after.png, before.png);

    let still_first = s.slots()[0].clone().unwrap();
    assert!(Arc::ptr_eq(&first.png, &still_first.png));
    assert_eq!(first, still_first);
    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn retake_after_stop_restarts_the_camera() {
    let (mut s, counters) = session();
    s.start_camera().await.unwrap();
    s.run_until_captured().await.unwrap();
    s.stop_camera();
    assert_eq!(s.phase(), CapturePhase::Idle);

    // Restarting on a filled slot waits for keep or retake.
    s.start_camera().await.unwrap();
    assert_eq!(s.phase(), CapturePhase::SlotFilled);
    assert!(!s.is_armed());
    s.stop_camera();

    s.retake_photo().await.unwrap();
    assert_eq!(counters.opens.load(Ordering::SeqCst), 3);
    assert!(s.is_stream_active());
    assert_eq!(s.phase(), CapturePhase::Live);
    assert!(s.slots()[0].is_none());

    let t0 = Instant::now();
    s.next_event().await.unwrap();
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn camera_failure_keeps_idle_and_allows_retry() {
    let (mut cam, counters) = MockCamera::new();
    cam.failures
        .push_back(BoothError::CameraUnavailable("permission denied".into()));
    cam.failures
        .push_back(BoothError::CameraBusy("held by another app".into()));
    let mut s = CaptureSession::new(cam, CaptureOpts::default());

    let err = s.start_camera().await.unwrap_err();
    assert!(matches!(err, BoothError::CameraUnavailable(_)));
    assert_eq!(s.phase(), CapturePhase::Idle);
    assert!(!s.is_armed());

    let err = s.start_camera().await.unwrap_err();
    assert!(err.is_camera_error());
    assert_eq!(s.filled_count(), 0);

    s.start_camera().await.unwrap();
    assert_eq!(s.phase(), CapturePhase::Live);
    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn advance_requires_a_filled_slot() {
    let (mut s, _) = session();
    s.start_camera().await.unwrap();
    assert!(matches!(
        s.advance_slot().unwrap_err(),
        BoothError::Validation(_)
    ));
    assert_eq!(s.current_index(), 0);
    assert!(s.is_armed());
}

#[tokio::test(start_paused = true)]
async fn stop_camera_cancels_the_timer() {
    let (mut s, counters) = session();
    s.start_camera().await.unwrap();
    s.next_event().await.unwrap();
    assert!(s.is_capturing());

    s.stop_camera();
    assert_eq!(s.phase(), CapturePhase::Idle);
    assert_eq!(s.next_event().await.unwrap(), None);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert!(s.run_until_captured().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn reopen_preserves_slots_and_completes_again() {
    let (mut s, counters) = session();
    s.start_camera().await.unwrap();
    for _ in 0..SLOT_COUNT {
        s.run_until_captured().await.unwrap();
        s.advance_slot().unwrap();
    }
    let before = s.completed_photos().unwrap();
    assert!(s.start_camera().await.is_err());

    s.reopen().await.unwrap();
    assert_eq!(s.phase(), CapturePhase::SlotFilled);
    assert_eq!(s.current_index(), SLOT_COUNT - 1);
    assert!(s.is_stream_active());
    assert_eq!(s.filled_count(), SLOT_COUNT);

    assert!(s.advance_slot().unwrap());
    assert_eq!(s.completed_photos().unwrap(), before);
    assert_eq!(counters.opens.load(Ordering::SeqCst), 2);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_session_releases_the_stream() {
    let (mut s, counters) = session();
    s.start_camera().await.unwrap();
    s.next_event().await.unwrap();
    drop(s);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn opts_follow_config() {
    let cfg = CaptureConfig {
        countdown_ticks: 3,
        tick_ms: 250,
        settle_ms: 10,
        retake_ms: 5,
    };
    let opts = CaptureOpts::from(&cfg);
    assert_eq!(opts.countdown_ticks, 3);
    assert_eq!(opts.tick, Duration::from_millis(250));
    assert_eq!(opts.settle, Duration::from_millis(10));
    assert_eq!(opts.retake, Duration::from_millis(5));
}

#[tokio::test(start_paused = true)]
async fn reset_returns_to_a_fresh_session() {
    let (mut s, counters) = session();
    s.start_camera().await.unwrap();
    s.run_until_captured().await.unwrap();
    s.advance_slot().unwrap();

    s.reset();
    assert_eq!(s.phase(), CapturePhase::Idle);
    assert_eq!(s.current_index(), 0);
    assert_eq!(s.filled_count(), 0);
    assert!(!s.is_stream_active());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_grab_rearms_the_countdown() {
    let (mut s, counters) = session();
    counters.grab_failures.store(1, Ordering::SeqCst);
    s.start_camera().await.unwrap();

    let err = s.capture_photo().unwrap_err();
    assert!(matches!(err, BoothError::Validation(_)), "{err}");
    assert_eq!(s.phase(), CapturePhase::Live);
    assert!(s.is_stream_active());
    assert!(s.is_armed());
    assert!(s.slots()[0].is_none());

    let ev = s.next_event().await.unwrap();
    assert_eq!(
        ev,
        Some(CaptureEvent::CountdownStarted {
            slot: 0,
            remaining: 5,
        })
    );
    while s.slots()[0].is_none() {
        s.next_event().await.unwrap();
    }
    assert_eq!(s.phase(), CapturePhase::SlotFilled);
}

#[tokio::test(start_paused = true)]
async fn capture_without_stream_stays_idle() {
    let (mut s, _) = session();
    let err = s.capture_photo().unwrap_err();
    assert!(matches!(err, BoothError::CameraUnavailable(_)));
    assert_eq!(s.phase(), CapturePhase::Idle);
    assert!(!s.is_armed());
}
