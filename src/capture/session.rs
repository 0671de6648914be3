use std::time::Duration;

use tokio::time::Instant;

use crate::{
    assets::decode::Photo,
    capture::camera::{Camera, VideoStream},
    foundation::{
        config::CaptureConfig,
        core::SLOT_COUNT,
        error::{BoothError, BoothResult},
    },
};

/// Timing knobs of the countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureOpts {
    /// Countdown length in ticks; the photo is taken when the last tick elapses.
    pub countdown_ticks: u8,
    pub tick: Duration,
    /// Delay before an automatic countdown on an empty slot.
    pub settle: Duration,
    /// Delay before the countdown restarts after a retake on a live stream.
    pub retake: Duration,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for CaptureOpts {
    fn from(cfg: &CaptureConfig) -> Self {
        Self {
            countdown_ticks: cfg.countdown_ticks.max(1),
            tick: Duration::from_millis(cfg.tick_ms),
            settle: Duration::from_millis(cfg.settle_ms),
            retake: Duration::from_millis(cfg.retake_ms),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapturePhase {
    /// No stream; either not started yet or acquisition failed.
    Idle,
    /// Stream live, current slot empty, no countdown running.
    Live,
    CountingDown { remaining: u8 },
    /// Current slot holds a photo, waiting for keep or retake.
    SlotFilled,
    /// All four slots filled and the stream released.
    Complete,
}

/// Observable progress reported by [`CaptureSession::next_event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureEvent {
    CountdownStarted { slot: usize, remaining: u8 },
    Tick { slot: usize, remaining: u8 },
    Captured { slot: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerStage {
    Settling,
    Counting { remaining: u8 },
}

#[derive(Clone, Copy, Debug)]
struct ArmedTimer {
    deadline: Instant,
    stage: TimerStage,
}

/// Four-slot capture state machine over an exclusively owned video stream.
///
/// At most one timer is armed at any time. The stream is released when the session
/// completes, when [`stop_camera`](Self::stop_camera) is called, and on drop.
pub struct CaptureSession<C: Camera> {
    camera: C,
    stream: Option<C::Stream>,
    opts: CaptureOpts,
    slots: [Option<Photo>; SLOT_COUNT],
    current: usize,
    phase: CapturePhase,
    timer: Option<ArmedTimer>,
}

impl<C: Camera> std::fmt::Debug for CaptureSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("filled", &self.filled_count())
            .field("stream_active", &self.stream.is_some())
            .field("armed", &self.timer.map(|t| t.stage))
            .finish()
    }
}

impl<C: Camera> CaptureSession<C> {
    pub fn new(camera: C, opts: CaptureOpts) -> Self {
        Self {
            camera,
            stream: None,
            opts,
            slots: Default::default(),
            current: 0,
            phase: CapturePhase::Idle,
            timer: None,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn slots(&self) -> &[Option<Photo>; SLOT_COUNT] {
        &self.slots
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Countdown value shown to the subject, present only while counting down.
    pub fn countdown_value(&self) -> Option<u8> {
        match self.phase {
            CapturePhase::CountingDown { remaining } => Some(remaining),
            _ => None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.phase, CapturePhase::CountingDown { .. })
    }

    pub fn is_stream_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    /// Acquire the stream. Camera failures leave the session `Idle` and may be retried.
    #[tracing::instrument(skip(self))]
    pub async fn start_camera(&mut self) -> BoothResult<()> {
        if self.phase == CapturePhase::Complete {
            return Err(BoothError::validation(
                "capture session is complete; reopen it to keep capturing",
            ));
        }
        if self.stream.is_some() {
            return Ok(());
        }
        match self.camera.open().await {
            Ok(stream) => {
                self.stream = Some(stream);
                tracing::info!("camera stream acquired");
                self.enter_current_slot(self.opts.settle);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "camera acquisition failed");
                self.timer = None;
                self.phase = CapturePhase::Idle;
                Err(err)
            }
        }
    }

    /// Start the countdown now. Returns `false` when a timer is already armed or the
    /// session is not live on an empty slot.
    pub fn start_countdown(&mut self) -> bool {
        if self.timer.is_some() || self.phase != CapturePhase::Live || self.stream.is_none() {
            return false;
        }
        self.begin_countdown(Instant::now());
        true
    }

    /// Wait for the armed deadline and advance the countdown by one step.
    ///
    /// Returns `Ok(None)` when nothing is armed. State only changes after the deadline
    /// elapses, so dropping the future early leaves the session untouched.
    pub async fn next_event(&mut self) -> BoothResult<Option<CaptureEvent>> {
        let Some(timer) = self.timer else {
            return Ok(None);
        };
        tokio::time::sleep_until(timer.deadline).await;

        let slot = self.current;
        let event = match timer.stage {
            TimerStage::Settling => {
                self.timer = None;
                self.begin_countdown(timer.deadline);
                CaptureEvent::CountdownStarted {
                    slot,
                    remaining: self.opts.countdown_ticks,
                }
            }
            TimerStage::Counting { remaining } if remaining <= 1 => {
                self.capture_photo()?;
                CaptureEvent::Captured { slot }
            }
            TimerStage::Counting { remaining } => {
                let remaining = remaining - 1;
                self.phase = CapturePhase::CountingDown { remaining };
                self.timer = Some(ArmedTimer {
                    deadline: timer.deadline + self.opts.tick,
                    stage: TimerStage::Counting { remaining },
                });
                CaptureEvent::Tick { slot, remaining }
            }
        };
        tracing::debug!(?event, "capture event");
        Ok(Some(event))
    }

    /// Grab the current frame, mirror it, and store it in the current slot.
    #[tracing::instrument(skip(self))]
    pub fn capture_photo(&mut self) -> BoothResult<usize> {
        self.timer = None;
        if self.slots[self.current].is_some() {
            return Err(BoothError::validation(format!(
                "slot {} already holds a photo; retake it first",
                self.current + 1
            )));
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(BoothError::CameraUnavailable(
                "no live stream to capture from".to_string(),
            ));
        };
        let captured = stream
            .grab_frame()
            .and_then(|frame| frame.mirrored())
            .and_then(|frame| Photo::from_straight_rgba8(frame.width, frame.height, frame.rgba));
        match captured {
            Ok(photo) => {
                self.slots[self.current] = Some(photo);
                self.phase = CapturePhase::SlotFilled;
                tracing::info!("photo captured");
                Ok(self.current)
            }
            Err(err) => {
                tracing::warn!(error = %err, "capture failed");
                if self.stream.is_some() {
                    self.arm_settle(self.opts.settle);
                } else {
                    self.phase = CapturePhase::Idle;
                }
                Err(err)
            }
        }
    }

    /// Discard the current slot's photo and re-arm the countdown for it.
    #[tracing::instrument(skip(self))]
    pub async fn retake_photo(&mut self) -> BoothResult<()> {
        if self.phase == CapturePhase::Complete || self.slots[self.current].is_none() {
            return Err(BoothError::validation(
                "nothing to retake in the current slot",
            ));
        }
        self.timer = None;
        self.slots[self.current] = None;
        if self.stream.is_some() {
            self.arm_settle(self.opts.retake);
            return Ok(());
        }
        self.phase = CapturePhase::Idle;
        self.start_camera().await
    }

    /// Keep the current photo. Returns `true` once the fourth slot is kept, at which
    /// point the stream is released and the session is complete.
    pub fn advance_slot(&mut self) -> BoothResult<bool> {
        if self.slots[self.current].is_none() {
            return Err(BoothError::validation(format!(
                "slot {} has no photo yet",
                self.current + 1
            )));
        }
        self.timer = None;
        if self.current + 1 >= SLOT_COUNT {
            self.release_stream();
            self.phase = CapturePhase::Complete;
            tracing::info!("capture session complete");
            return Ok(true);
        }
        self.current += 1;
        if self.stream.is_some() {
            self.enter_current_slot(self.opts.settle);
        } else if self.slots[self.current].is_some() {
            self.phase = CapturePhase::SlotFilled;
        } else {
            self.phase = CapturePhase::Idle;
        }
        Ok(false)
    }

    /// Cancel any armed timer and release the stream.
    pub fn stop_camera(&mut self) {
        self.timer = None;
        self.release_stream();
        if self.phase != CapturePhase::Complete {
            self.phase = CapturePhase::Idle;
        }
    }

    /// Release the stream and forget every photo, back to a fresh session on slot 0.
    pub fn reset(&mut self) {
        self.stop_camera();
        self.slots = Default::default();
        self.current = 0;
        self.phase = CapturePhase::Idle;
    }

    /// Re-enter a completed session with its photos intact and the camera re-acquired.
    pub async fn reopen(&mut self) -> BoothResult<()> {
        if self.phase != CapturePhase::Complete {
            return Err(BoothError::validation(
                "only a completed session can be reopened",
            ));
        }
        self.phase = CapturePhase::Idle;
        self.start_camera().await
    }

    /// The four photos, available only once the session is complete.
    pub fn completed_photos(&self) -> Option<[Photo; SLOT_COUNT]> {
        if self.phase != CapturePhase::Complete {
            return None;
        }
        let photos: Vec<Photo> = self.slots.iter().cloned().collect::<Option<_>>()?;
        photos.try_into().ok()
    }

    /// Drive the countdown until the current slot holds a photo.
    pub async fn run_until_captured(&mut self) -> BoothResult<usize> {
        loop {
            if self.slots[self.current].is_some() {
                return Ok(self.current);
            }
            if self.timer.is_none() && !self.start_countdown() {
                return Err(BoothError::validation(format!(
                    "cannot capture while {:?}",
                    self.phase
                )));
            }
            self.next_event().await?;
        }
    }

    fn enter_current_slot(&mut self, delay: Duration) {
        if self.slots[self.current].is_some() {
            self.timer = None;
            self.phase = CapturePhase::SlotFilled;
        } else {
            self.arm_settle(delay);
        }
    }

    fn arm_settle(&mut self, delay: Duration) {
        self.phase = CapturePhase::Live;
        self.timer = Some(ArmedTimer {
            deadline: Instant::now() + delay,
            stage: TimerStage::Settling,
        });
    }

    fn begin_countdown(&mut self, from: Instant) {
        let remaining = self.opts.countdown_ticks;
        self.phase = CapturePhase::CountingDown { remaining };
        self.timer = Some(ArmedTimer {
            deadline: from + self.opts.tick,
            stage: TimerStage::Counting { remaining },
        });
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("camera stream released");
        }
    }
}

impl<C: Camera> Drop for CaptureSession<C> {
    fn drop(&mut self) {
        self.timer = None;
        self.release_stream();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/session.rs"]
mod tests;
