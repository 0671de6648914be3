use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    assets::{
        catalog::{BackgroundKey, PhotoStyleKey, StyleSelection},
        decode::{Photo, RasterImage},
        frames::FrameLibrary,
    },
    capture::{
        camera::Camera,
        session::{CaptureOpts, CaptureSession},
    },
    foundation::{
        config::BoothConfig,
        core::SLOT_COUNT,
        error::{BoothError, BoothResult},
    },
    render::{
        pipeline::{CompositeResult, render_collage_blocking},
        plan::{CollageVariant, plan_collage},
    },
    stylize::{
        gateway::StylizationGateway,
        service::{StyleLedger, stylize_photo},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Screen {
    Home,
    Capture,
    Compose,
    Edit,
}

/// Non-fatal, user-visible message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The model refused the photo as input; the slot shows a text-only generation.
    TextOnlyFallback { slot: usize },
    /// The frame could not be loaded; the collage renders on white.
    FrameUnavailable { key: BackgroundKey, reason: String },
    /// Camera acquisition failed; the user may retry.
    CameraProblem { message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextOnlyFallback { slot } => write!(
                f,
                "photo {} was generated from the prompt alone; the model does not accept images",
                slot + 1
            ),
            Self::FrameUnavailable { key, reason } => write!(
                f,
                "frame '{}' could not be loaded ({reason}); using a white background",
                key.label()
            ),
            Self::CameraProblem { message } => write!(f, "camera problem: {message}"),
        }
    }
}

/// Outcome of restyling every photo after a style change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestyleReport {
    pub version: u64,
    pub stylized: Vec<usize>,
    pub fallbacks: Vec<usize>,
    /// Slots whose stylization failed, with the failure text.
    pub failures: Vec<(usize, String)>,
    /// Results that arrived for an outdated style and were dropped.
    pub discarded: usize,
}

impl RestyleReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.stylized.len() == SLOT_COUNT
    }
}

/// Screen flow of one booth session: Home, Capture, Compose, Edit.
pub struct SessionOrchestrator<C: Camera> {
    cfg: BoothConfig,
    screen: Screen,
    capture: CaptureSession<C>,
    gateway: Arc<dyn StylizationGateway>,
    frames: FrameLibrary,
    photos: Option<[Photo; SLOT_COUNT]>,
    /// Images the framed preview currently shows: raw captures until a style is applied.
    displayed: Option<[Photo; SLOT_COUNT]>,
    background: Option<BackgroundKey>,
    ledger: StyleLedger,
    collage: Option<CompositeResult>,
    framed: Option<CompositeResult>,
    final_image: Option<CompositeResult>,
    notices: Vec<Notice>,
}

impl<C: Camera> fmt::Debug for SessionOrchestrator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("screen", &self.screen)
            .field("capture", &self.capture)
            .field("background", &self.background)
            .field("style_version", &self.ledger.version())
            .field("notices", &self.notices.len())
            .finish()
    }
}

impl<C: Camera> SessionOrchestrator<C> {
    pub fn new(
        camera: C,
        gateway: Arc<dyn StylizationGateway>,
        cfg: BoothConfig,
    ) -> BoothResult<Self> {
        cfg.validate()?;
        let capture = CaptureSession::new(camera, CaptureOpts::from(&cfg.capture));
        let frames = FrameLibrary::from_config(&cfg);
        Ok(Self {
            cfg,
            screen: Screen::Home,
            capture,
            gateway,
            frames,
            photos: None,
            displayed: None,
            background: None,
            ledger: StyleLedger::new(),
            collage: None,
            framed: None,
            final_image: None,
            notices: Vec::new(),
        })
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn config(&self) -> &BoothConfig {
        &self.cfg
    }

    pub fn capture(&self) -> &CaptureSession<C> {
        &self.capture
    }

    /// Direct access to the countdown and retake controls.
    pub fn capture_mut(&mut self) -> &mut CaptureSession<C> {
        &mut self.capture
    }

    pub fn frames_mut(&mut self) -> &mut FrameLibrary {
        &mut self.frames
    }

    pub fn selection(&self) -> StyleSelection {
        StyleSelection {
            background: self.background,
            photo_style: self.ledger.style(),
        }
    }

    pub fn style_ledger(&self) -> &StyleLedger {
        &self.ledger
    }

    pub fn photos(&self) -> Option<&[Photo; SLOT_COUNT]> {
        self.photos.as_ref()
    }

    pub fn displayed_photos(&self) -> Option<&[Photo; SLOT_COUNT]> {
        self.displayed.as_ref()
    }

    pub fn collage(&self) -> Option<&CompositeResult> {
        self.collage.as_ref()
    }

    pub fn framed_preview(&self) -> Option<&CompositeResult> {
        self.framed.as_ref()
    }

    pub fn final_image(&self) -> Option<&CompositeResult> {
        self.final_image.as_ref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Home -> Capture with a fresh session. Camera errors are returned and noted, but the
    /// screen still switches so the user can retry.
    #[tracing::instrument(skip(self))]
    pub async fn start(&mut self) -> BoothResult<()> {
        self.expect_screen(Screen::Home, "start")?;
        self.capture.reset();
        self.clear_results();
        self.screen = Screen::Capture;
        self.start_camera().await
    }

    pub async fn retry_camera(&mut self) -> BoothResult<()> {
        self.expect_screen(Screen::Capture, "retry the camera")?;
        self.start_camera().await
    }

    /// Run the countdown until the current slot holds a photo.
    pub async fn capture_next(&mut self) -> BoothResult<usize> {
        self.expect_screen(Screen::Capture, "capture")?;
        self.capture.run_until_captured().await
    }

    /// Keep the current photo. After the fourth one, moves to Compose and returns `true`.
    pub fn keep_photo(&mut self) -> BoothResult<bool> {
        self.expect_screen(Screen::Capture, "keep a photo")?;
        if !self.capture.advance_slot()? {
            return Ok(false);
        }
        let Some(photos) = self.capture.completed_photos() else {
            return Err(BoothError::ComposeNotReady {
                filled: self.capture.filled_count(),
            });
        };
        self.clear_results();
        self.displayed = Some(photos.clone());
        self.photos = Some(photos);
        self.screen = Screen::Compose;
        tracing::info!("all photos captured");
        Ok(true)
    }

    /// Render the margin-free collage of the four raw captures.
    #[tracing::instrument(skip(self))]
    pub async fn compose_preview(&mut self) -> BoothResult<CompositeResult> {
        let images = match &self.photos {
            Some(photos) => rasters(photos),
            None => self
                .capture
                .slots()
                .iter()
                .map(|s| s.as_ref().map(|p| p.image.clone()))
                .collect(),
        };
        let plan = plan_collage(
            &self.cfg.collage,
            CollageVariant::Preview,
            &images,
            None,
            (0.0, 0.0),
        )?;
        let out = render_collage_blocking(plan).await?;
        self.collage = Some(out.clone());
        Ok(out)
    }

    /// Compose -> Edit, rendering the framed preview with the default background.
    pub async fn open_editor(&mut self) -> BoothResult<CompositeResult> {
        self.expect_screen(Screen::Compose, "open the editor")?;
        self.require_photos()?;
        self.screen = Screen::Edit;
        self.background = self.cfg.default_background;
        self.render_framed_preview().await
    }

    /// Switch the background and re-render the framed preview.
    pub async fn select_background(
        &mut self,
        key: Option<BackgroundKey>,
    ) -> BoothResult<CompositeResult> {
        self.expect_screen(Screen::Edit, "select a background")?;
        self.background = key;
        self.render_framed_preview().await
    }

    /// Change the photo style, invalidating every stylized result. Returns the new version.
    pub fn set_photo_style(&mut self, key: Option<PhotoStyleKey>) -> u64 {
        tracing::info!(style = ?key, "photo style selected");
        self.ledger.select(key)
    }

    /// Change the style and restyle every photo, one at a time in slot order.
    ///
    /// Per-slot failures are collected rather than returned.
    #[tracing::instrument(skip(self))]
    pub async fn select_photo_style(
        &mut self,
        key: Option<PhotoStyleKey>,
    ) -> BoothResult<RestyleReport> {
        let version = self.set_photo_style(key);
        let photos = self.require_photos()?.clone();
        let mut report = RestyleReport {
            version,
            ..RestyleReport::default()
        };
        for (slot, photo) in photos.iter().enumerate() {
            let Some(ticket) = self.ledger.ticket(slot) else {
                break;
            };
            match stylize_photo(self.gateway.as_ref(), photo, ticket.style).await {
                Ok(outcome) => {
                    if outcome.fallback {
                        report.fallbacks.push(slot);
                        self.notices.push(Notice::TextOnlyFallback { slot });
                    }
                    if self.ledger.commit(ticket, outcome.photo) {
                        report.stylized.push(slot);
                    } else {
                        report.discarded += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(slot, error = %err, "restyle failed");
                    report.failures.push((slot, err.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Stylize all four photos (reusing current results) and render the final image.
    ///
    /// Any slot failure aborts with [`BoothError::Stylization`]; the displayed images and
    /// the previous final image stay as they were.
    #[tracing::instrument(skip(self))]
    pub async fn apply_style(&mut self) -> BoothResult<CompositeResult> {
        self.expect_screen(Screen::Edit, "apply a style")?;
        let photos = self.require_photos()?.clone();
        let style = self.ledger.style().filter(|s| !s.is_passthrough());

        let mut styled = Vec::with_capacity(SLOT_COUNT);
        for (slot, photo) in photos.iter().enumerate() {
            let Some(style) = style else {
                styled.push(photo.clone());
                continue;
            };
            if let Some(done) = self.ledger.result(slot) {
                styled.push(done.clone());
                continue;
            }
            let ticket = self
                .ledger
                .ticket(slot)
                .ok_or_else(|| BoothError::validation("no photo style selected"))?;
            let outcome = stylize_photo(self.gateway.as_ref(), photo, style)
                .await
                .map_err(|e| e.for_slot(slot))?;
            if outcome.fallback {
                self.notices.push(Notice::TextOnlyFallback { slot });
            }
            self.ledger.commit(ticket, outcome.photo.clone());
            styled.push(outcome.photo);
        }

        let styled: [Photo; SLOT_COUNT] = styled.try_into().map_err(|v: Vec<Photo>| {
            BoothError::ComposeNotReady { filled: v.len() }
        })?;
        let out = self.render_framed(&rasters(&styled)).await?;
        self.displayed = Some(styled);
        self.framed = Some(out.clone());
        self.final_image = Some(out.clone());
        tracing::info!("final image rendered");
        Ok(out)
    }

    /// Step back one screen. Compose -> Capture re-acquires the camera with every slot kept.
    #[tracing::instrument(skip(self))]
    pub async fn back(&mut self) -> BoothResult<Screen> {
        match self.screen {
            Screen::Home => {}
            Screen::Capture => {
                self.capture.stop_camera();
                self.screen = Screen::Home;
            }
            Screen::Compose => {
                self.screen = Screen::Capture;
                self.photos = None;
                self.clear_results();
                if let Err(err) = self.capture.reopen().await {
                    self.note_camera_error(&err);
                    return Err(err);
                }
            }
            Screen::Edit => {
                self.screen = Screen::Compose;
            }
        }
        Ok(self.screen)
    }

    /// Write the best available image (final, framed preview, collage) into `dir`.
    pub fn export(&self, dir: &Path) -> BoothResult<PathBuf> {
        let best = self
            .final_image
            .as_ref()
            .or(self.framed.as_ref())
            .or(self.collage.as_ref())
            .ok_or_else(|| BoothError::validation("nothing has been rendered yet"))?;
        let path = best.write_to(dir, &self.cfg.export_file_name)?;
        tracing::info!(path = %path.display(), "collage exported");
        Ok(path)
    }

    async fn start_camera(&mut self) -> BoothResult<()> {
        match self.capture.start_camera().await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.note_camera_error(&err);
                Err(err)
            }
        }
    }

    fn note_camera_error(&mut self, err: &BoothError) {
        if err.is_camera_error() {
            self.notices.push(Notice::CameraProblem {
                message: err.to_string(),
            });
        }
    }

    async fn render_framed_preview(&mut self) -> BoothResult<CompositeResult> {
        let shown = self
            .displayed
            .as_ref()
            .or(self.photos.as_ref())
            .ok_or(BoothError::ComposeNotReady { filled: 0 })?;
        let images = rasters(shown);
        let out = self.render_framed(&images).await?;
        self.framed = Some(out.clone());
        Ok(out)
    }

    async fn render_framed(
        &mut self,
        images: &[Option<RasterImage>],
    ) -> BoothResult<CompositeResult> {
        let key = self.background;
        let frame = match key {
            Some(key) => self.load_frame(key).await,
            None => None,
        };
        let plan = plan_collage(
            &self.cfg.collage,
            CollageVariant::Framed,
            images,
            frame.as_ref(),
            self.cfg.frame_offset(key),
        )?;
        render_collage_blocking(plan).await
    }

    async fn load_frame(&mut self, key: BackgroundKey) -> Option<RasterImage> {
        match self.frames.resolve(key, self.gateway.as_ref()).await {
            Ok(img) => Some(img),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "frame unavailable, rendering on white");
                self.notices.push(Notice::FrameUnavailable {
                    key,
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    fn require_photos(&self) -> BoothResult<&[Photo; SLOT_COUNT]> {
        self.photos.as_ref().ok_or(BoothError::ComposeNotReady {
            filled: self.capture.filled_count(),
        })
    }

    fn expect_screen(&self, want: Screen, action: &str) -> BoothResult<()> {
        if self.screen != want {
            return Err(BoothError::validation(format!(
                "cannot {action} on the {:?} screen",
                self.screen
            )));
        }
        Ok(())
    }

    fn clear_results(&mut self) {
        self.displayed = None;
        self.collage = None;
        self.framed = None;
        self.final_image = None;
        self.ledger.invalidate();
    }
}

fn rasters(photos: &[Photo]) -> Vec<Option<RasterImage>> {
    photos.iter().map(|p| Some(p.image.clone())).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/session/orchestrator.rs"]
mod tests;
