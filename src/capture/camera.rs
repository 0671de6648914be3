use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Context;

use crate::foundation::error::{BoothError, BoothResult};

/// One straight-alpha RGBA8 video frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> BoothResult<Self> {
        if width == 0 || height == 0 || rgba.len() != width as usize * height as usize * 4 {
            return Err(BoothError::validation(format!(
                "video frame {width}x{height} does not match {} bytes",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Left-right mirror, the way a front camera preview is shown to the subject.
    pub fn mirrored(self) -> BoothResult<Self> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.rgba)
            .ok_or_else(|| BoothError::validation("video frame buffer does not match size"))?;
        let flipped = image::imageops::flip_horizontal(&img);
        Ok(Self {
            width: self.width,
            height: self.height,
            rgba: flipped.into_raw(),
        })
    }
}

/// Source of live video streams.
///
/// `open` maps platform failures to the camera variants of [`BoothError`].
#[async_trait::async_trait]
pub trait Camera: Send {
    type Stream: VideoStream;

    async fn open(&mut self) -> BoothResult<Self::Stream>;
}

/// A granted, exclusively owned video stream.
pub trait VideoStream: Send {
    /// Current frame of the stream.
    fn grab_frame(&mut self) -> BoothResult<VideoFrame>;

    /// Release the device. Idempotent.
    fn stop(&mut self);
}

/// Camera that plays back a fixed list of stills, one per grab, cycling.
#[derive(Clone, Debug)]
pub struct ReplayCamera {
    frames: Arc<Vec<VideoFrame>>,
    cursor: Arc<AtomicUsize>,
}

impl ReplayCamera {
    pub fn new(frames: Vec<VideoFrame>) -> BoothResult<Self> {
        if frames.is_empty() {
            return Err(BoothError::CameraNotFound(
                "replay camera has no frames".to_string(),
            ));
        }
        Ok(Self {
            frames: Arc::new(frames),
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Load stills from image files.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> BoothResult<Self> {
        let mut frames = Vec::with_capacity(paths.len());
        for p in paths {
            let p = p.as_ref();
            let bytes =
                std::fs::read(p).with_context(|| format!("read still '{}'", p.display()))?;
            let rgba = image::load_from_memory(&bytes)
                .map_err(|e| BoothError::decode(format!("decode '{}': {e}", p.display())))?
                .to_rgba8();
            let (w, h) = rgba.dimensions();
            frames.push(VideoFrame::new(w, h, rgba.into_raw())?);
        }
        Self::new(frames)
    }

    /// Number of frames grabbed so far across all streams.
    pub fn grabs(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Camera for ReplayCamera {
    type Stream = ReplayStream;

    async fn open(&mut self) -> BoothResult<Self::Stream> {
        Ok(ReplayStream {
            frames: Arc::clone(&self.frames),
            cursor: Arc::clone(&self.cursor),
            live: true,
        })
    }
}

#[derive(Debug)]
pub struct ReplayStream {
    frames: Arc<Vec<VideoFrame>>,
    cursor: Arc<AtomicUsize>,
    live: bool,
}

impl VideoStream for ReplayStream {
    fn grab_frame(&mut self) -> BoothResult<VideoFrame> {
        if !self.live {
            return Err(BoothError::CameraUnavailable(
                "stream already stopped".to_string(),
            ));
        }
        let i = self.cursor.fetch_add(1, Ordering::SeqCst) % self.frames.len();
        Ok(self.frames[i].clone())
    }

    fn stop(&mut self) {
        self.live = false;
    }
}
