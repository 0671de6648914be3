//! Photobooth is a four-shot photo booth engine.
//!
//! A session walks through four screens:
//!
//! - Capture four mirrored photos through a countdown-driven [`CaptureSession`]
//! - Compose them into a 2x2 collage with [`render_collage`]
//! - Restyle them through a [`StylizationGateway`] and place them under a decorative frame
//! - Export the final PNG
//!
//! [`SessionOrchestrator`] ties the screens together.
#![forbid(unsafe_code)]

pub mod assets;
pub mod capture;
pub mod foundation;
pub mod layout;
pub mod render;
pub mod session;
pub mod stylize;

pub use crate::assets::catalog::{BackgroundKey, FrameSource, PhotoStyleKey, StyleSelection};
pub use crate::assets::decode::{Photo, RasterImage};
pub use crate::assets::frames::FrameLibrary;
pub use crate::capture::camera::{Camera, ReplayCamera, VideoFrame, VideoStream};
pub use crate::capture::session::{CaptureEvent, CaptureOpts, CapturePhase, CaptureSession};
pub use crate::foundation::config::BoothConfig;
pub use crate::foundation::core::{Canvas, Rect, Rgba8, SLOT_COUNT};
pub use crate::foundation::error::{BoothError, BoothResult};
pub use crate::layout::collage::{LayoutGeometry, LayoutParams, solve_layout};
pub use crate::render::pipeline::{CompositeResult, render_collage};
pub use crate::render::plan::{CollagePlan, CollageVariant, plan_collage};
pub use crate::session::orchestrator::{Notice, RestyleReport, Screen, SessionOrchestrator};
pub use crate::stylize::gateway::{HttpGateway, StylizationGateway};
pub use crate::stylize::service::{StyleLedger, StylizeOutcome, stylize_photo};
