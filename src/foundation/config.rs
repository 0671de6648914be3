use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    assets::catalog::{BackgroundKey, FrameSource},
    foundation::core::Canvas,
    foundation::error::{BoothError, BoothResult},
};

/// Environment variable overriding [`GatewayConfig::base_url`].
pub const ENV_GATEWAY_URL: &str = "PHOTOBOOTH_GATEWAY_URL";
/// Environment variable overriding [`GatewayConfig::model`].
pub const ENV_GATEWAY_MODEL: &str = "PHOTOBOOTH_GATEWAY_MODEL";
/// Environment variable overriding [`GatewayConfig::timeout_secs`].
pub const ENV_GATEWAY_TIMEOUT_SECS: &str = "PHOTOBOOTH_GATEWAY_TIMEOUT_SECS";
/// Environment variable overriding [`BoothConfig::assets_root`].
pub const ENV_ASSETS_ROOT: &str = "PHOTOBOOTH_ASSETS_ROOT";

/// Complete runtime configuration.
///
/// Every field has a default, so a partial JSON document (or `{}`) is a valid config.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoothConfig {
    pub collage: CollageConfig,
    pub capture: CaptureConfig,
    pub gateway: GatewayConfig,
    /// Directory that relative frame asset paths resolve against.
    pub assets_root: PathBuf,
    pub frames: BTreeMap<BackgroundKey, FrameConfig>,
    /// Background selected when the editor opens.
    pub default_background: Option<BackgroundKey>,
    pub export_file_name: String,
}

impl Default for BoothConfig {
    fn default() -> Self {
        let frames = BackgroundKey::ALL
            .into_iter()
            .map(|key| (key, FrameConfig::for_key(key)))
            .collect();
        Self {
            collage: CollageConfig::default(),
            capture: CaptureConfig::default(),
            gateway: GatewayConfig::default(),
            assets_root: PathBuf::from("."),
            frames,
            default_background: Some(BackgroundKey::FreshJapanese),
            export_file_name: "photobooth.png".to_string(),
        }
    }
}

/// Collage canvas and cell styling.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CollageConfig {
    pub width: u32,
    pub height: u32,
    pub gap: f64,
    /// Height reserved below the grid.
    pub bottom_band: f64,
    /// Outer margin of the framed variant (the preview variant has none).
    pub framed_margin: f64,
    /// Cell scale factor of the framed variant, in `(0, 1]`.
    pub framed_scale: f64,
    pub corner_radius: f64,
    pub shadow: ShadowConfig,
}

impl Default for CollageConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1800,
            gap: 20.0,
            bottom_band: 60.0,
            framed_margin: 60.0,
            framed_scale: 0.8,
            corner_radius: 16.0,
            shadow: ShadowConfig::default(),
        }
    }
}

impl CollageConfig {
    pub fn canvas(&self) -> BoothResult<Canvas> {
        Canvas::new(self.width, self.height)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Blur radius in pixels; the Gaussian sigma is half of it.
    pub blur_radius: u32,
    pub offset_y: f64,
    /// Opacity of the black shadow color in `[0, 1]`.
    pub alpha: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            blur_radius: 12,
            offset_y: 6.0,
            alpha: 0.18,
        }
    }
}

/// Countdown timing, in whole ticks and milliseconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub countdown_ticks: u8,
    pub tick_ms: u64,
    /// Delay before an automatic countdown starts on an empty slot.
    pub settle_ms: u64,
    /// Delay before the countdown restarts after a retake with a live stream.
    pub retake_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 5,
            tick_ms: 1000,
            settle_ms: 500,
            retake_ms: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            model: "imagen-4.0-generate-001".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Where a background frame comes from and how the photo grid aligns with its cutouts.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameConfig {
    pub source: FrameSource,
    /// Horizontal calibration offset applied to every cell.
    #[serde(default)]
    pub offset_x: f64,
    /// Vertical calibration offset applied to every cell.
    #[serde(default)]
    pub offset_y: f64,
}

impl FrameConfig {
    // The stock frame art places its cutouts 4px right of and 70px below the centered grid.
    const STOCK_OFFSET_X: f64 = 4.0;
    const STOCK_OFFSET_Y: f64 = 70.0;

    pub fn for_key(key: BackgroundKey) -> Self {
        Self {
            source: FrameSource::Asset(PathBuf::from(key.default_asset_path())),
            offset_x: Self::STOCK_OFFSET_X,
            offset_y: Self::STOCK_OFFSET_Y,
        }
    }
}

impl BoothConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn from_json_path(path: &Path) -> BoothResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| BoothError::config(format!("parse '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `PHOTOBOOTH_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> BoothResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> BoothResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_GATEWAY_URL).filter(|v| !v.trim().is_empty()) {
            self.gateway.base_url = url.trim().to_string();
        }
        if let Some(model) = lookup(ENV_GATEWAY_MODEL).filter(|v| !v.trim().is_empty()) {
            self.gateway.model = model.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_GATEWAY_TIMEOUT_SECS) {
            self.gateway.timeout_secs = raw.trim().parse::<u64>().map_err(|_| {
                BoothError::config(format!("{ENV_GATEWAY_TIMEOUT_SECS} must be an integer"))
            })?;
        }
        if let Some(root) = lookup(ENV_ASSETS_ROOT).filter(|v| !v.trim().is_empty()) {
            self.assets_root = PathBuf::from(root);
        }
        self.validate()
    }

    pub fn validate(&self) -> BoothResult<()> {
        let c = &self.collage;
        c.canvas()
            .map_err(|e| BoothError::config(format!("collage canvas: {e}")))?;
        if !c.gap.is_finite() || c.gap < 0.0 {
            return Err(BoothError::config("collage.gap must be >= 0"));
        }
        if !c.bottom_band.is_finite() || c.bottom_band < 0.0 {
            return Err(BoothError::config("collage.bottom_band must be >= 0"));
        }
        if !c.framed_margin.is_finite() || c.framed_margin < 0.0 {
            return Err(BoothError::config("collage.framed_margin must be >= 0"));
        }
        if !(c.framed_scale > 0.0 && c.framed_scale <= 1.0) {
            return Err(BoothError::config("collage.framed_scale must be in (0, 1]"));
        }
        if !c.corner_radius.is_finite() || c.corner_radius < 0.0 {
            return Err(BoothError::config("collage.corner_radius must be >= 0"));
        }
        if !(0.0..=1.0).contains(&c.shadow.alpha) {
            return Err(BoothError::config("collage.shadow.alpha must be in [0, 1]"));
        }
        if !c.shadow.offset_y.is_finite() {
            return Err(BoothError::config("collage.shadow.offset_y must be finite"));
        }
        if self.capture.countdown_ticks == 0 {
            return Err(BoothError::config("capture.countdown_ticks must be > 0"));
        }
        if self.gateway.base_url.trim().is_empty() {
            return Err(BoothError::config("gateway.base_url must not be empty"));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(BoothError::config("gateway.timeout_secs must be > 0"));
        }
        if self.export_file_name.trim().is_empty() {
            return Err(BoothError::config("export_file_name must not be empty"));
        }
        for (key, frame) in &self.frames {
            if !frame.offset_x.is_finite() || !frame.offset_y.is_finite() {
                return Err(BoothError::config(format!(
                    "frames.{}: calibration offsets must be finite",
                    key.slug()
                )));
            }
        }
        Ok(())
    }

    /// Calibration offset for a background, zero when none is selected or configured.
    pub fn frame_offset(&self, key: Option<BackgroundKey>) -> (f64, f64) {
        key.and_then(|k| self.frames.get(&k))
            .map(|f| (f.offset_x, f.offset_y))
            .unwrap_or((0.0, 0.0))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
