use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    assets::{
        catalog::{BackgroundKey, FrameSource},
        decode::{RasterImage, decode_image},
    },
    foundation::{
        config::BoothConfig,
        error::{BoothError, BoothResult},
    },
    stylize::gateway::StylizationGateway,
};

/// Decoded background frames, keyed by [`BackgroundKey`].
///
/// Frames are resolved lazily and cached for the lifetime of the library, so switching back
/// and forth between backgrounds only pays the load once.
#[derive(Debug)]
pub struct FrameLibrary {
    root: PathBuf,
    sources: BTreeMap<BackgroundKey, FrameSource>,
    cache: HashMap<BackgroundKey, RasterImage>,
}

impl FrameLibrary {
    pub fn new(root: impl Into<PathBuf>, sources: BTreeMap<BackgroundKey, FrameSource>) -> Self {
        Self {
            root: root.into(),
            sources,
            cache: HashMap::new(),
        }
    }

    pub fn from_config(cfg: &BoothConfig) -> Self {
        let sources = cfg
            .frames
            .iter()
            .map(|(k, f)| (*k, f.source.clone()))
            .collect();
        Self::new(cfg.assets_root.clone(), sources)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Seed the cache with an already-decoded frame.
    pub fn insert(&mut self, key: BackgroundKey, image: RasterImage) {
        self.cache.insert(key, image);
    }

    pub fn cached(&self, key: BackgroundKey) -> Option<&RasterImage> {
        self.cache.get(&key)
    }

    /// Return the frame for `key`, loading it on first use.
    #[tracing::instrument(skip(self, gateway), fields(key = %key))]
    pub async fn resolve(
        &mut self,
        key: BackgroundKey,
        gateway: &dyn StylizationGateway,
    ) -> BoothResult<RasterImage> {
        if let Some(img) = self.cache.get(&key) {
            return Ok(img.clone());
        }
        let source = self.sources.get(&key).cloned().ok_or_else(|| {
            BoothError::validation(format!("no frame source configured for '{key}'"))
        })?;

        let image = match source {
            FrameSource::Asset(rel) => {
                let path = self.resolve_path(&rel);
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("read frame asset '{}'", path.display()))?;
                decode_image(&bytes)?
            }
            FrameSource::Prompt(prompt) => {
                let resp = gateway.generate(&prompt, 1).await?;
                resp.first_photo()?.image
            }
        };
        tracing::debug!(width = image.width, height = image.height, "frame loaded");
        self.cache.insert(key, image.clone());
        Ok(image)
    }

    fn resolve_path(&self, rel: &Path) -> PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/frames.rs"]
mod tests;
