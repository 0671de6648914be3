use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    assets::decode::encode_png_straight,
    foundation::error::{BoothError, BoothResult},
    render::{CanvasRgba, RenderBackend, cpu::CpuBackend, plan::CollagePlan},
};

/// An encoded collage. Each render produces a fresh one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeResult {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl CompositeResult {
    /// Write the PNG to `dir/file_name`, creating `dir` if needed.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> BoothResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        let path = dir.join(file_name);
        std::fs::write(&path, &self.png)
            .with_context(|| format!("write collage '{}'", path.display()))?;
        Ok(path)
    }
}

/// Encode rendered pixels as PNG, un-premultiplying first when needed.
pub fn encode_canvas_png(canvas: &CanvasRgba) -> BoothResult<Vec<u8>> {
    if canvas.premultiplied {
        let mut straight = canvas.data.clone();
        crate::assets::decode::unpremultiply_rgba8_in_place(&mut straight);
        encode_png_straight(canvas.width, canvas.height, &straight)
    } else {
        encode_png_straight(canvas.width, canvas.height, &canvas.data)
    }
}

/// Render `plan` on `backend` and encode the result.
pub fn render_with(
    backend: &mut dyn RenderBackend,
    plan: &CollagePlan,
) -> BoothResult<CompositeResult> {
    let canvas = backend.render_plan(plan)?;
    let png = encode_canvas_png(&canvas)?;
    Ok(CompositeResult {
        width: canvas.width,
        height: canvas.height,
        png,
    })
}

/// Render `plan` on a fresh CPU backend.
pub fn render_collage(plan: &CollagePlan) -> BoothResult<CompositeResult> {
    render_with(&mut CpuBackend::new(), plan)
}

/// [`render_collage`] on tokio's blocking pool.
pub async fn render_collage_blocking(plan: CollagePlan) -> BoothResult<CompositeResult> {
    tokio::task::spawn_blocking(move || render_collage(&plan))
        .await
        .map_err(|e| BoothError::Other(anyhow::anyhow!("render task failed: {e}")))?
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
