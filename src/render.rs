//! Collage compositing: plan compilation, CPU rasterization, PNG output.

pub mod blur;
pub mod composite;
pub mod cpu;
pub mod pipeline;
pub mod plan;

use crate::foundation::{
    core::{Canvas, Rgba8},
    error::{BoothError, BoothResult},
};

use self::plan::{CollagePlan, DrawOp};

/// Rendered canvas pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanvasRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

/// Executes draw ops onto a canvas.
pub trait RenderBackend {
    /// Reset the canvas to `clear`.
    fn begin(&mut self, canvas: Canvas, clear: Rgba8) -> BoothResult<()>;

    fn draw(&mut self, op: &DrawOp) -> BoothResult<()>;

    fn readback_rgba8(&mut self) -> BoothResult<CanvasRgba>;

    fn render_plan(&mut self, plan: &CollagePlan) -> BoothResult<CanvasRgba> {
        execute_plan(self, plan)
    }
}

/// Run every op of `plan` in order on a freshly cleared canvas.
#[tracing::instrument(skip_all, fields(ops = plan.ops.len()))]
pub fn execute_plan<B: RenderBackend + ?Sized>(
    backend: &mut B,
    plan: &CollagePlan,
) -> BoothResult<CanvasRgba> {
    backend.begin(plan.canvas, plan.clear)?;
    for op in &plan.ops {
        backend.draw(op)?;
    }
    let out = backend.readback_rgba8()?;
    if out.width != plan.canvas.width || out.height != plan.canvas.height {
        return Err(BoothError::validation(format!(
            "backend returned {}x{} for a {}x{} canvas",
            out.width, out.height, plan.canvas.width, plan.canvas.height
        )));
    }
    Ok(out)
}
