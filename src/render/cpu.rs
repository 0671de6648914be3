use std::sync::Arc;

use crate::{
    assets::decode::RasterImage,
    foundation::{
        core::{Affine, BezPath, Canvas, Rect, Rgba8},
        error::{BoothError, BoothResult},
    },
    render::{
        CanvasRgba, RenderBackend,
        blur::blur_rgba8_premul,
        composite::over_at,
        plan::DrawOp,
    },
};

/// CPU raster backend on `vello_cpu`.
///
/// Every op is rasterized into its own transparent layer sized to the op's bounds and then
/// composited over the canvas, so clip and blur state never leak between ops.
#[derive(Debug, Default)]
pub struct CpuBackend {
    surface: Option<Surface>,
}

#[derive(Debug)]
struct Surface {
    canvas: Canvas,
    data: Vec<u8>,
}

/// Pixel-aligned region of the canvas an op draws into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LayerBounds {
    x: i32,
    y: i32,
    width: u16,
    height: u16,
}

impl LayerBounds {
    fn around(rect: Rect, pad: f64, canvas: Canvas) -> Option<Self> {
        let r = rect.inflate(pad, pad).expand();
        if r.intersect(canvas.rect()).area() <= 0.0 {
            return None;
        }
        let width = u16::try_from(r.width() as i64).ok()?;
        let height = u16::try_from(r.height() as i64).ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x: r.x0 as i32,
            y: r.y0 as i32,
            width,
            height,
        })
    }

    fn origin(self) -> Affine {
        Affine::translate((-f64::from(self.x), -f64::from(self.y)))
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn canvas(&self) -> BoothResult<Canvas> {
        self.surface
            .as_ref()
            .map(|s| s.canvas)
            .ok_or_else(|| BoothError::validation("draw before the canvas was initialized"))
    }

    fn surface_mut(&mut self) -> BoothResult<&mut Surface> {
        self.surface
            .as_mut()
            .ok_or_else(|| BoothError::validation("draw before the canvas was initialized"))
    }

    fn composite_layer(&mut self, bounds: LayerBounds, layer: &[u8]) -> BoothResult<()> {
        let surface = self.surface_mut()?;
        over_at(
            &mut surface.data,
            surface.canvas.width,
            surface.canvas.height,
            layer,
            u32::from(bounds.width),
            u32::from(bounds.height),
            bounds.x,
            bounds.y,
        )
    }

    fn draw_shadow(
        &mut self,
        rect: Rect,
        corner_radius: f64,
        blur_radius: u32,
        color: Rgba8,
    ) -> BoothResult<()> {
        let canvas = self.canvas()?;
        let Some(bounds) = LayerBounds::around(rect, f64::from(blur_radius) + 1.0, canvas) else {
            return Ok(());
        };
        let mut ctx = vello_cpu::RenderContext::new(bounds.width, bounds.height);
        ctx.set_transform(affine_to_cpu(bounds.origin()));
        let Rgba8 { r, g, b, a } = color;
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_path(&bezpath_to_cpu(&rounded_path(rect, corner_radius)));
        let layer = flush_layer(&mut ctx, bounds);

        let sigma = (blur_radius as f32 / 2.0).max(f32::EPSILON);
        let blurred = blur_rgba8_premul(
            &layer,
            u32::from(bounds.width),
            u32::from(bounds.height),
            blur_radius,
            sigma,
        )?;
        self.composite_layer(bounds, &blurred)
    }

    fn draw_photo(
        &mut self,
        image: &RasterImage,
        src: Rect,
        dst: Rect,
        corner_radius: f64,
    ) -> BoothResult<()> {
        if src.width() <= 0.0 || src.height() <= 0.0 {
            return Err(BoothError::validation("photo source rect is empty"));
        }
        let Some(bounds) = LayerBounds::around(dst, 0.0, self.canvas()?) else {
            return Ok(());
        };
        let paint_transform = Affine::translate(dst.origin().to_vec2())
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate(-src.origin().to_vec2());

        let mut ctx = vello_cpu::RenderContext::new(bounds.width, bounds.height);
        ctx.set_transform(affine_to_cpu(bounds.origin()));
        ctx.set_paint_transform(affine_to_cpu(paint_transform));
        ctx.set_paint(image_paint(image)?);
        ctx.fill_path(&bezpath_to_cpu(&rounded_path(dst, corner_radius)));
        let layer = flush_layer(&mut ctx, bounds);
        self.composite_layer(bounds, &layer)
    }

    fn draw_frame(&mut self, image: &RasterImage, dst: Rect) -> BoothResult<()> {
        let canvas = self.canvas()?;
        let Some(bounds) = LayerBounds::around(canvas.rect(), 0.0, canvas) else {
            return Ok(());
        };
        let transform = Affine::translate(dst.origin().to_vec2())
            * Affine::scale_non_uniform(
                dst.width() / f64::from(image.width),
                dst.height() / f64::from(image.height),
            );

        let mut ctx = vello_cpu::RenderContext::new(bounds.width, bounds.height);
        ctx.set_transform(affine_to_cpu(bounds.origin() * transform));
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(image_paint(image)?);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        ));
        let layer = flush_layer(&mut ctx, bounds);
        self.composite_layer(bounds, &layer)
    }
}

impl RenderBackend for CpuBackend {
    fn begin(&mut self, canvas: Canvas, clear: Rgba8) -> BoothResult<()> {
        let px = clear.to_premul();
        self.surface = Some(Surface {
            canvas,
            data: px.repeat(canvas.width as usize * canvas.height as usize),
        });
        Ok(())
    }

    fn draw(&mut self, op: &DrawOp) -> BoothResult<()> {
        match op {
            DrawOp::Shadow {
                rect,
                corner_radius,
                blur_radius,
                color,
                ..
            } => self.draw_shadow(*rect, *corner_radius, *blur_radius, *color),
            DrawOp::Photo {
                image,
                src,
                dst,
                corner_radius,
                ..
            } => self.draw_photo(image, *src, *dst, *corner_radius),
            DrawOp::Frame { image, dst } => self.draw_frame(image, *dst),
        }
    }

    fn readback_rgba8(&mut self) -> BoothResult<CanvasRgba> {
        let surface = self
            .surface
            .take()
            .ok_or_else(|| BoothError::validation("readback before the canvas was initialized"))?;
        Ok(CanvasRgba {
            width: surface.canvas.width,
            height: surface.canvas.height,
            data: surface.data,
            premultiplied: true,
        })
    }
}

fn flush_layer(ctx: &mut vello_cpu::RenderContext, bounds: LayerBounds) -> Vec<u8> {
    let mut pixmap = vello_cpu::Pixmap::new(bounds.width, bounds.height);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    pixmap.data_as_u8_slice().to_vec()
}

fn rounded_path(rect: Rect, radius: f64) -> BezPath {
    use kurbo::Shape as _;

    let radius = radius
        .min(rect.width() / 2.0)
        .min(rect.height() / 2.0)
        .max(0.0);
    rect.to_rounded_rect(radius).to_path(0.1)
}

fn image_paint(image: &RasterImage) -> BoothResult<vello_cpu::Image> {
    let pixmap = premul_bytes_to_pixmap(&image.rgba8_premul, image.width, image.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> BoothResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| BoothError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| BoothError::validation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(BoothError::validation("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let pixels: Vec<_> = rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect();

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
