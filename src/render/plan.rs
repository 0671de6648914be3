use crate::{
    assets::decode::RasterImage,
    foundation::{
        config::CollageConfig,
        core::{Canvas, PHOTO_ASPECT, Rect, Rgba8, SLOT_COUNT, Vec2},
        error::{BoothError, BoothResult},
    },
    layout::collage::{LayoutParams, cover_crop, cover_rect, solve_layout},
};

/// Which of the two collage layouts to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollageVariant {
    /// Edge-to-edge grid, no frame.
    Preview,
    /// Inset grid under a decorative frame.
    Framed,
}

/// Per-cell decoration shared by all four photos.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellStyle {
    pub corner_radius: f64,
    pub shadow_offset_y: f64,
    pub shadow_blur_radius: u32,
    pub shadow_color: Rgba8,
}

impl From<&CollageConfig> for CellStyle {
    fn from(cfg: &CollageConfig) -> Self {
        let alpha = (cfg.shadow.alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            corner_radius: cfg.corner_radius,
            shadow_offset_y: cfg.shadow.offset_y,
            shadow_blur_radius: cfg.shadow.blur_radius,
            shadow_color: Rgba8::new(0, 0, 0, alpha),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Blurred rounded silhouette beneath a cell.
    Shadow {
        slot: usize,
        rect: Rect,
        corner_radius: f64,
        blur_radius: u32,
        color: Rgba8,
    },
    /// `src` of `image` scaled into `dst`, clipped to a rounded rectangle.
    Photo {
        slot: usize,
        image: RasterImage,
        src: Rect,
        dst: Rect,
        corner_radius: f64,
    },
    /// Full image scaled into `dst`, drawn above everything else.
    Frame { image: RasterImage, dst: Rect },
}

/// Ordered draw ops for one collage, executed onto a cleared canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct CollagePlan {
    pub canvas: Canvas,
    pub clear: Rgba8,
    pub ops: Vec<DrawOp>,
}

/// Build the draw list for four photos and an optional frame.
///
/// Fails with [`BoothError::ComposeNotReady`] unless all four slots hold an image, before
/// any op is produced.
pub fn compile_collage(
    layout: &LayoutParams,
    style: &CellStyle,
    photos: &[Option<RasterImage>],
    frame: Option<&RasterImage>,
) -> BoothResult<CollagePlan> {
    let filled = photos.iter().filter(|p| p.is_some()).count();
    if filled < SLOT_COUNT || photos.len() != SLOT_COUNT {
        return Err(BoothError::ComposeNotReady { filled });
    }
    let geometry = solve_layout(layout)?;

    let mut ops = Vec::with_capacity(2 * SLOT_COUNT + 1);
    for (slot, image) in photos.iter().enumerate() {
        let Some(image) = image else {
            return Err(BoothError::ComposeNotReady { filled });
        };
        let dst = geometry.cell_rect(slot);
        if style.shadow_color.a > 0 {
            ops.push(DrawOp::Shadow {
                slot,
                rect: dst + Vec2::new(0.0, style.shadow_offset_y),
                corner_radius: style.corner_radius,
                blur_radius: style.shadow_blur_radius,
                color: style.shadow_color,
            });
        }
        ops.push(DrawOp::Photo {
            slot,
            image: image.clone(),
            src: cover_crop(image.width, image.height, PHOTO_ASPECT)?,
            dst,
            corner_radius: style.corner_radius,
        });
    }
    if let Some(frame) = frame {
        ops.push(DrawOp::Frame {
            image: frame.clone(),
            dst: cover_rect(frame.width, frame.height, layout.canvas.rect())?,
        });
    }

    Ok(CollagePlan {
        canvas: layout.canvas,
        clear: Rgba8::WHITE,
        ops,
    })
}

/// Compile a collage of the given variant straight from configuration.
///
/// `offset` is the frame calibration; it only applies to the framed variant.
pub fn plan_collage(
    cfg: &CollageConfig,
    variant: CollageVariant,
    photos: &[Option<RasterImage>],
    frame: Option<&RasterImage>,
    offset: (f64, f64),
) -> BoothResult<CollagePlan> {
    let layout = match variant {
        CollageVariant::Preview => LayoutParams::preview(cfg)?,
        CollageVariant::Framed => LayoutParams::framed(cfg, offset)?,
    };
    let frame = match variant {
        CollageVariant::Preview => None,
        CollageVariant::Framed => frame,
    };
    compile_collage(&layout, &CellStyle::from(cfg), photos, frame)
}

#[cfg(test)]
#[path = "../../tests/unit/render/plan.rs"]
mod tests;
