use crate::foundation::{
    config::CollageConfig,
    core::{Canvas, GRID_COLUMNS, GRID_ROWS, PHOTO_ASPECT, Rect, SLOT_COUNT, Vec2},
    error::{BoothError, BoothResult},
};

/// Inputs of the 2x2 collage layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    pub canvas: Canvas,
    pub gap: f64,
    /// Height reserved below the grid.
    pub bottom_band: f64,
    /// Cell width / height.
    pub aspect: f64,
    pub margin: f64,
    /// Fraction of the largest fitting cell actually used, in `(0, 1]`.
    pub scale: f64,
    /// Calibration shift applied to every cell.
    pub offset: Vec2,
}

impl LayoutParams {
    /// Margin-free layout used for the compose preview.
    pub fn preview(cfg: &CollageConfig) -> BoothResult<Self> {
        Ok(Self {
            canvas: cfg.canvas()?,
            gap: cfg.gap,
            bottom_band: cfg.bottom_band,
            aspect: PHOTO_ASPECT,
            margin: 0.0,
            scale: 1.0,
            offset: Vec2::ZERO,
        })
    }

    /// Inset, scaled layout used under a decorative frame.
    pub fn framed(cfg: &CollageConfig, offset: (f64, f64)) -> BoothResult<Self> {
        Ok(Self {
            canvas: cfg.canvas()?,
            gap: cfg.gap,
            bottom_band: cfg.bottom_band,
            aspect: PHOTO_ASPECT,
            margin: cfg.framed_margin,
            scale: cfg.framed_scale,
            offset: Vec2::new(offset.0, offset.1),
        })
    }
}

/// Solved cell geometry. Cells are `cell_width x cell_height`, row-major.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutGeometry {
    pub cell_width: f64,
    pub cell_height: f64,
    pub start_x: f64,
    pub start_y: f64,
    pub gap: f64,
    pub offset: Vec2,
}

impl LayoutGeometry {
    /// Destination rectangle of `slot` (0..4, row-major).
    pub fn cell_rect(&self, slot: usize) -> Rect {
        let row = (slot / GRID_COLUMNS) as f64;
        let col = (slot % GRID_COLUMNS) as f64;
        let x = self.start_x + col * (self.cell_width + self.gap) + self.offset.x;
        let y = self.start_y + row * (self.cell_height + self.gap) + self.offset.y;
        Rect::new(x, y, x + self.cell_width, y + self.cell_height)
    }

    pub fn cells(&self) -> [Rect; SLOT_COUNT] {
        std::array::from_fn(|i| self.cell_rect(i))
    }
}

/// Fit the largest uniformly scaled 2x2 grid of `aspect` cells into the canvas.
///
/// The grid is centered horizontally on the canvas and vertically in the area between the
/// top margin and the bottom band.
pub fn solve_layout(p: &LayoutParams) -> BoothResult<LayoutGeometry> {
    let inputs = [
        p.gap,
        p.bottom_band,
        p.aspect,
        p.margin,
        p.scale,
        p.offset.x,
        p.offset.y,
    ];
    if !inputs.iter().all(|v| v.is_finite()) {
        return Err(BoothError::validation("layout inputs must be finite"));
    }
    if p.gap < 0.0 || p.bottom_band < 0.0 || p.margin < 0.0 {
        return Err(BoothError::validation(
            "layout gap, bottom band and margin must be >= 0",
        ));
    }
    if p.aspect <= 0.0 {
        return Err(BoothError::validation("layout aspect must be > 0"));
    }
    if !(p.scale > 0.0 && p.scale <= 1.0) {
        return Err(BoothError::validation("layout scale must be in (0, 1]"));
    }

    let w = f64::from(p.canvas.width);
    let h = f64::from(p.canvas.height);
    let cols = GRID_COLUMNS as f64;
    let rows = GRID_ROWS as f64;
    let avail_w = w - 2.0 * p.margin - (cols - 1.0) * p.gap;
    let avail_h = h - 2.0 * p.margin - (rows - 1.0) * p.gap - p.bottom_band;
    if avail_w <= 0.0 || avail_h <= 0.0 {
        return Err(BoothError::validation(format!(
            "no room for the grid on a {}x{} canvas",
            p.canvas.width, p.canvas.height
        )));
    }

    let max_w = avail_w / cols;
    let max_h = avail_h / rows;
    let (cell_width, cell_height) = if max_w / max_h > p.aspect {
        let ch = max_h * p.scale;
        (ch * p.aspect, ch)
    } else {
        let cw = max_w * p.scale;
        (cw, cw / p.aspect)
    };

    let total_w = cols * cell_width + (cols - 1.0) * p.gap;
    let total_h = rows * cell_height + (rows - 1.0) * p.gap;
    Ok(LayoutGeometry {
        cell_width,
        cell_height,
        start_x: (w - total_w) / 2.0,
        start_y: p.margin + (h - 2.0 * p.margin - p.bottom_band - total_h) / 2.0,
        gap: p.gap,
        offset: p.offset,
    })
}

/// Largest centered sub-rectangle of a `width x height` image with the given aspect.
pub fn cover_crop(width: u32, height: u32, aspect: f64) -> BoothResult<Rect> {
    if width == 0 || height == 0 {
        return Err(BoothError::validation("cannot crop an empty image"));
    }
    if !aspect.is_finite() || aspect <= 0.0 {
        return Err(BoothError::validation("crop aspect must be > 0"));
    }
    let w = f64::from(width);
    let h = f64::from(height);
    if w / h > aspect {
        let cw = h * aspect;
        let x0 = (w - cw) / 2.0;
        Ok(Rect::new(x0, 0.0, x0 + cw, h))
    } else {
        let ch = w / aspect;
        let y0 = (h - ch) / 2.0;
        Ok(Rect::new(0.0, y0, w, y0 + ch))
    }
}

/// Destination rectangle that scales `content` uniformly to cover `target`, centered.
pub fn cover_rect(content_w: u32, content_h: u32, target: Rect) -> BoothResult<Rect> {
    if content_w == 0 || content_h == 0 {
        return Err(BoothError::validation("cannot cover with an empty image"));
    }
    let cw = f64::from(content_w);
    let ch = f64::from(content_h);
    let s = (target.width() / cw).max(target.height() / ch);
    let (dw, dh) = (cw * s, ch * s);
    let x0 = target.x0 + (target.width() - dw) / 2.0;
    let y0 = target.y0 + (target.height() - dh) / 2.0;
    Ok(Rect::new(x0, y0, x0 + dw, y0 + dh))
}

#[cfg(test)]
#[path = "../../tests/unit/layout/collage.rs"]
mod tests;
