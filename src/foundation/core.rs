use crate::foundation::error::{BoothError, BoothResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};

/// Number of photos in a session and cells in the collage.
pub const SLOT_COUNT: usize = 4;

/// Collage grid columns (row-major slot order).
pub const GRID_COLUMNS: usize = 2;

/// Collage grid rows.
pub const GRID_ROWS: usize = 2;

/// Target photo aspect ratio (width / height) of every collage cell.
pub const PHOTO_ASPECT: f64 = 3.0 / 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> BoothResult<Self> {
        if width == 0 || height == 0 {
            return Err(BoothError::validation("canvas dimensions must be > 0"));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(BoothError::validation("canvas dimensions must fit in u16"));
        }
        Ok(Self { width, height })
    }

    pub fn size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}
