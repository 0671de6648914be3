use std::{io::Cursor, sync::Arc};

use anyhow::Context;

use crate::foundation::error::{BoothError, BoothResult};

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Build from straight-alpha RGBA8 bytes.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba: Vec<u8>) -> BoothResult<Self> {
        check_len(width, height, rgba.len())?;
        premultiply_rgba8_in_place(&mut rgba);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba),
        })
    }

    /// Solid opaque-or-translucent fill, mostly useful for placeholders and tests.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> BoothResult<Self> {
        let px = width as usize * height as usize;
        Self::from_straight_rgba8(width, height, rgba.repeat(px))
    }

    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.rgba8_premul.as_ref().clone();
        unpremultiply_rgba8_in_place(&mut out);
        out
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.rgba8_premul[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }
}

/// A photo as both encoded PNG bytes and decoded pixels.
///
/// Both halves are immutable and shared, so clones are cheap hand-offs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Photo {
    pub png: Arc<Vec<u8>>,
    pub image: RasterImage,
}

impl Photo {
    /// Decode encoded bytes (any format `image` understands) and keep them as PNG.
    pub fn from_encoded(bytes: &[u8]) -> BoothResult<Self> {
        let image = decode_image(bytes)?;
        let png = if image::guess_format(bytes).ok() == Some(image::ImageFormat::Png) {
            bytes.to_vec()
        } else {
            encode_png_premul(&image)?
        };
        Ok(Self {
            png: Arc::new(png),
            image,
        })
    }

    /// Encode straight-alpha pixels as PNG and keep the decoded form alongside.
    pub fn from_straight_rgba8(width: u32, height: u32, rgba: Vec<u8>) -> BoothResult<Self> {
        let png = encode_png_straight(width, height, &rgba)?;
        let image = RasterImage::from_straight_rgba8(width, height, rgba)?;
        Ok(Self {
            png: Arc::new(png),
            image,
        })
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> BoothResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| BoothError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(BoothError::decode("image has zero area"));
    }
    RasterImage::from_straight_rgba8(width, height, rgba.into_raw())
}

/// Encode straight-alpha RGBA8 bytes as PNG.
pub fn encode_png_straight(width: u32, height: u32, rgba: &[u8]) -> BoothResult<Vec<u8>> {
    check_len(width, height, rgba.len())?;
    let img = image::RgbaImage::from_raw(width, height, rgba.to_vec())
        .ok_or_else(|| BoothError::validation("rgba buffer does not match dimensions"))?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

/// Encode a premultiplied raster as PNG.
pub fn encode_png_premul(image: &RasterImage) -> BoothResult<Vec<u8>> {
    encode_png_straight(image.width, image.height, &image.to_straight_rgba8())
}

fn check_len(width: u32, height: u32, len: usize) -> BoothResult<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| BoothError::validation("image buffer size overflow"))?;
    if width == 0 || height == 0 {
        return Err(BoothError::validation("image dimensions must be > 0"));
    }
    if len != expected {
        return Err(BoothError::validation(format!(
            "rgba buffer is {len} bytes, expected {expected} for {width}x{height}"
        )));
    }
    Ok(())
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 || a == 0 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
