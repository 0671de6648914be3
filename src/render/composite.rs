use crate::foundation::error::{BoothError, BoothResult};

pub type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over for one premultiplied pixel.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }
    let inv = 255 - sa;
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Composite a `layer_w x layer_h` premultiplied layer over `dst` with its top-left corner
/// at `(x, y)` in destination pixels. Parts outside the destination are clipped.
#[allow(clippy::too_many_arguments)]
pub fn over_at(
    dst: &mut [u8],
    dst_w: u32,
    dst_h: u32,
    layer: &[u8],
    layer_w: u32,
    layer_h: u32,
    x: i32,
    y: i32,
) -> BoothResult<()> {
    if dst.len() != dst_w as usize * dst_h as usize * 4 {
        return Err(BoothError::validation(
            "over_at destination does not match its dimensions",
        ));
    }
    if layer.len() != layer_w as usize * layer_h as usize * 4 {
        return Err(BoothError::validation(
            "over_at layer does not match its dimensions",
        ));
    }

    let (dw, dh) = (i64::from(dst_w), i64::from(dst_h));
    let (lw, lh) = (i64::from(layer_w), i64::from(layer_h));
    let (x, y) = (i64::from(x), i64::from(y));
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + lw).min(dw);
    let y1 = (y + lh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    for dy in y0..y1 {
        let ly = dy - y;
        for dx in x0..x1 {
            let lx = dx - x;
            let si = ((ly * lw + lx) * 4) as usize;
            let di = ((dy * dw + dx) * 4) as usize;
            let s = [layer[si], layer[si + 1], layer[si + 2], layer[si + 3]];
            let d = [dst[di], dst[di + 1], dst[di + 2], dst[di + 3]];
            dst[di..di + 4].copy_from_slice(&over(d, s));
        }
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
