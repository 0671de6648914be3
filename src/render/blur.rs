use crate::foundation::error::{BoothError, BoothResult};

/// Separable Gaussian blur over premultiplied RGBA8, edge-clamped, Q16 fixed point.
///
/// Integer weights make the result bit-identical across runs and platforms.
pub fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> BoothResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| BoothError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(BoothError::validation(
            "blur expects a buffer of width*height*4 bytes",
        ));
    }
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    let (w, h) = (width as usize, height as usize);
    convolve(src, &mut tmp, w, h, &kernel, Axis::Rows);
    convolve(&tmp, &mut out, w, h, &kernel, Axis::Columns);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> BoothResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(BoothError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    // Push the rounding residue into the center tap so the kernel sums to exactly 1.0.
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + 65536 - acc).clamp(0, 65536) as u32;

    Ok(weights)
}

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Columns,
}

/// One 1D pass along `axis`; samples past the edge clamp to the last pixel of the line.
fn convolve(src: &[u8], dst: &mut [u8], width: usize, height: usize, kernel: &[u32], axis: Axis) {
    let (lines, len, step, line_step) = match axis {
        Axis::Rows => (height, width, 1, width),
        Axis::Columns => (width, height, width, 1),
    };
    let radius = kernel.len() / 2;
    for line in 0..lines {
        let base = line * line_step;
        for i in 0..len {
            let mut acc = [0u64; 4];
            for (k, &weight) in kernel.iter().enumerate() {
                let j = (i + k).saturating_sub(radius).min(len - 1);
                let px = (base + j * step) * 4;
                for (a, &v) in acc.iter_mut().zip(&src[px..px + 4]) {
                    *a += u64::from(weight) * u64::from(v);
                }
            }
            let px = (base + i * step) * 4;
            for (d, a) in dst[px..px + 4].iter_mut().zip(acc) {
                *d = ((a + 32768) >> 16).min(255) as u8;
            }
        }
    }
}
