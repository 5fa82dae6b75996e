//! Luma-plane helpers shared by the CPU preprocessor.

use crate::preprocessing::domain::enhancement_params::EnhancementParams;

// ITU-R BT.601 luma weights, same as OpenCV's RGB2GRAY.
const R_WEIGHT: f32 = 0.299;
const G_WEIGHT: f32 = 0.587;
const B_WEIGHT: f32 = 0.114;

/// Converts interleaved pixels to one luma byte per pixel.
///
/// One channel is copied as-is; a fourth (alpha) channel is ignored.
pub(crate) fn to_luma(data: &[u8], channels: usize) -> Vec<u8> {
    match channels {
        0 => Vec::new(),
        1 => data.to_vec(),
        2 => data.chunks_exact(2).map(|px| px[0]).collect(),
        _ => data
            .chunks_exact(channels)
            .map(|px| {
                let y = R_WEIGHT * px[0] as f32 + G_WEIGHT * px[1] as f32 + B_WEIGHT * px[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect(),
    }
}

/// Histogram equalization by cumulative distribution.
///
/// Values are remapped to `(cdf - cdf_min) * 255 / (cdf_max - cdf_min)`,
/// where `cdf_min` is the smallest non-zero cumulative count. A plane with
/// a single distinct value is left untouched.
pub(crate) fn equalize(luma: &mut [u8]) {
    let mut hist = [0u64; 256];
    for &v in luma.iter() {
        hist[v as usize] += 1;
    }

    let mut cdf = [0u64; 256];
    let mut running = 0u64;
    for (i, count) in hist.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }

    let Some(&cdf_min) = cdf.iter().find(|&&c| c > 0) else {
        return;
    };
    let cdf_max = cdf[255];
    if cdf_max == cdf_min {
        return;
    }

    let span = cdf_max - cdf_min;
    let mut lut = [0u8; 256];
    for (i, &c) in cdf.iter().enumerate() {
        if c > 0 {
            lut[i] = ((c - cdf_min) * 255 / span) as u8;
        }
    }
    for v in luma.iter_mut() {
        *v = lut[*v as usize];
    }
}

/// Lookup table for contrast (`alpha`), brightness (`beta`) and gamma.
pub(crate) fn tone_lut(params: &EnhancementParams) -> [u8; 256] {
    let inv_gamma = if params.gamma > 0.0 {
        1.0 / params.gamma
    } else {
        1.0
    };
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        let linear = (params.alpha * i as f64 + params.beta).clamp(0.0, 255.0);
        let curved = 255.0 * (linear / 255.0).powf(inv_gamma);
        *slot = curved.round().clamp(0.0, 255.0) as u8;
    }
    lut
}
