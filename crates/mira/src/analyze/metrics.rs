//! Per-image quality metrics over the luma plane.

use image::GrayImage;

/// Sharpness as the variance of a 3x3 Laplacian response. Soft-focus and
/// motion-blurred images have weak edges everywhere, so the response
/// distribution collapses toward zero.
pub fn sharpness_score(luma: &GrayImage) -> f64 {
    let (width, height) = luma.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut responses = Vec::with_capacity(((width - 2) * (height - 2)) as usize);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = luma.get_pixel(x, y)[0] as f64;
            let up = luma.get_pixel(x, y - 1)[0] as f64;
            let down = luma.get_pixel(x, y + 1)[0] as f64;
            let left = luma.get_pixel(x - 1, y)[0] as f64;
            let right = luma.get_pixel(x + 1, y)[0] as f64;

            responses.push(up + down + left + right - 4.0 * center);
        }
    }

    variance(&responses)
}

/// Mean luma, 0 (black) to 255 (white).
pub fn mean_brightness(luma: &GrayImage) -> f64 {
    let pixels = luma.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
