//! Image preparation before text recognition.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::models::config::OcrConfig;

/// Page orientation estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Clockwise rotation, in degrees, that makes text lines horizontal.
    pub rotation: u32,
    /// Confidence of the estimate in [0, 1].
    pub confidence: f32,
}

/// Grayscale, denoise, autocontrast and orientation correction.
pub struct ImagePreprocessor {
    max_size: u32,
    denoise: bool,
    autocontrast_cutoff: f32,
    orientation_min_confidence: f32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&OcrConfig::default())
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            max_size: config.max_image_size,
            denoise: config.denoise,
            autocontrast_cutoff: config.autocontrast_cutoff,
            orientation_min_confidence: config.orientation_min_confidence,
        }
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    /// Enable or disable the median filter.
    pub fn with_denoise(mut self, denoise: bool) -> Self {
        self.denoise = denoise;
        self
    }

    /// Prepare a page image for recognition.
    ///
    /// A rotation is applied only when the orientation estimate reaches the
    /// configured minimum confidence; otherwise the page is left as scanned.
    pub fn prepare(&self, image: &DynamicImage) -> GrayImage {
        let mut gray = image.to_luma8();
        let (width, height) = gray.dimensions();

        let (new_width, new_height) = calculate_resize_dimensions(width, height, self.max_size);
        if (new_width, new_height) != (width, height) {
            debug!(
                "Resizing {}x{} -> {}x{}",
                width, height, new_width, new_height
            );
            gray = imageops::resize(&gray, new_width, new_height, FilterType::Triangle);
        }

        if self.denoise {
            gray = median_filter(&gray);
        }

        autocontrast(&mut gray, self.autocontrast_cutoff);

        let orientation = detect_orientation(&gray);
        if orientation.rotation != 0 && orientation.confidence >= self.orientation_min_confidence {
            debug!(
                "Rotating page by {} degrees (confidence {:.2})",
                orientation.rotation, orientation.confidence
            );
            gray = imageops::rotate90(&gray);
        }

        gray
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn calculate_resize_dimensions(width: u32, height: u32, target_size: u32) -> (u32, u32) {
    let max_dim = width.max(height);

    if target_size == 0 || max_dim <= target_size {
        return (width, height);
    }

    let scale = target_size as f32 / max_dim as f32;
    let new_width = (width as f32 * scale) as u32;
    let new_height = (height as f32 * scale) as u32;

    (new_width.max(1), new_height.max(1))
}

/// 3x3 median filter with clamped borders.
fn median_filter(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);
    let mut window = Vec::with_capacity(9);

    for y in 0..height {
        for x in 0..width {
            window.clear();
            for ly in y.saturating_sub(1)..(y + 2).min(height) {
                for lx in x.saturating_sub(1)..(x + 2).min(width) {
                    window.push(image.get_pixel(lx, ly)[0]);
                }
            }
            window.sort_unstable();
            result.put_pixel(x, y, Luma([window[window.len() / 2]]));
        }
    }

    result
}

/// Stretch the histogram so that `cutoff` percent of pixels clip at each end.
fn autocontrast(image: &mut GrayImage, cutoff: f32) {
    let total = (image.width() as u64) * (image.height() as u64);
    if total == 0 {
        return;
    }

    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let clip = ((total as f64) * (cutoff.clamp(0.0, 49.0) as f64) / 100.0) as u64;

    let mut low = 0usize;
    let mut seen = 0u64;
    for (value, count) in histogram.iter().enumerate() {
        seen += count;
        if seen > clip {
            low = value;
            break;
        }
    }

    let mut high = 255usize;
    seen = 0;
    for (value, count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > clip {
            high = value;
            break;
        }
    }

    if high <= low {
        return;
    }

    let scale = 255.0 / (high - low) as f32;
    for pixel in image.pixels_mut() {
        let v = pixel[0] as f32;
        pixel[0] = ((v - low as f32) * scale).round().clamp(0.0, 255.0) as u8;
    }
}

/// Estimate page orientation from ink projection profiles.
///
/// Horizontal text lines make the per-row ink profile vary strongly while the
/// per-column profile stays flat. The reverse pattern suggests a page turned
/// by 90 degrees.
pub fn detect_orientation(image: &GrayImage) -> Orientation {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Orientation {
            rotation: 0,
            confidence: 0.0,
        };
    }

    let mut rows = vec![0f64; height as usize];
    let mut cols = vec![0f64; width as usize];
    for (x, y, pixel) in image.enumerate_pixels() {
        let ink = (255 - pixel[0]) as f64;
        rows[y as usize] += ink;
        cols[x as usize] += ink;
    }
    rows.iter_mut().for_each(|v| *v /= width as f64);
    cols.iter_mut().for_each(|v| *v /= height as f64);

    let row_variance = variance(&rows);
    let col_variance = variance(&cols);

    if col_variance > row_variance && col_variance > f64::EPSILON {
        Orientation {
            rotation: 90,
            confidence: (1.0 - row_variance / col_variance) as f32,
        }
    } else {
        Orientation {
            rotation: 0,
            confidence: 0.0,
        }
    }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped(width: u32, height: u32, horizontal: bool) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let band = if horizontal { y } else { x };
            if (band / 4) % 2 == 0 { Luma([0]) } else { Luma([255]) }
        })
    }

    #[test]
    fn test_resize_dimensions() {
        assert_eq!(calculate_resize_dimensions(500, 300, 960), (500, 300));

        let (w, h) = calculate_resize_dimensions(1920, 1080, 960);
        assert_eq!(w, 960);
        assert!(h < 960);
    }

    #[test]
    fn test_horizontal_lines_keep_orientation() {
        let image = DynamicImage::ImageLuma8(striped(40, 24, true));
        let prepared = ImagePreprocessor::new().prepare(&image);
        assert_eq!(prepared.dimensions(), (40, 24));
        assert_eq!(detect_orientation(&prepared).rotation, 0);
    }

    #[test]
    fn test_vertical_lines_are_rotated() {
        let image = DynamicImage::ImageLuma8(striped(40, 24, false));
        let orientation = detect_orientation(&image.to_luma8());
        assert_eq!(orientation.rotation, 90);
        assert!(orientation.confidence > 0.9);

        let prepared = ImagePreprocessor::new().prepare(&image);
        assert_eq!(prepared.dimensions(), (24, 40));
    }

    #[test]
    fn test_blank_page_is_not_rotated() {
        let image = GrayImage::from_pixel(30, 10, Luma([255]));
        let orientation = detect_orientation(&image);
        assert_eq!(orientation.rotation, 0);
        assert_eq!(orientation.confidence, 0.0);
    }

    #[test]
    fn test_autocontrast_stretches_range() {
        let mut image = GrayImage::from_fn(10, 10, |x, _| Luma([100 + (x as u8) * 5]));
        autocontrast(&mut image, 0.0);
        let values: Vec<u8> = image.pixels().map(|p| p[0]).collect();
        assert_eq!(values.iter().min(), Some(&0));
        assert_eq!(values.iter().max(), Some(&255));
    }

    #[test]
    fn test_median_removes_speck() {
        let mut image = GrayImage::from_pixel(5, 5, Luma([255]));
        image.put_pixel(2, 2, Luma([0]));
        let filtered = median_filter(&image);
        assert_eq!(filtered.get_pixel(2, 2)[0], 255);
    }
}
