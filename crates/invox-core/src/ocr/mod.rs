//! Optical character recognition behind a swappable recognizer.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use preprocessing::{ImagePreprocessor, Orientation, detect_orientation};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::sync::Arc;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AcquisitionError;
use crate::models::config::OcrConfig;

/// Turns a prepared page image into text.
///
/// Implementations are shared between batch workers and must not hold
/// per-document state.
pub trait TextRecognizer: Send + Sync {
    /// Short engine name for logs and metadata.
    fn name(&self) -> &str;

    /// Recognize all text on a page.
    fn recognize(&self, image: &GrayImage) -> Result<OcrResult, AcquisitionError>;
}

/// A detected text box with its coordinates and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Result of OCR processing on an image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResult {
    /// Detected and recognized text boxes.
    pub boxes: Vec<TextBox>,

    /// Full text (boxes joined with newlines).
    pub text: String,

    /// Image dimensions (width, height).
    pub image_size: (u32, u32),
}

impl OcrResult {
    /// Create an empty result.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            boxes: Vec::new(),
            text: String::new(),
            image_size: (width, height),
        }
    }

    /// Build a result from plain text with no box geometry.
    pub fn from_text(text: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            boxes: Vec::new(),
            text: text.into(),
            image_size: (width, height),
        }
    }

    /// Sort boxes by reading order (top-to-bottom, left-to-right).
    ///
    /// Boxes whose tops fall in the same 20 px band are treated as one line
    /// and joined with a space; lines are joined with newlines.
    pub fn sort_by_reading_order(&mut self) {
        self.boxes.sort_by(|a, b| {
            let (ax, ay, _, _) = a.rect();
            let (bx, by, _, _) = b.rect();

            let row_a = (ay / 20.0) as i32;
            let row_b = (by / 20.0) as i32;

            row_a
                .cmp(&row_b)
                .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines: Vec<String> = Vec::new();
        let mut current_row = None;
        for text_box in &self.boxes {
            let row = (text_box.rect().1 / 20.0) as i32;
            match lines.last_mut() {
                Some(line) if current_row == Some(row) => {
                    line.push(' ');
                    line.push_str(text_box.text.trim());
                }
                _ => lines.push(text_box.text.trim().to_string()),
            }
            current_row = Some(row);
        }
        self.text = lines.join("\n");
    }
}

/// Recognizer used when no OCR engine can be loaded.
///
/// Every call fails with [`AcquisitionError::EngineUnavailable`] so the
/// pipeline reports the missing capability instead of producing empty text.
#[derive(Debug, Clone)]
pub struct UnavailableRecognizer {
    capability: String,
}

impl UnavailableRecognizer {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }
}

impl TextRecognizer for UnavailableRecognizer {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn recognize(&self, _image: &GrayImage) -> Result<OcrResult, AcquisitionError> {
        Err(AcquisitionError::EngineUnavailable {
            capability: self.capability.clone(),
        })
    }
}

/// Load the recognizer described by `config`.
///
/// Missing model files are not an error here: the returned recognizer
/// reports them on first use, so text-layer PDFs still process.
pub fn load_recognizer(config: &OcrConfig) -> Arc<dyn TextRecognizer> {
    let missing: Vec<String> = config
        .model_paths()
        .iter()
        .filter(|path| !path.is_file())
        .map(|path| path.display().to_string())
        .collect();

    if !missing.is_empty() {
        warn!("OCR models not found: {}", missing.join(", "));
        return Arc::new(UnavailableRecognizer::new(format!(
            "OCR model files ({})",
            missing.join(", ")
        )));
    }

    native_recognizer(config)
}

#[cfg(feature = "native")]
fn native_recognizer(config: &OcrConfig) -> Arc<dyn TextRecognizer> {
    Arc::new(PureOcrEngine::from_config(config))
}

#[cfg(not(feature = "native"))]
fn native_recognizer(_config: &OcrConfig) -> Arc<dyn TextRecognizer> {
    Arc::new(UnavailableRecognizer::new(
        "OCR engine (build with the `native` feature)",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(x: f32, y: f32, text: &str) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_reading_order() {
        let mut result = OcrResult::empty(200, 100);
        result.boxes = vec![
            text_box(100.0, 42.0, "$100.00"),
            text_box(0.0, 2.0, "Acme"),
            text_box(0.0, 41.0, "Total"),
        ];
        result.sort_by_reading_order();
        assert_eq!(result.text, "Acme\nTotal $100.00");
    }

    #[test]
    fn test_missing_models_yield_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig {
            model_dir: dir.path().to_path_buf(),
            ..OcrConfig::default()
        };
        let recognizer = load_recognizer(&config);
        assert_eq!(recognizer.name(), "unavailable");

        let err = recognizer.recognize(&GrayImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, AcquisitionError::EngineUnavailable { .. }));
        assert!(err.to_string().contains("det.onnx"));
    }
}
