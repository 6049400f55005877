//! OCR engine wrapper using `pure-onnx-ocr`.

use std::path::PathBuf;
use std::time::Instant;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use crate::error::{AcquisitionError, OcrError};
use crate::models::config::OcrConfig;

use super::{OcrResult, TextBox, TextRecognizer};

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// The engine is built for each page from the configured model files, so a
/// single instance can be shared by all batch workers.
pub struct PureOcrEngine {
    det_path: PathBuf,
    rec_path: PathBuf,
    dict_path: PathBuf,
    keep_unk: bool,
}

impl PureOcrEngine {
    pub fn from_config(config: &OcrConfig) -> Self {
        let [det_path, rec_path, dict_path] = config.model_paths();
        Self {
            det_path,
            rec_path,
            dict_path,
            keep_unk: config.keep_unk,
        }
    }

    fn build(&self) -> Result<pure_onnx_ocr::engine::OcrEngine, OcrError> {
        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&self.det_path)
            .rec_model_path(&self.rec_path)
            .dictionary_path(&self.dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        debug!("Loaded pure-onnx-ocr engine from {}", self.det_path.display());
        Ok(engine)
    }
}

impl TextRecognizer for PureOcrEngine {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    fn recognize(&self, image: &GrayImage) -> Result<OcrResult, AcquisitionError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        let engine = self.build()?;

        let rgb = DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(image.clone()).to_rgb8());
        let results = engine
            .run_from_image(&rgb)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let boxes = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                },
                confidence: r.confidence,
            })
            .collect();

        let mut result = OcrResult {
            boxes,
            text: String::new(),
            image_size: (width, height),
        };
        result.sort_by_reading_order();

        info!(
            "OCR complete: {} text boxes in {}ms",
            result.boxes.len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
