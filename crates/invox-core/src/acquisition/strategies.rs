//! Concrete acquisition strategies.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{AcquiredText, Attempt, DocumentKind, Provenance, SourceDocument, TextStrategy};
use crate::error::{AcquisitionError, PdfError};
use crate::ocr::{ImagePreprocessor, TextRecognizer};
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Reads the PDF text layer.
///
/// The text is sufficient when it has at least `min_chars` non-whitespace
/// characters; anything less suggests a scanned document.
pub struct NativePdfText {
    min_chars: usize,
}

impl NativePdfText {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }
}

impl TextStrategy for NativePdfText {
    fn name(&self) -> &'static str {
        "native_pdf_text"
    }

    fn applies_to(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Pdf
    }

    fn attempt(&self, document: &SourceDocument) -> Result<Attempt, AcquisitionError> {
        let mut pdf = PdfExtractor::new();
        pdf.load(&document.bytes)?;

        let text = match pdf.extract_text() {
            Ok(text) => text,
            Err(PdfError::TextExtraction(reason)) => {
                debug!("Text layer unreadable: {}", reason);
                return Ok(Attempt::Insufficient {
                    partial: None,
                    reason: format!("text layer unreadable: {}", reason),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let acquired = AcquiredText::new(text, Provenance::Native, pdf.page_count() as usize);
        let chars = acquired.significant_chars();
        if chars >= self.min_chars {
            Ok(Attempt::Sufficient(acquired))
        } else {
            Ok(Attempt::Insufficient {
                reason: format!(
                    "text layer has {} characters (need {})",
                    chars, self.min_chars
                ),
                partial: Some(acquired),
            })
        }
    }
}

/// Recognizes the raster images of each PDF page.
///
/// Recognized text shorter than `min_chars` is reported as a partial result
/// so the chain can prefer a longer text layer.
pub struct PdfPageOcr {
    recognizer: Arc<dyn TextRecognizer>,
    preprocessor: ImagePreprocessor,
    max_pages: usize,
    min_chars: usize,
}

impl PdfPageOcr {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        preprocessor: ImagePreprocessor,
        max_pages: usize,
        min_chars: usize,
    ) -> Self {
        Self {
            recognizer,
            preprocessor,
            max_pages,
            min_chars,
        }
    }
}

impl TextStrategy for PdfPageOcr {
    fn name(&self) -> &'static str {
        "pdf_page_ocr"
    }

    fn applies_to(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Pdf
    }

    fn attempt(&self, document: &SourceDocument) -> Result<Attempt, AcquisitionError> {
        let mut pdf = PdfExtractor::new();
        pdf.load(&document.bytes)?;

        let images = pdf.page_images(self.max_pages)?;
        if images.is_empty() {
            return Ok(Attempt::Insufficient {
                partial: None,
                reason: "no page images to recognize".to_string(),
            });
        }

        let mut pages = Vec::new();
        for page in &images {
            let prepared = self.preprocessor.prepare(&page.image);
            match self.recognizer.recognize(&prepared) {
                Ok(result) => pages.push(result.text),
                Err(e @ AcquisitionError::EngineUnavailable { .. }) => return Err(e),
                Err(e) => warn!("Skipping page {}: {}", page.page, e),
            }
        }

        if pages.is_empty() {
            return Ok(Attempt::Insufficient {
                partial: None,
                reason: "recognition failed on every page".to_string(),
            });
        }

        let count = pages.len();
        let acquired = AcquiredText::new(pages.join("\n\n"), Provenance::Ocr, count);
        let chars = acquired.significant_chars();
        if chars >= self.min_chars {
            Ok(Attempt::Sufficient(acquired))
        } else {
            Ok(Attempt::Insufficient {
                reason: format!(
                    "recognized {} characters on {} pages (need {})",
                    chars, count, self.min_chars
                ),
                partial: Some(acquired),
            })
        }
    }
}

/// Recognizes a standalone image file.
pub struct ImageOcr {
    recognizer: Arc<dyn TextRecognizer>,
    preprocessor: ImagePreprocessor,
}

impl ImageOcr {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, preprocessor: ImagePreprocessor) -> Self {
        Self {
            recognizer,
            preprocessor,
        }
    }
}

impl TextStrategy for ImageOcr {
    fn name(&self) -> &'static str {
        "image_ocr"
    }

    fn applies_to(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Image
    }

    fn attempt(&self, document: &SourceDocument) -> Result<Attempt, AcquisitionError> {
        let image = image::load_from_memory(&document.bytes)?;
        let prepared = self.preprocessor.prepare(&image);
        let result = self.recognizer.recognize(&prepared)?;
        Ok(Attempt::Sufficient(AcquiredText::new(
            result.text,
            Provenance::Ocr,
            1,
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::{DynamicImage, GrayImage, Luma};

    use super::*;
    use crate::ocr::{OcrResult, UnavailableRecognizer};

    struct Echo;

    impl TextRecognizer for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn recognize(&self, image: &GrayImage) -> Result<OcrResult, AcquisitionError> {
            let (w, h) = image.dimensions();
            Ok(OcrResult::from_text(format!("{}x{}", w, h), w, h))
        }
    }

    fn png_document() -> SourceDocument {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 6, Luma([255])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        SourceDocument {
            path: PathBuf::from("scan.png"),
            kind: DocumentKind::Image,
            bytes,
        }
    }

    #[test]
    fn test_image_ocr_uses_recognizer() {
        let strategy = ImageOcr::new(Arc::new(Echo), ImagePreprocessor::new());
        match strategy.attempt(&png_document()).unwrap() {
            Attempt::Sufficient(text) => {
                assert_eq!(text.text, "8x6");
                assert_eq!(text.provenance, Provenance::Ocr);
            }
            other => panic!("unexpected attempt: {:?}", other),
        }
    }

    #[test]
    fn test_image_ocr_reports_missing_engine() {
        let strategy = ImageOcr::new(
            Arc::new(UnavailableRecognizer::new("OCR models")),
            ImagePreprocessor::new(),
        );
        let err = strategy.attempt(&png_document()).unwrap_err();
        assert!(matches!(err, AcquisitionError::EngineUnavailable { .. }));
    }

    #[test]
    fn test_corrupt_image_is_acquisition_failure() {
        let strategy = ImageOcr::new(Arc::new(Echo), ImagePreprocessor::new());
        let document = SourceDocument {
            path: PathBuf::from("broken.png"),
            kind: DocumentKind::Image,
            bytes: b"not an image".to_vec(),
        };
        assert!(matches!(
            strategy.attempt(&document),
            Err(AcquisitionError::Image(_))
        ));
    }

    /// One-page PDF whose only content is a gray image XObject.
    fn scanned_pdf() -> SourceDocument {
        use lopdf::{Document, Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 32,
                "Height" => 24,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![255u8; 32 * 24],
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        SourceDocument {
            path: PathBuf::from("scan.pdf"),
            kind: DocumentKind::Pdf,
            bytes,
        }
    }

    #[test]
    fn test_page_ocr_below_threshold_is_partial() {
        let document = scanned_pdf();

        let strategy = PdfPageOcr::new(Arc::new(Echo), ImagePreprocessor::new(), 10, 1);
        assert!(matches!(
            strategy.attempt(&document).unwrap(),
            Attempt::Sufficient(_)
        ));

        let strategy = PdfPageOcr::new(Arc::new(Echo), ImagePreprocessor::new(), 10, 500);
        match strategy.attempt(&document).unwrap() {
            Attempt::Insufficient { partial: Some(text), .. } => {
                assert_eq!(text.provenance, Provenance::Ocr);
                assert_eq!(text.pages, 1);
            }
            other => panic!("unexpected attempt: {:?}", other),
        }
    }

    #[test]
    fn test_native_rejects_corrupt_pdf() {
        let strategy = NativePdfText::new(50);
        let document = SourceDocument {
            path: PathBuf::from("broken.pdf"),
            kind: DocumentKind::Pdf,
            bytes: b"%PDF-garbage".to_vec(),
        };
        assert!(matches!(
            strategy.attempt(&document),
            Err(AcquisitionError::Pdf(_))
        ));
    }
}
