//! Text acquisition: native text layer first, OCR as fallback.
//!
//! Acquisition is an ordered chain of [`TextStrategy`] attempts. Each
//! strategy either returns text it considers sufficient or reports why it
//! could not, and the first sufficient result wins.

mod strategies;

pub use strategies::{ImageOcr, NativePdfText, PdfPageOcr};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AcquisitionError;
use crate::models::config::InvoxConfig;
use crate::ocr::{ImagePreprocessor, TextRecognizer};

/// Declared kind of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Infer the kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "gif" | "webp" => {
                Some(DocumentKind::Image)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
        }
    }
}

/// Where acquired text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The document's own text layer.
    Native,
    /// Image recognition.
    Ocr,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Native => "native",
            Provenance::Ocr => "ocr",
        }
    }
}

/// Text produced by a strategy, tagged with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredText {
    pub text: String,
    pub provenance: Provenance,
    /// Pages that contributed text.
    pub pages: usize,
}

impl AcquiredText {
    pub fn new(text: impl Into<String>, provenance: Provenance, pages: usize) -> Self {
        Self {
            text: text.into(),
            provenance,
            pages,
        }
    }

    /// Number of non-whitespace characters.
    pub fn significant_chars(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// A document read into memory once and handed to every strategy.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

/// Result of a single strategy attempt.
#[derive(Debug, Clone)]
pub enum Attempt {
    /// Usable text; the chain stops here.
    Sufficient(AcquiredText),
    /// Not enough text. Any partial output is kept in case nothing better
    /// turns up later in the chain.
    Insufficient {
        partial: Option<AcquiredText>,
        reason: String,
    },
}

/// One link of the acquisition chain.
pub trait TextStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy can read documents of `kind`.
    fn applies_to(&self, kind: DocumentKind) -> bool;

    fn attempt(&self, document: &SourceDocument) -> Result<Attempt, AcquisitionError>;
}

/// Runs the strategy chain for a document.
pub struct TextAcquirer {
    strategies: Vec<Box<dyn TextStrategy>>,
}

impl TextAcquirer {
    pub fn new(strategies: Vec<Box<dyn TextStrategy>>) -> Self {
        Self { strategies }
    }

    /// Native text layer, then page OCR for PDFs; OCR for images.
    pub fn standard(config: &InvoxConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        let native: Box<dyn TextStrategy> =
            Box::new(NativePdfText::new(config.acquisition.min_native_chars));
        let page_ocr: Box<dyn TextStrategy> = Box::new(PdfPageOcr::new(
            recognizer.clone(),
            ImagePreprocessor::from_config(&config.ocr),
            config.acquisition.max_pages,
            config.acquisition.min_native_chars,
        ));
        let image_ocr: Box<dyn TextStrategy> = Box::new(ImageOcr::new(
            recognizer,
            ImagePreprocessor::from_config(&config.ocr),
        ));

        let strategies = if config.acquisition.prefer_native_text {
            vec![native, page_ocr, image_ocr]
        } else {
            vec![page_ocr, native, image_ocr]
        };
        Self::new(strategies)
    }

    /// Names of the configured strategies, in order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Acquire text from the file at `path`.
    ///
    /// Empty text is a valid result. When every strategy reports
    /// insufficient output, the largest partial result is returned.
    pub fn acquire(&self, path: &Path, kind: DocumentKind) -> Result<AcquiredText, AcquisitionError> {
        let bytes = std::fs::read(path)?;
        let document = SourceDocument {
            path: path.to_path_buf(),
            kind,
            bytes,
        };
        self.acquire_document(&document)
    }

    /// Acquire text from an already loaded document.
    pub fn acquire_document(&self, document: &SourceDocument) -> Result<AcquiredText, AcquisitionError> {
        let mut best: Option<AcquiredText> = None;
        let mut attempted = false;

        for strategy in self.strategies.iter().filter(|s| s.applies_to(document.kind)) {
            attempted = true;
            match strategy.attempt(document)? {
                Attempt::Sufficient(text) => {
                    info!(
                        "Acquired {} chars via {} from {}",
                        text.significant_chars(),
                        strategy.name(),
                        document.path.display()
                    );
                    return Ok(text);
                }
                Attempt::Insufficient { partial, reason } => {
                    debug!("{} insufficient: {}", strategy.name(), reason);
                    if let Some(partial) = partial {
                        let better = best
                            .as_ref()
                            .is_none_or(|b| partial.significant_chars() > b.significant_chars());
                        if better {
                            best = Some(partial);
                        }
                    }
                }
            }
        }

        if !attempted {
            return Err(AcquisitionError::UnsupportedKind(document.kind.as_str().to_string()));
        }

        let fallback_provenance = match document.kind {
            DocumentKind::Pdf => Provenance::Native,
            DocumentKind::Image => Provenance::Ocr,
        };
        Ok(best.unwrap_or_else(|| AcquiredText::new("", fallback_provenance, 0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        result: fn() -> Result<Attempt, AcquisitionError>,
    }

    impl TextStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn applies_to(&self, kind: DocumentKind) -> bool {
            kind == DocumentKind::Pdf
        }

        fn attempt(&self, _document: &SourceDocument) -> Result<Attempt, AcquisitionError> {
            (self.result)()
        }
    }

    fn document(kind: DocumentKind) -> SourceDocument {
        SourceDocument {
            path: PathBuf::from("doc.pdf"),
            kind,
            bytes: Vec::new(),
        }
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(DocumentKind::from_path(Path::new("a/B.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_path(Path::new("scan.tiff")), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_first_sufficient_wins() {
        let acquirer = TextAcquirer::new(vec![
            Box::new(Fixed {
                name: "thin",
                result: || {
                    Ok(Attempt::Insufficient {
                        partial: Some(AcquiredText::new("abc", Provenance::Native, 1)),
                        reason: "too short".into(),
                    })
                },
            }),
            Box::new(Fixed {
                name: "ocr",
                result: || Ok(Attempt::Sufficient(AcquiredText::new("full text", Provenance::Ocr, 1))),
            }),
        ]);

        let text = acquirer.acquire_document(&document(DocumentKind::Pdf)).unwrap();
        assert_eq!(text.provenance, Provenance::Ocr);
        assert_eq!(text.text, "full text");
    }

    #[test]
    fn test_best_partial_when_nothing_sufficient() {
        let acquirer = TextAcquirer::new(vec![
            Box::new(Fixed {
                name: "thin",
                result: || {
                    Ok(Attempt::Insufficient {
                        partial: Some(AcquiredText::new("abc", Provenance::Native, 1)),
                        reason: "too short".into(),
                    })
                },
            }),
            Box::new(Fixed {
                name: "none",
                result: || {
                    Ok(Attempt::Insufficient {
                        partial: None,
                        reason: "no images".into(),
                    })
                },
            }),
        ]);

        let text = acquirer.acquire_document(&document(DocumentKind::Pdf)).unwrap();
        assert_eq!(text.text, "abc");
        assert_eq!(text.provenance, Provenance::Native);
    }

    #[test]
    fn test_errors_stop_the_chain() {
        let acquirer = TextAcquirer::new(vec![Box::new(Fixed {
            name: "broken",
            result: || {
                Err(AcquisitionError::EngineUnavailable {
                    capability: "OCR models".into(),
                })
            },
        })]);
        let err = acquirer.acquire_document(&document(DocumentKind::Pdf)).unwrap_err();
        assert!(matches!(err, AcquisitionError::EngineUnavailable { .. }));
    }

    #[test]
    fn test_no_applicable_strategy() {
        let acquirer = TextAcquirer::new(Vec::new());
        let err = acquirer.acquire_document(&document(DocumentKind::Image)).unwrap_err();
        assert!(matches!(err, AcquisitionError::UnsupportedKind(_)));
    }
}
