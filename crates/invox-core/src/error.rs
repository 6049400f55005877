//! Error types for the invox-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the invox library.
#[derive(Error, Debug)]
pub enum InvoxError {
    /// Pre-flight file check rejected the document.
    #[error("guardrail violation: {0}")]
    Guardrail(#[from] GuardrailViolation),

    /// Text could not be acquired from the document.
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// A stage was handed structurally invalid input.
    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedInput),

    /// Invalid batch file pattern.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Reasons a document is refused before any parsing begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardrailViolation {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("unsupported file extension '{extension}' (allowed: {allowed})")]
    DisallowedExtension { extension: String, allowed: String },

    #[error("{} is outside the trusted directory {}", .path.display(), .directory.display())]
    OutsideTrustedDirectory { path: PathBuf, directory: PathBuf },

    #[error("file size {size} bytes exceeds maximum size of {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

/// Errors raised while turning a document into text.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// The recognition engine (or its models) is not installed.
    #[error("text recognition unavailable: missing {capability}")]
    EngineUnavailable { capability: String },

    /// The document kind cannot be read by any strategy.
    #[error("unsupported document kind: {0}")]
    UnsupportedKind(String),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Contract violations: input that no stage should ever be handed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedInput {
    /// Text payload looks like binary data rather than text.
    #[error("text payload looks binary ({control_ratio:.0}% control characters)")]
    BinaryPayload { control_ratio: f64 },

    /// A record violates a structural invariant.
    #[error("invalid record field {field}: {reason}")]
    InvalidRecord { field: String, reason: String },
}

impl MalformedInput {
    pub(crate) fn record(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for the invox library.
pub type Result<T> = std::result::Result<T, InvoxError>;
