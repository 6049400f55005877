//! Configuration structures for the invoice pipeline.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InvoxError;

/// Main configuration for the invox pipeline.
///
/// Read once at pipeline construction and shared read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoxConfig {
    /// Text acquisition configuration.
    pub acquisition: AcquisitionConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Business-rule validation configuration.
    pub validation: ValidationConfig,

    /// Pre-flight file checks.
    pub guardrail: GuardrailConfig,

    /// Batch driver configuration.
    pub batch: BatchConfig,
}

/// Text acquisition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Minimum non-whitespace characters for PDF text, from the text layer
    /// or page OCR, to be trusted.
    pub min_native_chars: usize,

    /// Maximum pages to OCR (0 = unlimited).
    pub max_pages: usize,

    /// Try the native text layer before falling back to OCR.
    pub prefer_native_text: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            min_native_chars: 50,
            max_pages: 10,
            prefer_native_text: true,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition language code.
    pub language: String,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Maximum image dimension (longer side) for processing.
    pub max_image_size: u32,

    /// Apply a median filter before recognition.
    pub denoise: bool,

    /// Percentage of darkest/lightest pixels clipped by autocontrast.
    pub autocontrast_cutoff: f32,

    /// Minimum orientation confidence needed to rotate a page.
    pub orientation_min_confidence: f32,

    /// Keep `[UNK]` tokens in recognized text.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            max_image_size: 2048,
            denoise: true,
            autocontrast_cutoff: 1.0,
            orientation_min_confidence: 0.6,
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Model family prefix for the configured language.
    fn script(&self) -> &str {
        match self.language.as_str() {
            "eng" | "en" | "latin" | "deu" | "fra" | "spa" | "ita" | "pol" | "por" | "nld" => "latin",
            other => other,
        }
    }

    /// Recognition model file name for the configured language.
    pub fn recognition_model(&self) -> String {
        format!("{}_rec.onnx", self.script())
    }

    /// Character dictionary file name for the configured language.
    pub fn dictionary(&self) -> String {
        format!("{}_dict.txt", self.script())
    }

    /// Full paths of the detection model, recognition model and dictionary.
    pub fn model_paths(&self) -> [PathBuf; 3] {
        [
            self.model_dir.join(&self.detection_model),
            self.model_dir.join(self.recognition_model()),
            self.model_dir.join(self.dictionary()),
        ]
    }
}

/// Which extractor implementation the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Deterministic pattern-matching rules.
    #[default]
    Rules,
}

/// How ambiguous numeric dates like `03/04/2024` are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// `MM/DD/YYYY`
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY`
    DayFirst,
}

/// Weights of the signal-count confidence heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    /// Score added per resolved signal.
    pub signal_weight: f64,

    /// Score added when line items were parsed from a table.
    pub line_items_bonus: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            signal_weight: 0.18,
            line_items_bonus: 0.10,
        }
    }
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Extractor implementation.
    pub strategy: ExtractionStrategy,

    /// Currency used when none is detected.
    pub default_currency: String,

    /// Reading of ambiguous numeric dates.
    pub date_order: DateOrder,

    /// Confidence heuristic weights.
    pub confidence: ConfidenceWeights,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractionStrategy::Rules,
            default_currency: "USD".to_string(),
            date_order: DateOrder::MonthFirst,
            confidence: ConfidenceWeights::default(),
        }
    }
}

/// Business-rule validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Extraction confidence below which a warning is emitted.
    pub confidence_threshold: f64,

    /// Allowed |total - (line items + tax)| before a warning.
    pub arithmetic_tolerance: Decimal,

    /// Mismatch beyond which the arithmetic finding becomes an error.
    pub arithmetic_error_tolerance: Option<Decimal>,

    /// Amount by which an invoice may exceed its purchase order.
    pub po_amount_tolerance: Decimal,

    /// Largest acceptable invoice total.
    pub max_amount: Option<Decimal>,

    /// Reject invoices without a purchase order number.
    pub require_po: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            arithmetic_tolerance: Decimal::new(1, 2),
            arithmetic_error_tolerance: None,
            po_amount_tolerance: Decimal::ZERO,
            max_amount: Some(Decimal::new(10_000_000, 2)),
            require_po: false,
        }
    }
}

/// Pre-flight file check configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Lower-case extensions accepted for processing.
    pub allowed_extensions: Vec<String>,

    /// Maximum file size in megabytes.
    pub max_file_size_mb: u64,

    /// Only accept files inside this directory.
    pub trusted_dir: Option<PathBuf>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["pdf", "png", "jpg", "jpeg", "tif", "tiff", "bmp"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_file_size_mb: 10,
            trusted_dir: None,
        }
    }
}

impl GuardrailConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Batch driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads used for batch processing.
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl InvoxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), InvoxError> {
        let threshold = self.validation.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(InvoxError::Config(format!(
                "validation.confidence_threshold {} is outside [0, 1]",
                threshold
            )));
        }
        if self.validation.arithmetic_tolerance < Decimal::ZERO
            || self.validation.po_amount_tolerance < Decimal::ZERO
        {
            return Err(InvoxError::Config("tolerances must not be negative".to_string()));
        }
        if let Some(error_tolerance) = self.validation.arithmetic_error_tolerance {
            if error_tolerance < self.validation.arithmetic_tolerance {
                return Err(InvoxError::Config(
                    "validation.arithmetic_error_tolerance must not be below arithmetic_tolerance"
                        .to_string(),
                ));
            }
        }
        let weights = &self.extraction.confidence;
        if weights.signal_weight < 0.0 || weights.line_items_bonus < 0.0 {
            return Err(InvoxError::Config("confidence weights must not be negative".to_string()));
        }
        let currency = &self.extraction.default_currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(InvoxError::Config(format!(
                "extraction.default_currency '{}' is not a 3-letter code",
                currency
            )));
        }
        if self.batch.workers == 0 {
            return Err(InvoxError::Config("batch.workers must be at least 1".to_string()));
        }
        if self.guardrail.allowed_extensions.is_empty() {
            return Err(InvoxError::Config("guardrail.allowed_extensions is empty".to_string()));
        }
        Ok(())
    }
}

impl FromStr for DateOrder {
    type Err = InvoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month_first" | "mdy" | "us" => Ok(DateOrder::MonthFirst),
            "day_first" | "dmy" | "eu" => Ok(DateOrder::DayFirst),
            other => Err(InvoxError::Config(format!("unknown date order '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = InvoxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction.default_currency, "USD");
        assert_eq!(config.validation.max_amount, Some(Decimal::new(100_000, 0)));
        assert_eq!(config.guardrail.max_file_size_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: InvoxConfig =
            serde_json::from_str(r#"{"validation": {"confidence_threshold": 0.5}}"#).unwrap();
        assert_eq!(config.validation.confidence_threshold, 0.5);
        assert_eq!(config.batch.workers, 4);
        assert_eq!(config.ocr.language, "eng");
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = InvoxConfig::default();
        config.validation.confidence_threshold = 1.5;
        assert!(matches!(config.validate(), Err(InvoxError::Config(_))));
    }

    #[test]
    fn test_model_paths_follow_language() {
        let mut config = OcrConfig::default();
        assert_eq!(config.recognition_model(), "latin_rec.onnx");
        config.language = "cyrillic".to_string();
        assert_eq!(config.dictionary(), "cyrillic_dict.txt");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = InvoxConfig::default();
        config.batch.workers = 2;
        config.save(&path).unwrap();

        let loaded = InvoxConfig::from_file(&path).unwrap();
        assert_eq!(loaded.batch.workers, 2);
    }

    #[test]
    fn test_date_order_from_str() {
        assert_eq!("dmy".parse::<DateOrder>().unwrap(), DateOrder::DayFirst);
        assert!("sideways".parse::<DateOrder>().is_err());
    }
}
