//! Pre-flight file checks run before any document parsing.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::GuardrailViolation;
use crate::models::config::GuardrailConfig;

/// Decides whether a file may enter the pipeline.
pub trait Guardrail: Send + Sync {
    fn check(&self, path: &Path) -> Result<(), GuardrailViolation>;
}

/// Guardrail backed by the file system: existence, extension allow-list,
/// trusted directory containment and size ceiling, checked in that order.
#[derive(Debug, Clone)]
pub struct FileGuardrail {
    allowed_extensions: Vec<String>,
    max_size: u64,
    trusted_dir: Option<PathBuf>,
}

impl FileGuardrail {
    pub fn new(config: &GuardrailConfig) -> Self {
        Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            max_size: config.max_file_size_bytes(),
            trusted_dir: config.trusted_dir.clone(),
        }
    }

    fn check_extension(&self, path: &Path) -> Result<(), GuardrailViolation> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if self.allowed_extensions.iter().any(|allowed| *allowed == extension) {
            Ok(())
        } else {
            Err(GuardrailViolation::DisallowedExtension {
                extension,
                allowed: self.allowed_extensions.join(", "),
            })
        }
    }

    fn check_trusted_dir(&self, path: &Path) -> Result<(), GuardrailViolation> {
        let Some(directory) = &self.trusted_dir else {
            return Ok(());
        };

        let outside = || GuardrailViolation::OutsideTrustedDirectory {
            path: path.to_path_buf(),
            directory: directory.clone(),
        };

        // Canonical forms resolve `..` and symlinks before comparison
        let resolved = path.canonicalize().map_err(|_| outside())?;
        let root = directory.canonicalize().map_err(|_| outside())?;
        if resolved.starts_with(&root) {
            Ok(())
        } else {
            Err(outside())
        }
    }
}

impl Default for FileGuardrail {
    fn default() -> Self {
        Self::new(&GuardrailConfig::default())
    }
}

impl Guardrail for FileGuardrail {
    fn check(&self, path: &Path) -> Result<(), GuardrailViolation> {
        let metadata = std::fs::metadata(path)
            .map_err(|_| GuardrailViolation::NotFound(path.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(GuardrailViolation::NotAFile(path.to_path_buf()));
        }

        self.check_extension(path)?;
        self.check_trusted_dir(path)?;

        let size = metadata.len();
        if size > self.max_size {
            return Err(GuardrailViolation::TooLarge {
                size,
                max: self.max_size,
            });
        }

        debug!("Guardrail passed for {} ({} bytes)", path.display(), size);
        Ok(())
    }
}
