//! Batch driver: runs the pipeline over every file matching a pattern.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use glob::{Pattern, glob};
use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{InvoicePipeline, ProcessOptions};
use crate::error::{InvoxError, Result};
use crate::models::outcome::{FailureKind, PipelineStage, ProcessingOutcome};

/// Shared flag that stops a batch from starting further documents.
///
/// Documents already in flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl InvoicePipeline {
    /// Files in `directory` matching `pattern`, sorted by path.
    pub fn batch_files(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let base = Pattern::escape(&directory.to_string_lossy());
        let full = format!("{}/{}", base.trim_end_matches('/'), pattern);

        let mut files = Vec::new();
        for entry in glob(&full)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable batch entry: {}", e),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Process every file in `directory` matching `pattern`.
    ///
    /// Outcomes are returned in path order, one per matched file. A failing
    /// document yields a failed outcome and never aborts the batch.
    pub fn process_batch(
        &self,
        directory: &Path,
        pattern: &str,
        options: &ProcessOptions,
    ) -> Result<Vec<ProcessingOutcome>> {
        self.process_batch_with_cancel(directory, pattern, options, &CancellationToken::new())
    }

    /// Like [`process_batch`](Self::process_batch), but documents not yet
    /// started when `cancel` fires are reported as cancelled.
    pub fn process_batch_with_cancel(
        &self,
        directory: &Path,
        pattern: &str,
        options: &ProcessOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProcessingOutcome>> {
        if !directory.is_dir() {
            return Err(InvoxError::Config(format!(
                "batch directory {} does not exist",
                directory.display()
            )));
        }

        let files = self.batch_files(directory, pattern)?;
        info!(
            "Found {} files matching pattern {} in {}",
            files.len(),
            pattern,
            directory.display()
        );

        let workers = self.config.batch.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| InvoxError::Config(format!("failed to start batch workers: {}", e)))?;
        debug!("Batch pool started with {} workers", workers);

        let outcomes: Vec<ProcessingOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    if cancel.is_cancelled() {
                        cancelled(path)
                    } else {
                        self.process(path, options)
                    }
                })
                .collect()
        });

        let successful = outcomes.iter().filter(|o| o.success).count();
        info!("Batch complete: {}/{} successful", successful, outcomes.len());
        Ok(outcomes)
    }
}

fn cancelled(path: &Path) -> ProcessingOutcome {
    let mut metadata = BTreeMap::new();
    metadata.insert("file_path".to_string(), json!(path.display().to_string()));
    ProcessingOutcome::failed(
        FailureKind::Cancelled,
        "batch cancelled before processing started",
        PipelineStage::Received,
        Duration::ZERO,
        metadata,
    )
}
