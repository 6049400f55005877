//! Data models shared by the pipeline stages.

pub mod config;
pub mod invoice;
pub mod outcome;
pub mod validation;

pub use config::InvoxConfig;
pub use invoice::{InvoiceRecord, InvoiceStatus, LineItem, LineItemOrigin};
pub use outcome::{FailureKind, PipelineStage, ProcessingOutcome};
pub use validation::ValidationResult;
