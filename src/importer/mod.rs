// ==========================================
// Registry Ingest - importer layer
// ==========================================
// Flow: CSV source → clean/validate → staging → merge → report
// Every stage is generic over the registry descriptor.
// ==========================================

pub mod conflict_handler;
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod file_parser;
pub mod ingest_pipeline;
pub mod ingest_trait;
pub mod merge_engine;
pub mod record_transform;
pub mod run_reporter;
pub mod staging_loader;

pub use conflict_handler::ConflictHandler;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use dq_validator::DqValidator as DqValidatorImpl;
pub use error::{IngestError, IngestResult, RejectReason};
pub use file_parser::{BoundSource, CsvSource};
pub use ingest_pipeline::IngestPipeline;
pub use merge_engine::MergeEngine;
pub use record_transform::RecordTransform;
pub use run_reporter::{write_json, RunContext, RunProgress, RunReporter};

pub use ingest_trait::{DataCleaner, DqValidator, Ingestor};
