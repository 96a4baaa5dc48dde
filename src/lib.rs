// ==========================================
// Registry Ingest - core library
// ==========================================
// Bulk CSV ingestion of business-registry extracts into SQLite:
// streaming parse → clean/validate → staged bulk load → merge
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain layer - entity tags, records, counters
pub mod domain;

// Record schema registry - static per-entity descriptors
pub mod registry;

// Repository layer - data access
pub mod repository;

// Importer layer - pipeline stages and orchestration
pub mod importer;

// Config layer - config_kv / env / CLI resolution
pub mod config;

// Database infrastructure (connection PRAGMAs, bootstrap DDL)
pub mod db;

// Logging
pub mod logging;

// SQL statement accounting
pub mod perf;

// ==========================================
// Re-exports
// ==========================================

pub use config::{ConfigManager, IngestConfig};
pub use domain::types::{ConflictPolicy, DedupPolicy, EntityType, PipelineStage, RejectKind};
pub use domain::{MergeOutcome, RunReport, RunStatus};
pub use importer::{IngestError, IngestPipeline, IngestResult, Ingestor};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "registry-ingest";
