// ==========================================
// Registry Ingest - domain layer
// ==========================================
// Plain data shared by every stage: entity tags, policies,
// row records and run counters. No store or IO access here.
// ==========================================

pub mod record;
pub mod report;
pub mod types;

pub use record::{CleanRecord, RawRow, RowOutcome};
pub use report::{
    CleanStats, DuplicateSample, MergeOutcome, RunReport, RunStatus, SourceStats,
};
pub use types::{
    ConflictPolicy, DedupPolicy, EntityType, FieldKind, KeyFormat, PipelineStage, RejectKind,
};
