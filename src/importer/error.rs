// ==========================================
// Registry Ingest - importer error types
// ==========================================
// IngestError:  fatal, aborts the run, names the failing stage
// RejectReason: per-row, recovered, counted as skipped
// Tool: thiserror derive
// ==========================================

use crate::domain::types::{PipelineStage, RejectKind};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// Fatal pipeline error.
#[derive(Error, Debug)]
pub enum IngestError {
    // ===== Setup errors =====
    #[error("[setup] unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("[setup] invalid configuration (key: {key}): {message}")]
    Config { key: String, message: String },

    #[error("[setup] run already in progress for {entity} (holder {holder}, since {since})")]
    RunInProgress {
        entity: String,
        holder: String,
        since: String,
    },

    // ===== Source errors =====
    #[error("[source] cannot open {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[error("[source] header of {path} lacks required column {column}")]
    HeaderMismatch { path: String, column: String },

    // ===== Store errors =====
    #[error("[{stage}] bulk load failed: {message}")]
    BulkLoadFailure {
        stage: PipelineStage,
        message: String,
    },

    // ===== Control flow =====
    #[error("[{stage}] run cancelled")]
    Cancelled { stage: PipelineStage },

    // ===== Generic =====
    #[error("[{stage}] internal error: {message}")]
    Internal {
        stage: PipelineStage,
        message: String,
    },
}

impl IngestError {
    /// Stage the error is attributed to.
    pub fn stage(&self) -> PipelineStage {
        match self {
            IngestError::UnknownEntityType(_)
            | IngestError::Config { .. }
            | IngestError::RunInProgress { .. } => PipelineStage::Setup,
            IngestError::SourceUnavailable { .. } | IngestError::HeaderMismatch { .. } => {
                PipelineStage::Source
            }
            IngestError::BulkLoadFailure { stage, .. }
            | IngestError::Cancelled { stage }
            | IngestError::Internal { stage, .. } => *stage,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, IngestError::Cancelled { .. })
    }

    /// Wraps a store failure raised while running `stage`.
    pub fn bulk(stage: PipelineStage, err: impl std::fmt::Display) -> Self {
        IngestError::BulkLoadFailure {
            stage,
            message: err.to_string(),
        }
    }
}

impl From<RepositoryError> for IngestError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockHeld {
                entity,
                holder,
                since,
            } => IngestError::RunInProgress {
                entity,
                holder,
                since,
            },
            other => IngestError::bulk(PipelineStage::Setup, other),
        }
    }
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestError::Internal {
            stage: PipelineStage::Setup,
            message: format!("stage task failed: {}", err),
        }
    }
}

/// Per-row rejection produced by the cleaning transform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("required field {field} is empty")]
    MissingKey { field: String },

    #[error("key {field} has {len} characters (max {max})")]
    KeyTooLong { field: String, len: usize, max: usize },

    #[error("field {field}: {detail}")]
    MalformedValue { field: String, detail: String },
}

impl RejectReason {
    pub fn kind(&self) -> RejectKind {
        match self {
            RejectReason::MissingKey { .. } => RejectKind::MissingKey,
            RejectReason::KeyTooLong { .. } => RejectKind::KeyTooLong,
            RejectReason::MalformedValue { .. } => RejectKind::MalformedValue,
        }
    }
}

/// Result alias
pub type IngestResult<T> = Result<T, IngestError>;
