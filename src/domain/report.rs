// ==========================================
// Registry Ingest - run counters and report
// ==========================================
// Each stage owns its own counter struct; the reporter folds
// them into one RunReport at the end of the run.
// ==========================================

use crate::domain::types::{EntityType, PipelineStage, RejectKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Source stage
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    /// Data rows yielded to cleaning (header excluded)
    pub rows_read: u64,
    /// Rows with invalid UTF-8 replaced by U+FFFD
    pub lossy_rows: u64,
    /// Rows the tokenizer could not decode; never yielded
    pub unreadable_rows: u64,
    /// Rows padded or truncated to the header width
    pub ragged_rows: u64,
}

// ==========================================
// Clean stage
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanStats {
    pub cleaned: u64,
    pub skipped: u64,
    pub rejections: BTreeMap<RejectKind, u64>,
}

impl Default for CleanStats {
    fn default() -> Self {
        Self {
            cleaned: 0,
            skipped: 0,
            rejections: RejectKind::ALL.iter().map(|kind| (*kind, 0)).collect(),
        }
    }
}

impl CleanStats {
    pub fn record_rejection(&mut self, kind: RejectKind) {
        self.skipped += 1;
        *self.rejections.entry(kind).or_insert(0) += 1;
    }

    pub fn rejected(&self, kind: RejectKind) -> u64 {
        self.rejections.get(&kind).copied().unwrap_or(0)
    }
}

// ==========================================
// Merge stage
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSample {
    pub key: String,
    pub occurrences: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Rows present in staging when the merge started
    pub staged: u64,
    /// Staged rows discarded by deduplication
    pub duplicates: u64,
    pub duplicate_samples: Vec<DuplicateSample>,
    /// Deduplicated rows whose parent key is absent
    pub orphans: u64,
    pub inserted: u64,
    /// Upsert hits on existing keys
    pub updated: u64,
    /// Ignore-policy hits on existing identities
    pub unchanged_existing: u64,
    /// Stored rows pointing at an unknown reference code (warn only)
    pub soft_ref_misses: u64,
    /// Permanent table row count after the merge committed
    pub final_count: u64,
}

// ==========================================
// Run report
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub entity: EntityType,
    pub source_path: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub source: SourceStats,
    pub cleaning: CleanStats,
    pub merge: MergeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<PipelineStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn rows_read(&self) -> u64 {
        self.source.rows_read
    }

    pub fn cleaned(&self) -> u64 {
        self.cleaning.cleaned
    }

    pub fn skipped(&self) -> u64 {
        self.cleaning.skipped
    }

    pub fn duplicates(&self) -> u64 {
        self.merge.duplicates
    }

    pub fn orphans(&self) -> u64 {
        self.merge.orphans
    }

    pub fn final_count(&self) -> u64 {
        self.merge.final_count
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
