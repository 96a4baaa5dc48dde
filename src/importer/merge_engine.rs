// ==========================================
// Registry Ingest - merge engine
// ==========================================
// Stage 4: staging → permanent table
//   1. dedup on identity (keep-first / keep-last by arrival order)
//   2. FK resolution; misses are orphans, never stored
//   3. conflict-safe insert (ignore | upsert)
// The only stage that mutates the permanent store.
// ==========================================

use crate::domain::report::MergeOutcome;
use crate::domain::types::{ConflictPolicy, PipelineStage};
use crate::importer::conflict_handler::ConflictHandler;
use crate::importer::error::{IngestError, IngestResult};
use crate::perf::PerfGuard;
use crate::registry::EntitySchema;
use crate::repository::merge_repo::{MergeCounts, MergeRepository};
use crate::repository::staging_repo::StagingTable;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct MergeEngine {
    schema: &'static EntitySchema,
    repo: MergeRepository,
}

impl MergeEngine {
    pub fn new(schema: &'static EntitySchema, conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            schema,
            repo: MergeRepository::new(conn),
        }
    }

    /// Merges the staged rows in a single transaction
    ///
    /// # Returns
    /// - Ok(MergeOutcome): committed counts
    /// - Err(BulkLoadFailure): nothing committed
    pub fn merge(&self, staging: &StagingTable) -> IngestResult<MergeOutcome> {
        let schema = self.schema;
        let _perf = PerfGuard::new("merge", schema.entity.tag());

        let plan = ConflictHandler::new(schema, staging.qualified_name()).build_plan();
        let counts = self
            .repo
            .execute_plan(&plan)
            .map_err(|e| IngestError::bulk(PipelineStage::Merge, e))?;

        let outcome = Self::outcome(schema.conflict_policy, counts);
        self.log_anomalies(&outcome);
        Ok(outcome)
    }

    fn outcome(policy: ConflictPolicy, counts: MergeCounts) -> MergeOutcome {
        let (inserted, updated, unchanged_existing) = match policy {
            ConflictPolicy::Upsert => (
                counts.candidates.saturating_sub(counts.existing),
                counts.existing,
                0,
            ),
            ConflictPolicy::Ignore => (counts.affected, 0, counts.existing),
        };

        MergeOutcome {
            staged: counts.staged,
            duplicates: counts.duplicates,
            duplicate_samples: counts.duplicate_samples,
            orphans: counts.orphans,
            inserted,
            updated,
            unchanged_existing,
            soft_ref_misses: counts.soft_ref_misses,
            final_count: counts.final_count,
        }
    }

    fn log_anomalies(&self, outcome: &MergeOutcome) {
        let entity = self.schema.entity;

        if outcome.duplicates > 0 {
            let samples: Vec<&str> = outcome
                .duplicate_samples
                .iter()
                .map(|s| s.key.as_str())
                .collect();
            tracing::warn!(
                %entity,
                duplicates = outcome.duplicates,
                policy = %self.schema.dedup_policy,
                ?samples,
                "duplicate identities discarded"
            );
        }
        if outcome.orphans > 0 {
            tracing::warn!(%entity, orphans = outcome.orphans, "rows without parent not stored");
        }
        if outcome.soft_ref_misses > 0 {
            tracing::warn!(
                %entity,
                misses = outcome.soft_ref_misses,
                "rows reference unknown codes"
            );
        }
        tracing::debug!(%entity, ?outcome, "merge committed");
    }
}
