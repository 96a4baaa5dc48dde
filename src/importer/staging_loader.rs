// ==========================================
// Registry Ingest - staging loader
// ==========================================
// Stage 3: accepted records → run-scoped staging table.
// One consumer on one ordered channel, so staging rowid order
// equals source file order. No constraints are checked here.
// ==========================================

use crate::domain::record::CleanRecord;
use crate::domain::types::PipelineStage;
use crate::importer::error::{IngestError, IngestResult};
use crate::perf::PerfGuard;
use crate::repository::staging_repo::StagingTable;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Appends every batch from `rx`; runs on a blocking thread
///
/// # Returns
/// - Ok(staging): channel drained, staging holds exactly the accepted records
/// - Err(BulkLoadFailure | Cancelled): staging is dropped with the error
pub fn run_load_stage(
    mut staging: StagingTable,
    mut rx: mpsc::Receiver<Vec<CleanRecord>>,
    entity: &'static str,
    cancel: CancellationToken,
) -> IngestResult<StagingTable> {
    let _perf = PerfGuard::new("staging", entity);
    let mut batches: u64 = 0;

    while let Some(batch) = rx.blocking_recv() {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled {
                stage: PipelineStage::Staging,
            });
        }

        staging
            .append_batch(&batch)
            .map_err(|e| IngestError::bulk(PipelineStage::Staging, e))?;
        batches += 1;

        tracing::debug!(
            entity,
            batch = batches,
            rows = batch.len(),
            total = staging.appended(),
            "batch staged"
        );
    }

    if cancel.is_cancelled() {
        return Err(IngestError::Cancelled {
            stage: PipelineStage::Staging,
        });
    }

    tracing::info!(entity, rows = staging.appended(), batches, "staging complete");
    Ok(staging)
}
