// ==========================================
// Registry Ingest - run reporter
// ==========================================
// Folds per-stage counters into a RunReport, logs it, and stores
// it in ingest_run. Observational only: a failure here is logged
// and never changes the outcome of the run.
// ==========================================

use crate::domain::report::{CleanStats, MergeOutcome, RunReport, RunStatus, SourceStats};
use crate::domain::types::{EntityType, PipelineStage, RejectKind};
use crate::importer::error::{IngestError, IngestResult};
use crate::repository::run_repo::RunRepository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Identity and clock of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub entity: EntityType,
    pub source_path: String,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl RunContext {
    pub fn new(entity: EntityType, source_path: &Path) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            entity,
            source_path: source_path.display().to_string(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }
}

/// Counters gathered so far; stages fill their slot when they finish
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    pub source: SourceStats,
    pub cleaning: CleanStats,
    pub merge: MergeOutcome,
}

pub struct RunReporter {
    repo: RunRepository,
}

impl RunReporter {
    pub fn new(repo: RunRepository) -> Self {
        Self { repo }
    }

    pub fn build(
        ctx: &RunContext,
        progress: RunProgress,
        error: Option<&IngestError>,
    ) -> RunReport {
        let (status, failed_stage) = match error {
            None => (RunStatus::Completed, None),
            Some(e) if e.is_cancelled() => (RunStatus::Cancelled, Some(e.stage())),
            Some(e) => (RunStatus::Failed, Some(e.stage())),
        };

        RunReport {
            run_id: ctx.run_id.clone(),
            entity: ctx.entity,
            source_path: ctx.source_path.clone(),
            status,
            started_at: ctx.started_at,
            finished_at: Utc::now(),
            elapsed_ms: ctx.started.elapsed().as_millis() as u64,
            source: progress.source,
            cleaning: progress.cleaning,
            merge: progress.merge,
            failed_stage,
            error: error.map(|e| e.to_string()),
        }
    }

    /// One structured line with every counter, zeros included
    pub fn log_summary(report: &RunReport) {
        let c = &report.cleaning;
        let m = &report.merge;

        if report.is_success() {
            tracing::info!(
                run_id = %report.run_id,
                entity = %report.entity,
                status = %report.status,
                rows_read = report.source.rows_read,
                lossy_rows = report.source.lossy_rows,
                unreadable_rows = report.source.unreadable_rows,
                ragged_rows = report.source.ragged_rows,
                cleaned = c.cleaned,
                skipped = c.skipped,
                missing_key = c.rejected(RejectKind::MissingKey),
                key_too_long = c.rejected(RejectKind::KeyTooLong),
                malformed_value = c.rejected(RejectKind::MalformedValue),
                staged = m.staged,
                duplicates = m.duplicates,
                orphans = m.orphans,
                inserted = m.inserted,
                updated = m.updated,
                unchanged_existing = m.unchanged_existing,
                soft_ref_misses = m.soft_ref_misses,
                final_count = m.final_count,
                elapsed_ms = report.elapsed_ms,
                "run summary"
            );
        } else {
            tracing::error!(
                run_id = %report.run_id,
                entity = %report.entity,
                status = %report.status,
                stage = ?report.failed_stage,
                error = report.error.as_deref().unwrap_or(""),
                rows_read = report.source.rows_read,
                cleaned = c.cleaned,
                skipped = c.skipped,
                elapsed_ms = report.elapsed_ms,
                "run aborted"
            );
        }
    }

    /// Stores the report; failures are logged and swallowed
    pub fn persist(&self, report: &RunReport) {
        if let Err(e) = self.repo.insert_run(report) {
            tracing::warn!(run_id = %report.run_id, error = %e, "could not store run report");
        }
    }
}

/// Writes any serializable report (one run or a refresh) as pretty JSON
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> IngestResult<()> {
    let internal = |message: String| IngestError::Internal {
        stage: PipelineStage::Report,
        message,
    };

    let file = std::fs::File::create(path)
        .map_err(|e| internal(format!("cannot create {}: {}", path.display(), e)))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| internal(format!("cannot write {}: {}", path.display(), e)))?;
    writer
        .flush()
        .map_err(|e| internal(format!("cannot flush {}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn ctx() -> RunContext {
        RunContext::new(EntityType::Code, Path::new("code.csv"))
    }

    #[test]
    fn test_build_completed_report() {
        let mut progress = RunProgress::default();
        progress.source.rows_read = 3;
        progress.cleaning.cleaned = 2;
        progress.cleaning.record_rejection(RejectKind::MissingKey);
        progress.merge.final_count = 2;

        let report = RunReporter::build(&ctx(), progress, None);
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.rows_read(), 3);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.final_count(), 2);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_build_failed_and_cancelled_reports() {
        let err = IngestError::bulk(PipelineStage::Staging, "boom");
        let report = RunReporter::build(&ctx(), RunProgress::default(), Some(&err));
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.failed_stage, Some(PipelineStage::Staging));

        let err = IngestError::Cancelled {
            stage: PipelineStage::Merge,
        };
        let report = RunReporter::build(&ctx(), RunProgress::default(), Some(&err));
        assert_eq!(report.status, RunStatus::Cancelled);
    }

    #[test]
    fn test_persist_and_reload() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = RunRepository::new(Arc::new(Mutex::new(conn)));
        let reporter = RunReporter::new(repo.clone());

        let report = RunReporter::build(&ctx(), RunProgress::default(), None);
        reporter.persist(&report);

        let stored = repo.latest_run("code").unwrap().unwrap();
        assert_eq!(stored.run_id, report.run_id);
        assert_eq!(stored.cleaning.rejected(RejectKind::KeyTooLong), 0);
    }

    #[test]
    fn test_persist_failure_is_swallowed() {
        // no schema: insert fails, persist must not panic
        let conn = Connection::open_in_memory().unwrap();
        let reporter = RunReporter::new(RunRepository::new(Arc::new(Mutex::new(conn))));
        reporter.persist(&RunReporter::build(&ctx(), RunProgress::default(), None));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = RunReporter::build(&ctx(), RunProgress::default(), None);

        write_json(&report, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["entity"], "code");
        assert_eq!(value["merge"]["orphans"], 0);
    }
}
