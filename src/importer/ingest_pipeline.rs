// ==========================================
// Registry Ingest - pipeline orchestrator
// ==========================================
// Flow: source → clean → stage (concurrent, bounded channels)
//       → merge (one transaction) → report
// One generic pipeline, parameterized by the registry descriptor.
// ==========================================

use crate::config::IngestConfig;
use crate::domain::report::{MergeOutcome, RunReport};
use crate::domain::types::{EntityType, PipelineStage};
use crate::importer::error::{IngestError, IngestResult};
use crate::importer::file_parser::{run_source_stage, CsvSource};
use crate::importer::ingest_trait::Ingestor;
use crate::importer::merge_engine::MergeEngine;
use crate::importer::record_transform::{run_clean_stage, RecordTransform};
use crate::importer::run_reporter::{RunContext, RunProgress, RunReporter};
use crate::importer::staging_loader::run_load_stage;
use crate::registry::{self, EntitySchema};
use crate::repository::run_repo::{RunLockGuard, RunRepository};
use crate::repository::staging_repo::StagingTable;
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

// ==========================================
// IngestPipeline
// ==========================================
pub struct IngestPipeline {
    conn: Arc<Mutex<Connection>>,
    config: IngestConfig,
    cancel: CancellationToken,
}

impl IngestPipeline {
    /// # Arguments
    /// - conn: connection owned by this pipeline (staging tables are TEMP on it)
    /// - config: resolved and validated tuning knobs
    pub fn new(conn: Arc<Mutex<Connection>>, config: IngestConfig) -> Self {
        Self {
            conn,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn check_cancelled(&self, stage: PipelineStage) -> IngestResult<()> {
        if self.cancel.is_cancelled() {
            Err(IngestError::Cancelled { stage })
        } else {
            Ok(())
        }
    }

    /// Stages 1-4; fills `progress` as each stage completes
    async fn execute(
        &self,
        schema: &'static EntitySchema,
        ctx: &RunContext,
        file_path: &Path,
        progress: &mut RunProgress,
    ) -> IngestResult<MergeOutcome> {
        self.check_cancelled(PipelineStage::Setup)?;

        // Nothing touches the store before the source is known good
        let source = CsvSource::open(file_path)?.bind(schema)?;

        let _lock = RunLockGuard::acquire(
            RunRepository::new(self.conn.clone()),
            schema.entity.tag(),
            &ctx.run_id,
            self.config.lock_ttl_secs,
        )?;

        let staging = StagingTable::create(self.conn.clone(), schema, &ctx.run_id)
            .map_err(|e| IngestError::bulk(PipelineStage::Staging, e))?;

        let (raw_tx, raw_rx) = mpsc::channel(self.config.channel_capacity);
        let (clean_tx, clean_rx) = mpsc::channel(self.config.channel_capacity);

        let batch_size = self.config.batch_size;
        let reader_cancel = self.cancel.clone();
        let reader = tokio::task::spawn_blocking(move || {
            run_source_stage(source, raw_tx, batch_size, reader_cancel)
        });

        let cleaner = tokio::spawn(run_clean_stage(
            RecordTransform::new(schema),
            raw_rx,
            clean_tx,
            self.config.progress_interval,
            self.cancel.clone(),
        ));

        let tag = schema.entity.tag();
        let loader_cancel = self.cancel.clone();
        let loader =
            tokio::task::spawn_blocking(move || run_load_stage(staging, clean_rx, tag, loader_cancel));

        let (read, cleaned, loaded) = futures::future::join3(reader, cleaner, loader).await;

        // reader errors explain cleaner/loader errors, not the other way round
        let read = read?;
        let cleaned = cleaned?;
        let loaded = loaded?;
        progress.source = read?;
        progress.cleaning = cleaned?;
        let staging = loaded?;

        debug!(
            entity = tag,
            rows_read = progress.source.rows_read,
            staged = staging.appended(),
            "ingest stages drained"
        );

        self.check_cancelled(PipelineStage::Merge)?;

        let engine = MergeEngine::new(schema, self.conn.clone());
        let outcome = tokio::task::spawn_blocking(move || {
            let outcome = engine.merge(&staging);
            drop(staging);
            outcome
        })
        .await??;

        progress.merge = outcome.clone();
        Ok(outcome)
    }
}

#[async_trait]
impl Ingestor for IngestPipeline {
    #[instrument(skip(self, file_path), fields(path = %file_path.display()))]
    async fn ingest_file(&self, entity: EntityType, file_path: &Path) -> IngestResult<RunReport> {
        let schema = registry::schema_for(entity);
        let ctx = RunContext::new(entity, file_path);
        let reporter = RunReporter::new(RunRepository::new(self.conn.clone()));

        info!(
            run_id = %ctx.run_id,
            table = schema.table,
            conflict = %schema.conflict_policy,
            dedup = %schema.dedup_policy,
            "ingest started"
        );

        let mut progress = RunProgress::default();
        let result = self.execute(schema, &ctx, file_path, &mut progress).await;

        let report = RunReporter::build(&ctx, progress, result.as_ref().err());
        RunReporter::log_summary(&report);

        match result {
            Ok(_) => {
                reporter.persist(&report);
                Ok(report)
            }
            // a concurrent run owns this entity; leave its history alone
            Err(e @ IngestError::RunInProgress { .. }) => Err(e),
            Err(e) => {
                reporter.persist(&report);
                Err(e)
            }
        }
    }

    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    async fn full_refresh(&self, dir: &Path) -> IngestResult<Vec<RunReport>> {
        // every extract must exist before the first entity is touched
        let plan: Vec<(EntityType, std::path::PathBuf)> = registry::all()
            .iter()
            .map(|schema| (schema.entity, dir.join(schema.file_name)))
            .collect();

        for (_, path) in &plan {
            if !path.is_file() {
                return Err(IngestError::SourceUnavailable {
                    path: path.display().to_string(),
                    reason: "extract file missing".to_string(),
                });
            }
        }

        info!(entities = plan.len(), "full refresh started");

        let mut reports = Vec::with_capacity(plan.len());
        for (entity, path) in plan {
            self.check_cancelled(PipelineStage::Setup)?;
            reports.push(self.ingest_file(entity, &path).await?);
        }

        let total_rows: u64 = reports.iter().map(|r| r.rows_read()).sum();
        let total_orphans: u64 = reports.iter().map(|r| r.orphans()).sum();
        info!(
            entities = reports.len(),
            rows_read = total_rows,
            orphans = total_orphans,
            "full refresh completed"
        );
        Ok(reports)
    }
}
