// ==========================================
// Registry Ingest - cleaning / validation transform
// ==========================================
// Stage 2: RawRow → Accepted(CleanRecord) | Rejected(reason)
// Rules, in order:
//   1. key present after trim        (MissingKey)
//   2. key within its length cap     (KeyTooLong)
//   3. key shape                     (MalformedValue)
//   4. remaining fields: trim, empty → NULL, dates → yyyy-mm-dd,
//      presence / cap / allowed-set checks
// Deterministic; no store access.
// ==========================================

use crate::domain::record::{CleanRecord, RawRow, RowOutcome};
use crate::domain::report::CleanStats;
use crate::domain::types::{FieldKind, PipelineStage};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::dq_validator::DqValidator;
use crate::importer::error::{IngestError, IngestResult, RejectReason};
use crate::importer::ingest_trait::{
    DataCleaner as DataCleanerTrait, DqValidator as DqValidatorTrait,
};
use crate::registry::EntitySchema;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct RecordTransform {
    schema: &'static EntitySchema,
    cleaner: Box<dyn DataCleanerTrait>,
    validator: Box<dyn DqValidatorTrait>,
}

impl RecordTransform {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self::with_components(schema, Box::new(DataCleaner), Box::new(DqValidator))
    }

    pub fn with_components(
        schema: &'static EntitySchema,
        cleaner: Box<dyn DataCleanerTrait>,
        validator: Box<dyn DqValidatorTrait>,
    ) -> Self {
        Self {
            schema,
            cleaner,
            validator,
        }
    }

    pub fn apply(&self, raw: &RawRow) -> RowOutcome {
        match self.clean(raw) {
            Ok(values) => RowOutcome::Accepted(CleanRecord {
                line: raw.line,
                values,
            }),
            Err(reason) => RowOutcome::Rejected {
                line: raw.line,
                reason,
            },
        }
    }

    fn clean(&self, raw: &RawRow) -> Result<Vec<Option<String>>, RejectReason> {
        let schema = self.schema;
        let key_field = schema.key_field();

        // Rules 1-3 on the key
        let key = self.cleaner.normalize_null(raw.field(schema.key_index));
        self.validator.validate_field(key_field, key.as_deref())?;
        if let Some(key) = key.as_deref() {
            self.validator
                .validate_key_format(key_field, schema.key_format, key)?;
        }

        // Rule 4 on every field, key included so its slot is filled
        let mut values = Vec::with_capacity(schema.fields.len());
        for (index, field) in schema.fields.iter().enumerate() {
            let mut value = self.cleaner.normalize_null(raw.field(index));
            if field.kind == FieldKind::Date {
                if let Some(text) = value.take() {
                    value = self.cleaner.reformat_date(&text);
                    if value.is_none() {
                        tracing::debug!(
                            entity = %schema.entity,
                            line = raw.line,
                            field = field.header,
                            raw = %text,
                            "unparseable date stored as NULL"
                        );
                    }
                }
            }
            if index != schema.key_index {
                self.validator.validate_field(field, value.as_deref())?;
            }
            values.push(value);
        }

        Ok(values)
    }
}

// ==========================================
// Clean stage (async task between the two channels)
// ==========================================

/// Cleans every raw batch from `rx` and forwards accepted records to `tx`
///
/// Logs a progress line every `progress_interval` rows.
pub async fn run_clean_stage(
    transform: RecordTransform,
    mut rx: mpsc::Receiver<Vec<RawRow>>,
    tx: mpsc::Sender<Vec<CleanRecord>>,
    progress_interval: u64,
    cancel: CancellationToken,
) -> IngestResult<CleanStats> {
    let entity = transform.schema.entity;
    let mut stats = CleanStats::default();
    let mut seen: u64 = 0;

    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(IngestError::Cancelled { stage: PipelineStage::Clean });
            }
            batch = rx.recv() => match batch {
                Some(batch) => batch,
                None => break,
            },
        };

        let mut accepted = Vec::with_capacity(batch.len());
        for raw in &batch {
            match transform.apply(raw) {
                RowOutcome::Accepted(record) => {
                    stats.cleaned += 1;
                    accepted.push(record);
                }
                RowOutcome::Rejected { line, reason } => {
                    tracing::debug!(%entity, line, reason = %reason, "row skipped");
                    stats.record_rejection(reason.kind());
                }
            }

            seen += 1;
            if seen % progress_interval == 0 {
                tracing::info!(
                    %entity,
                    rows = seen,
                    cleaned = stats.cleaned,
                    skipped = stats.skipped,
                    "cleaning progress"
                );
            }
        }

        if !accepted.is_empty() && tx.send(accepted).await.is_err() {
            // loader gone; it reports its own failure
            tracing::debug!(%entity, "staging channel closed, clean stage stopping");
            break;
        }
    }

    tracing::debug!(%entity, ?stats, "clean stage finished");
    Ok(stats)
}
