// ==========================================
// Registry Ingest - streaming CSV source
// ==========================================
// Stage 1: file → header-aligned raw rows, lazily, one pass.
// Tolerates quoted delimiters/newlines, ragged rows and invalid
// UTF-8; only an unopenable file or an IO failure is fatal.
// ==========================================

use crate::domain::record::RawRow;
use crate::domain::report::SourceStats;
use crate::domain::types::PipelineStage;
use crate::importer::error::{IngestError, IngestResult};
use crate::registry::{EntitySchema, Presence};
use csv::{ByteRecord, ReaderBuilder};
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Individual warnings logged per category before going quiet
const WARN_LIMIT: u64 = 10;

fn decode(bytes: &[u8]) -> (String, bool) {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => (s.to_string(), false),
        Cow::Owned(s) => (s, true),
    }
}

// ==========================================
// CsvSource (opened, header read, not yet bound)
// ==========================================
pub struct CsvSource {
    path: String,
    reader: csv::Reader<File>,
    headers: Vec<String>,
}

impl CsvSource {
    /// Opens `path` and reads its header line
    ///
    /// # Returns
    /// - Err(SourceUnavailable): file missing, unreadable or not a file
    pub fn open(path: &Path) -> IngestResult<Self> {
        let display = path.display().to_string();
        let unavailable = |reason: String| IngestError::SourceUnavailable {
            path: display.clone(),
            reason,
        };

        let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(|e| unavailable(e.to_string()))?
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let (text, _) = decode(raw);
                let text = if i == 0 {
                    text.trim_start_matches('\u{feff}').to_string()
                } else {
                    text
                };
                text.trim().to_string()
            })
            .collect();

        Ok(Self {
            path: display,
            reader,
            headers,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Binds header columns to schema fields
    ///
    /// # Returns
    /// - Err(HeaderMismatch): a key column is absent
    ///
    /// Missing optional columns are logged and read as empty.
    pub fn bind(self, schema: &'static EntitySchema) -> IngestResult<BoundSource> {
        let mut indices = Vec::with_capacity(schema.fields.len());

        for field in schema.fields {
            let position = self.headers.iter().position(|h| h == field.header);
            if position.is_none() {
                if field.presence == Presence::Key {
                    return Err(IngestError::HeaderMismatch {
                        path: self.path,
                        column: field.header.to_string(),
                    });
                }
                tracing::warn!(
                    entity = %schema.entity,
                    path = %self.path,
                    column = field.header,
                    "column missing from header, values read as empty"
                );
            }
            indices.push(position);
        }

        let unknown: Vec<&String> = self
            .headers
            .iter()
            .filter(|h| !schema.fields.iter().any(|f| f.header == h.as_str()))
            .collect();
        if !unknown.is_empty() {
            tracing::debug!(entity = %schema.entity, columns = ?unknown, "ignoring extra columns");
        }

        Ok(BoundSource {
            header_width: self.headers.len(),
            path: self.path,
            reader: self.reader,
            indices,
            record: ByteRecord::new(),
            stats: SourceStats::default(),
        })
    }
}

// ==========================================
// BoundSource (the row iterator)
// ==========================================
pub struct BoundSource {
    path: String,
    reader: csv::Reader<File>,
    /// Header position of each schema field
    indices: Vec<Option<usize>>,
    header_width: usize,
    record: ByteRecord,
    stats: SourceStats,
}

impl BoundSource {
    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }

    pub fn into_stats(self) -> SourceStats {
        self.stats
    }

    fn to_raw_row(&mut self) -> RawRow {
        let line = self.record.position().map(|p| p.line()).unwrap_or(0);

        if self.record.len() != self.header_width {
            self.stats.ragged_rows += 1;
            if self.stats.ragged_rows <= WARN_LIMIT {
                tracing::debug!(
                    path = %self.path,
                    line,
                    columns = self.record.len(),
                    expected = self.header_width,
                    "ragged row padded/truncated"
                );
            }
        }

        let mut lossy = false;
        let fields = self
            .indices
            .iter()
            .map(|index| match index.and_then(|i| self.record.get(i)) {
                Some(bytes) => {
                    let (text, replaced) = decode(bytes);
                    lossy |= replaced;
                    text
                }
                None => String::new(),
            })
            .collect();

        if lossy {
            self.stats.lossy_rows += 1;
            if self.stats.lossy_rows <= WARN_LIMIT {
                tracing::warn!(path = %self.path, line, "invalid UTF-8 replaced with U+FFFD");
            }
        }

        RawRow {
            line,
            fields,
            lossy,
        }
    }
}

impl Iterator for BoundSource {
    type Item = IngestResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(false) => return None,
                Ok(true) => {
                    self.stats.rows_read += 1;
                    return Some(Ok(self.to_raw_row()));
                }
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                    return Some(Err(IngestError::SourceUnavailable {
                        path: self.path.clone(),
                        reason: e.to_string(),
                    }));
                }
                Err(e) => {
                    self.stats.unreadable_rows += 1;
                    if self.stats.unreadable_rows <= WARN_LIMIT {
                        tracing::warn!(path = %self.path, error = %e, "unreadable row skipped");
                    }
                }
            }
        }
    }
}

// ==========================================
// Source stage (runs on a blocking thread)
// ==========================================

/// Drains the source into `tx` in batches of `batch_size`
///
/// Returns early without error when the receiver is gone; the
/// downstream stage reports why it stopped.
pub fn run_source_stage(
    mut source: BoundSource,
    tx: mpsc::Sender<Vec<RawRow>>,
    batch_size: usize,
    cancel: CancellationToken,
) -> IngestResult<SourceStats> {
    let mut batch = Vec::with_capacity(batch_size);

    while let Some(row) = source.next() {
        batch.push(row?);
        if batch.len() < batch_size {
            continue;
        }
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled {
                stage: PipelineStage::Source,
            });
        }
        let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
        if tx.blocking_send(full).is_err() {
            tracing::debug!("clean stage closed its channel, source stopping");
            return Ok(source.into_stats());
        }
    }

    if !batch.is_empty() && tx.blocking_send(batch).is_err() {
        tracing::debug!("clean stage closed its channel before the last batch");
    }

    let stats = source.into_stats();
    tracing::debug!(?stats, "source drained");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::EntityType;
    use crate::registry::schema_for;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn rows(source: BoundSource) -> Vec<RawRow> {
        source.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_open_missing_file() {
        let result = CsvSource::open(Path::new("definitely/not/here.csv"));
        assert!(matches!(result, Err(IngestError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_header_is_trimmed_and_bom_stripped() {
        let file = csv_file(b"\xEF\xBB\xBFEnterpriseNumber , Status\n0123.456.789,AC\n");
        let source = CsvSource::open(file.path()).unwrap();
        assert_eq!(source.headers(), &["EnterpriseNumber", "Status"]);

        let rows = rows(source.bind(schema_for(EntityType::Enterprise)).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field(0), "0123.456.789");
        assert_eq!(rows[0].field(1), "AC");
        assert_eq!(rows[0].field(2), "");
    }

    #[test]
    fn test_missing_key_column_is_header_mismatch() {
        let file = csv_file(b"Status,StartDate\nAC,01-01-2000\n");
        let source = CsvSource::open(file.path()).unwrap();
        let result = source.bind(schema_for(EntityType::Enterprise));
        assert!(matches!(
            result,
            Err(IngestError::HeaderMismatch { column, .. }) if column == "EnterpriseNumber"
        ));
    }

    #[test]
    fn test_header_match_is_case_sensitive() {
        let file = csv_file(b"enterprisenumber,Status\n0123.456.789,AC\n");
        let source = CsvSource::open(file.path()).unwrap();
        assert!(source.bind(schema_for(EntityType::Enterprise)).is_err());
    }

    #[test]
    fn test_quoted_delimiters_and_newlines() {
        let file = csv_file(
            b"EntityNumber,Language,TypeOfDenomination,Denomination\n\
              0123.456.789,2,001,\"Acme, \"\"Global\"\"\nDivision\"\n\
              0123.456.790,1,001,Plain\n",
        );
        let source = CsvSource::open(file.path()).unwrap();
        let rows = rows(source.bind(schema_for(EntityType::Denomination)).unwrap());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field(3), "Acme, \"Global\"\nDivision");
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].line, 4);
    }

    #[test]
    fn test_ragged_rows_are_padded_and_truncated() {
        let file = csv_file(b"EnterpriseNumber,Status,JuridicalSituation\n0123.456.789\n0123.456.790,AC,000,extra\n");
        let source = CsvSource::open(file.path()).unwrap();
        let mut bound = source.bind(schema_for(EntityType::Enterprise)).unwrap();

        let first = bound.next().unwrap().unwrap();
        assert_eq!(first.field(1), "");
        let second = bound.next().unwrap().unwrap();
        assert_eq!(second.field(2), "000");
        assert!(bound.next().is_none());

        assert_eq!(bound.stats().rows_read, 2);
        assert_eq!(bound.stats().ragged_rows, 2);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let file = csv_file(b"Code,Category,Language,Description\nX1,Cat,FR,Caf\xE9\n");
        let source = CsvSource::open(file.path()).unwrap();
        let mut bound = source.bind(schema_for(EntityType::Code)).unwrap();

        let row = bound.next().unwrap().unwrap();
        assert!(row.lossy);
        assert_eq!(row.field(3), "Caf\u{FFFD}");
        assert_eq!(bound.stats().lossy_rows, 1);
    }

    #[test]
    fn test_source_stage_batches_rows() {
        let file = csv_file(b"Code\nA\nB\nC\n");
        let source = CsvSource::open(file.path())
            .unwrap()
            .bind(schema_for(EntityType::Code))
            .unwrap();
        let (tx, mut rx) = mpsc::channel(8);

        let stats = run_source_stage(source, tx, 2, CancellationToken::new()).unwrap();
        assert_eq!(stats.rows_read, 3);
        assert_eq!(rx.try_recv().unwrap().len(), 2);
        assert_eq!(rx.try_recv().unwrap().len(), 1);
        assert!(rx.try_recv().is_err());
    }
}
