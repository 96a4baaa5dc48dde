// ==========================================
// Registry Ingest - importer traits
// ==========================================
// Interfaces only; implementations live next to this file.
// ==========================================

use crate::domain::report::RunReport;
use crate::domain::types::{EntityType, KeyFormat};
use crate::importer::error::{IngestResult, RejectReason};
use crate::registry::FieldSpec;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// Ingestor Trait
// ==========================================
// Implementor: IngestPipeline
#[async_trait]
pub trait Ingestor: Send + Sync {
    /// Loads one extract file into the permanent table of `entity`
    ///
    /// # Arguments
    /// - entity: target entity type
    /// - file_path: CSV extract
    ///
    /// # Returns
    /// - Ok(RunReport): completed run, including skipped and orphaned counts
    /// - Err: fatal error naming the failing stage
    ///
    /// # Stages
    /// 1. open source and bind header (no store mutation yet)
    /// 2. acquire the per-entity run lock
    /// 3. read → clean → stage, concurrently over bounded channels
    /// 4. merge staging into the permanent table (one transaction)
    /// 5. report and drop staging
    async fn ingest_file(&self, entity: EntityType, file_path: &Path) -> IngestResult<RunReport>;

    /// Loads every entity from `dir` in dependency order
    ///
    /// Stops at the first fatal error; earlier entities stay committed.
    async fn full_refresh(&self, dir: &Path) -> IngestResult<Vec<RunReport>>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// Implementor: importer::data_cleaner::DataCleaner
pub trait DataCleaner: Send + Sync {
    /// Trims surrounding whitespace
    fn clean_text(&self, value: &str) -> String;

    /// Trimmed value, or None when nothing is left
    fn normalize_null(&self, value: &str) -> Option<String>;

    /// `dd-mm-yyyy` (or already `yyyy-mm-dd`) → `yyyy-mm-dd`
    ///
    /// # Returns
    /// - None when the value is not a valid calendar date
    fn reformat_date(&self, value: &str) -> Option<String>;
}

// ==========================================
// DqValidator Trait
// ==========================================
// Implementor: importer::dq_validator::DqValidator
pub trait DqValidator: Send + Sync {
    /// Checks an identifier against its expected shape
    fn validate_key_format(
        &self,
        field: &FieldSpec,
        format: KeyFormat,
        value: &str,
    ) -> Result<(), RejectReason>;

    /// Checks presence, length cap and allowed values of a cleaned field
    fn validate_field(&self, field: &FieldSpec, value: Option<&str>) -> Result<(), RejectReason>;
}
