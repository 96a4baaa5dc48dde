// ==========================================
// Registry Ingest - field cleaner
// ==========================================
// TRIM / empty → NULL / date reformatting
// ==========================================

use crate::importer::ingest_trait::DataCleaner as DataCleanerTrait;
use chrono::{Datelike, NaiveDate};

const SOURCE_DATE_FORMAT: &str = "%d-%m-%Y";
const STORE_DATE_FORMAT: &str = "%Y-%m-%d";

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    fn normalize_null(&self, value: &str) -> Option<String> {
        let cleaned = self.clean_text(value);
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    fn reformat_date(&self, value: &str) -> Option<String> {
        let trimmed = value.trim();
        // 10 chars rules out two-digit years and stray suffixes
        if trimmed.chars().count() != 10 {
            return None;
        }

        NaiveDate::parse_from_str(trimmed, SOURCE_DATE_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(trimmed, STORE_DATE_FORMAT))
            .ok()
            .filter(|date| (1000..=9999).contains(&date.year()))
            .map(|date| date.format(STORE_DATE_FORMAT).to_string())
    }
}
