// ==========================================
// Registry Ingest - row records
// ==========================================
// RawRow:      what the CSV source yields (header-aligned text)
// CleanRecord: what the transform accepts (one slot per schema field)
// ==========================================

use crate::importer::error::RejectReason;

/// A source row already aligned to the bound schema fields.
///
/// `fields[i]` holds the text of schema field `i`; absent columns and
/// padded cells are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number of the row's first line in the source file
    pub line: u64,
    pub fields: Vec<String>,
    /// Row contained bytes that were not valid UTF-8
    pub lossy: bool,
}

impl RawRow {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self {
            line,
            fields,
            lossy: false,
        }
    }

    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A validated row ready for staging. `None` is stored as SQL NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRecord {
    pub line: u64,
    pub values: Vec<Option<String>>,
}

impl CleanRecord {
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }
}

/// Outcome of cleaning one raw row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Accepted(CleanRecord),
    Rejected { line: u64, reason: RejectReason },
}
