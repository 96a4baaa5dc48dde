// ==========================================
// Registry Ingest - merge repository
// ==========================================
// Executes a prepared MergePlan against the shared connection.
// Everything from the first count to the final count runs in one
// transaction; a failure leaves the permanent table untouched.
// No policy decisions here: the plan carries the SQL.
// ==========================================

use crate::domain::report::DuplicateSample;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, Transaction};
use std::sync::{Arc, Mutex};

/// SQL statements for one merge, all scalar `COUNT`-style queries
/// except `setup`/`teardown` (DDL and fills), `duplicate_samples`
/// (key, occurrences) and `insert`.
#[derive(Debug, Clone)]
pub struct MergePlan {
    pub setup: Vec<String>,
    pub staged: String,
    pub duplicates: String,
    pub duplicate_samples: String,
    pub orphans: String,
    pub candidates: String,
    pub existing: String,
    pub soft_ref_misses: Vec<String>,
    pub insert: String,
    pub final_count: String,
    pub teardown: Vec<String>,
}

/// Raw counts observed while executing a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeCounts {
    pub staged: u64,
    pub duplicates: u64,
    pub duplicate_samples: Vec<DuplicateSample>,
    pub orphans: u64,
    /// Deduplicated rows with a resolved parent
    pub candidates: u64,
    /// Candidates whose identity already exists in the permanent table
    pub existing: u64,
    /// Rows reported changed by the insert statement
    pub affected: u64,
    pub soft_ref_misses: u64,
    pub final_count: u64,
}

pub struct MergeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MergeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn count(tx: &Transaction, sql: &str) -> RepositoryResult<u64> {
        let value: i64 = tx.query_row(sql, [], |row| row.get(0))?;
        Ok(value.max(0) as u64)
    }

    fn samples(tx: &Transaction, sql: &str) -> RepositoryResult<Vec<DuplicateSample>> {
        let mut stmt = tx.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(DuplicateSample {
                key: row.get::<_, String>(0)?,
                occurrences: row.get::<_, i64>(1)? as u64,
            })
        })?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }
        Ok(samples)
    }

    /// Runs the plan in one transaction
    ///
    /// # Returns
    /// - Ok(MergeCounts): committed merge
    /// - Err: nothing committed
    pub fn execute_plan(&self, plan: &MergePlan) -> RepositoryResult<MergeCounts> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.unchecked_transaction()?;

        for sql in &plan.setup {
            tx.execute_batch(sql)?;
        }

        let mut counts = MergeCounts {
            staged: Self::count(&tx, &plan.staged)?,
            duplicates: Self::count(&tx, &plan.duplicates)?,
            duplicate_samples: Self::samples(&tx, &plan.duplicate_samples)?,
            orphans: Self::count(&tx, &plan.orphans)?,
            candidates: Self::count(&tx, &plan.candidates)?,
            existing: Self::count(&tx, &plan.existing)?,
            ..MergeCounts::default()
        };

        for sql in &plan.soft_ref_misses {
            counts.soft_ref_misses += Self::count(&tx, sql)?;
        }

        counts.affected = tx.execute(&plan.insert, [])? as u64;
        counts.final_count = Self::count(&tx, &plan.final_count)?;

        for sql in &plan.teardown {
            tx.execute_batch(sql)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(counts)
    }
}
