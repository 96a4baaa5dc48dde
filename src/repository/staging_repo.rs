// ==========================================
// Registry Ingest - staging table repository
// ==========================================
// Run-scoped TEMP table, no constraints, rowid = arrival order.
// The table is dropped when the StagingTable value is dropped,
// whichever way the run ends.
// ==========================================

use crate::domain::record::CleanRecord;
use crate::registry::EntitySchema;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex};

pub struct StagingTable {
    conn: Arc<Mutex<Connection>>,
    name: String,
    width: usize,
    insert_sql: String,
    appended: u64,
}

impl StagingTable {
    /// Creates `staging_<table>_<run prefix>` on the shared connection
    ///
    /// # Arguments
    /// - run_id: only its first 8 alphanumeric characters are used
    pub fn create(
        conn: Arc<Mutex<Connection>>,
        schema: &EntitySchema,
        run_id: &str,
    ) -> RepositoryResult<Self> {
        let prefix: String = run_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect::<String>()
            .to_ascii_lowercase();
        let name = format!("staging_{}_{}", schema.table, prefix);

        let columns = schema.columns();
        let column_defs = columns
            .iter()
            .map(|c| format!("{} TEXT", c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_sql = format!(
            "INSERT INTO temp.{} ({}) VALUES ({})",
            name,
            columns.join(", "),
            placeholders
        );

        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            guard.execute_batch(&format!(
                "DROP TABLE IF EXISTS temp.{name}; CREATE TEMP TABLE {name} ({column_defs});",
                name = name,
                column_defs = column_defs
            ))?;
        }

        tracing::debug!(table = %name, "staging table created");

        Ok(Self {
            conn,
            name,
            width: columns.len(),
            insert_sql,
            appended: 0,
        })
    }

    /// Qualified name for use in merge SQL
    pub fn qualified_name(&self) -> String {
        format!("temp.{}", self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records appended so far
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Appends one batch inside a single transaction
    ///
    /// # Returns
    /// - Ok(n): rows appended
    pub fn append_batch(&mut self, records: &[CleanRecord]) -> RepositoryResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for record in records {
                if record.values.len() != self.width {
                    return Err(RepositoryError::InternalError(format!(
                        "record from line {} has {} values, staging expects {}",
                        record.line,
                        record.values.len(),
                        self.width
                    )));
                }
                stmt.execute(params_from_iter(record.values.iter()))?;
            }
        }
        tx.commit()?;

        self.appended += records.len() as u64;
        Ok(records.len())
    }

    pub fn row_count(&self) -> RepositoryResult<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM temp.{}", self.name),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl Drop for StagingTable {
    fn drop(&mut self) {
        let guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.execute_batch(&format!("DROP TABLE IF EXISTS temp.{}", self.name)) {
            Ok(()) => tracing::debug!(table = %self.name, "staging table dropped"),
            Err(e) => tracing::warn!(table = %self.name, error = %e, "failed to drop staging table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::EntityType;
    use crate::registry::schema_for;

    fn conn() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(Connection::open_in_memory().unwrap()))
    }

    fn record(line: u64, key: &str) -> CleanRecord {
        CleanRecord {
            line,
            values: vec![Some(key.to_string()), None, None, None],
        }
    }

    fn temp_table_exists(conn: &Arc<Mutex<Connection>>, name: &str) -> bool {
        let guard = conn.lock().unwrap();
        guard
            .query_row(
                "SELECT COUNT(*) FROM sqlite_temp_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get::<_, i64>(0),
            )
            .unwrap()
            == 1
    }

    #[test]
    fn test_append_and_drop() {
        let conn = conn();
        let mut staging =
            StagingTable::create(conn.clone(), schema_for(EntityType::Code), "AB12-cd34-ef56").unwrap();
        assert_eq!(staging.name(), "staging_code_ab12cd34");

        staging.append_batch(&[record(2, "A"), record(3, "A")]).unwrap();
        staging.append_batch(&[record(4, "B")]).unwrap();
        assert_eq!(staging.appended(), 3);
        assert_eq!(staging.row_count().unwrap(), 3);

        let name = staging.name().to_string();
        assert!(temp_table_exists(&conn, &name));
        drop(staging);
        assert!(!temp_table_exists(&conn, &name));
    }

    #[test]
    fn test_width_mismatch_is_an_error() {
        let conn = conn();
        let mut staging =
            StagingTable::create(conn, schema_for(EntityType::Code), "run00001").unwrap();
        let bad = CleanRecord {
            line: 9,
            values: vec![Some("A".to_string())],
        };
        assert!(staging.append_batch(&[bad]).is_err());
        assert_eq!(staging.row_count().unwrap(), 0);
    }
}
