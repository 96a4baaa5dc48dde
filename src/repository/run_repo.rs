// ==========================================
// Registry Ingest - run bookkeeping repository
// ==========================================
// ingest_run_lock: one row per entity while a run is active
// ingest_run:      one JSON report per finished run
// ==========================================

use crate::domain::report::RunReport;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct RunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RunRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Takes the run lock for `entity`
    ///
    /// # Returns
    /// - Err(LockHeld): another run holds a lock younger than `ttl_secs`
    ///
    /// Older locks are treated as left behind by a crashed run and replaced.
    pub fn acquire_lock(&self, entity: &str, run_id: &str, ttl_secs: u64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<(String, String)> = tx
            .query_row(
                "SELECT run_id, acquired_at FROM ingest_run_lock WHERE entity = ?1",
                params![entity],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let now = Utc::now();
        if let Some((holder, since)) = current {
            let age_secs = DateTime::parse_from_rfc3339(&since)
                .map(|at| (now - at.with_timezone(&Utc)).num_seconds())
                .unwrap_or(i64::MAX);

            if age_secs >= 0 && (age_secs as u64) < ttl_secs {
                return Err(RepositoryError::LockHeld {
                    entity: entity.to_string(),
                    holder,
                    since,
                });
            }

            tracing::warn!(entity, holder = %holder, since = %since, "taking over stale run lock");
            tx.execute("DELETE FROM ingest_run_lock WHERE entity = ?1", params![entity])?;
        }

        tx.execute(
            "INSERT INTO ingest_run_lock (entity, run_id, acquired_at) VALUES (?1, ?2, ?3)",
            params![entity, run_id, now.to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Releases the lock if `run_id` still holds it
    ///
    /// # Returns
    /// - Ok(true) when a row was removed
    pub fn release_lock(&self, entity: &str, run_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let removed = conn.execute(
            "DELETE FROM ingest_run_lock WHERE entity = ?1 AND run_id = ?2",
            params![entity, run_id],
        )?;
        Ok(removed > 0)
    }

    pub fn insert_run(&self, report: &RunReport) -> RepositoryResult<()> {
        let json = serde_json::to_string(report)?;
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO ingest_run
                (run_id, entity, status, started_at, finished_at, report_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                report.run_id,
                report.entity.tag(),
                report.status.to_string(),
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                json,
            ],
        )?;
        Ok(())
    }

    /// Most recent stored report for an entity
    pub fn latest_run(&self, entity: &str) -> RepositoryResult<Option<RunReport>> {
        let conn = self.get_conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT report_json FROM ingest_run WHERE entity = ?1
                 ORDER BY started_at DESC, rowid DESC LIMIT 1",
                params![entity],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|j| serde_json::from_str(&j).map_err(RepositoryError::from))
            .transpose()
    }
}

// ==========================================
// RunLockGuard
// ==========================================

/// Holds an entity's run lock; releases it on drop
pub struct RunLockGuard {
    repo: RunRepository,
    entity: &'static str,
    run_id: String,
}

impl RunLockGuard {
    pub fn acquire(
        repo: RunRepository,
        entity: &'static str,
        run_id: &str,
        ttl_secs: u64,
    ) -> RepositoryResult<Self> {
        repo.acquire_lock(entity, run_id, ttl_secs)?;
        tracing::debug!(entity, run_id, "run lock acquired");
        Ok(Self {
            repo,
            entity,
            run_id: run_id.to_string(),
        })
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        match self.repo.release_lock(self.entity, &self.run_id) {
            Ok(true) => tracing::debug!(entity = self.entity, "run lock released"),
            Ok(false) => tracing::warn!(entity = self.entity, "run lock was taken over before release"),
            Err(e) => tracing::warn!(entity = self.entity, error = %e, "failed to release run lock"),
        }
    }
}
