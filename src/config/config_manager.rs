// ==========================================
// Registry Ingest - config manager
// ==========================================
// Storage: config_kv table (key-value + scope)
// Only the 'global' scope is read by the pipeline.
// ==========================================

use crate::config::ingest_config::IngestConfig;
use crate::importer::error::{IngestError, IngestResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Reads one global value
    ///
    /// # Returns
    /// - Some(value) when the key is set
    /// - None otherwise
    pub fn get_global_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Writes (or overwrites) one global value
    pub fn set_global_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value,
                                                      updated_at = excluded.updated_at",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// All global `ingest.*` values
    pub fn ingest_values(&self) -> RepositoryResult<HashMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = ?1 AND key LIKE 'ingest.%' ORDER BY key",
        )?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut values = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            values.insert(key, value);
        }
        Ok(values)
    }

    /// Resolves defaults → config_kv → environment
    ///
    /// CLI overrides are applied by the caller, followed by `validate()`.
    pub fn load_ingest_config(&self) -> IngestResult<IngestConfig> {
        let stored = self.ingest_values().map_err(|e| IngestError::Config {
            key: "config_kv".to_string(),
            message: e.to_string(),
        })?;

        let mut config = IngestConfig::default();
        config.overlay(|key| stored.get(key).cloned())?;
        config.overlay_env()?;
        config.validate()?;

        tracing::debug!(?config, stored_keys = stored.len(), "ingest config resolved");
        Ok(config)
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    pub const BATCH_SIZE: &str = "ingest.batch_size";
    pub const CHANNEL_CAPACITY: &str = "ingest.channel_capacity";
    pub const PROGRESS_INTERVAL: &str = "ingest.progress_interval";
    pub const LOCK_TTL_SECS: &str = "ingest.lock_ttl_secs";
    pub const BUSY_TIMEOUT_MS: &str = "ingest.busy_timeout_ms";

    pub const ALL: [&str; 5] = [
        BATCH_SIZE,
        CHANNEL_CAPACITY,
        PROGRESS_INTERVAL,
        LOCK_TTL_SECS,
        BUSY_TIMEOUT_MS,
    ];

    /// `ingest.batch_size` → `REGISTRY_INGEST_BATCH_SIZE`
    pub fn env_name(key: &str) -> String {
        let suffix = key.strip_prefix("ingest.").unwrap_or(key);
        format!("REGISTRY_INGEST_{}", suffix.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn, 1_000).unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_env_name() {
        assert_eq!(config_keys::env_name("ingest.lock_ttl_secs"), "REGISTRY_INGEST_LOCK_TTL_SECS");
    }

    #[test]
    fn test_set_and_get_global_value() {
        let manager = manager();
        assert_eq!(manager.get_global_value(config_keys::BATCH_SIZE).unwrap(), None);

        manager.set_global_value(config_keys::BATCH_SIZE, "10").unwrap();
        manager.set_global_value(config_keys::BATCH_SIZE, "20").unwrap();
        assert_eq!(
            manager.get_global_value(config_keys::BATCH_SIZE).unwrap().as_deref(),
            Some("20")
        );
    }

    #[test]
    fn test_stored_values_override_defaults() {
        let manager = manager();
        manager.set_global_value(config_keys::CHANNEL_CAPACITY, "9").unwrap();

        let config = manager.load_ingest_config().unwrap();
        assert_eq!(config.channel_capacity, 9);
    }

    #[test]
    fn test_invalid_stored_value_fails() {
        let manager = manager();
        manager.set_global_value(config_keys::PROGRESS_INTERVAL, "0").unwrap();
        assert!(manager.load_ingest_config().is_err());
    }
}
