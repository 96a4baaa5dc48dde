// ==========================================
// Registry Ingest - SQLite connection setup
// ==========================================
// Every connection goes through open_sqlite_connection so the
// PRAGMA set (foreign keys, busy timeout, temp store) is uniform.
// init_schema creates missing tables; it never alters existing ones.
// ==========================================

use crate::registry;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version written by init_schema
///
/// Used for warnings only; there is no automatic migration.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Environment override for the database path
pub const DB_PATH_ENV: &str = "REGISTRY_INGEST_DB_PATH";

const BOOKKEEPING_DDL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS ingest_run (
    run_id TEXT PRIMARY KEY,
    entity TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    report_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ingest_run_entity ON ingest_run(entity, started_at);

CREATE TABLE IF NOT EXISTS ingest_run_lock (
    entity TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    acquired_at TEXT NOT NULL
);
";

/// Applies the shared PRAGMA set
///
/// foreign_keys and busy_timeout are per-connection settings.
pub fn configure_sqlite_connection(conn: &Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA temp_store = MEMORY;")?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}

/// Opens a SQLite connection with the shared configuration
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn, DEFAULT_BUSY_TIMEOUT_MS)?;
    Ok(conn)
}

/// Reads schema_version (None when the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// Creates bookkeeping and entity tables that do not exist yet
///
/// # Returns
/// - Ok(n): number of entity tables described by the registry
pub fn init_schema(conn: &Connection) -> rusqlite::Result<usize> {
    if let Some(found) = read_schema_version(conn)? {
        if found > CURRENT_SCHEMA_VERSION {
            tracing::warn!(
                found,
                expected = CURRENT_SCHEMA_VERSION,
                "database schema is newer than this build"
            );
        }
    }

    let mut ddl = String::from(BOOKKEEPING_DDL);
    for schema in registry::all() {
        ddl.push_str(&schema.create_table_sql());
    }
    ddl.push_str(&format!(
        "INSERT OR IGNORE INTO schema_version (version) VALUES ({});",
        CURRENT_SCHEMA_VERSION
    ));

    conn.execute_batch(&ddl)?;
    tracing::debug!(tables = registry::all().len(), "schema ensured");
    Ok(registry::all().len())
}

/// Default database path
///
/// `REGISTRY_INGEST_DB_PATH` wins; otherwise `<data_dir>/registry-ingest/registry.db`,
/// falling back to `./registry.db` when no data directory is known.
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./registry.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("registry-ingest");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create data directory");
        } else {
            path = dir.join("registry.db");
        }
    }

    path.to_string_lossy().to_string()
}
