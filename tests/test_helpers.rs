// ==========================================
// Test helpers
// ==========================================
// Temporary databases, CSV fixtures, row counting
// ==========================================

#![allow(dead_code)]

use registry_ingest::db::{init_schema, open_sqlite_connection};
use registry_ingest::IngestConfig;
use rusqlite::Connection;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Creates a temporary database with every table in place
///
/// # Returns
/// - NamedTempFile: the database file (keep it alive)
/// - String: its path
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("temp path is not UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// Opens a configured connection wrapped for the pipeline
pub fn open_shared(db_path: &str) -> Arc<Mutex<Connection>> {
    let conn = open_sqlite_connection(db_path).expect("open test db");
    Arc::new(Mutex::new(conn))
}

/// Small batches so multi-batch paths run on tiny fixtures
pub fn small_batch_config() -> IngestConfig {
    IngestConfig {
        batch_size: 2,
        channel_capacity: 1,
        ..IngestConfig::default()
    }
}

/// Writes `content` verbatim to `dir/name`
pub fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    write_bytes(dir, name, content.as_bytes())
}

pub fn write_bytes(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

pub fn count_rows(conn: &Arc<Mutex<Connection>>, table: &str) -> i64 {
    let conn = conn.lock().expect("lock");
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .expect("count rows")
}

/// Runs a scalar `COUNT(*)`-style query
pub fn query_count(conn: &Arc<Mutex<Connection>>, sql: &str) -> i64 {
    let conn = conn.lock().expect("lock");
    conn.query_row(sql, [], |row| row.get(0)).expect("count query")
}

/// Runs a single-column TEXT query and collects the values (NULL → None)
pub fn query_values(conn: &Arc<Mutex<Connection>>, sql: &str) -> Vec<Option<String>> {
    let conn = conn.lock().expect("lock");
    let mut stmt = conn.prepare(sql).expect("prepare");
    let rows = stmt
        .query_map([], |row| row.get::<_, Option<String>>(0))
        .expect("query");
    rows.map(|r| r.expect("row")).collect()
}

/// Names of temp tables still alive on this connection
pub fn temp_tables(conn: &Arc<Mutex<Connection>>) -> Vec<String> {
    query_values(
        conn,
        "SELECT name FROM sqlite_temp_master WHERE type = 'table' ORDER BY name",
    )
    .into_iter()
    .flatten()
    .collect()
}

/// Copies the checked-in sample extract set into `dir`
pub fn copy_sample_extracts(dir: &Path) {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/registry_sample");
    for entry in std::fs::read_dir(&src).expect("read sample dir") {
        let entry = entry.expect("entry");
        std::fs::copy(entry.path(), dir.join(entry.file_name())).expect("copy fixture");
    }
}

/// Writes a Code extract with `rows` distinct codes
pub fn write_code_rows(dir: &Path, rows: usize) -> PathBuf {
    let mut content = String::from("Code,Language,Description\n");
    for i in 0..rows {
        content.push_str(&format!("C{:07},FR,Code {}\n", i, i));
    }
    write_csv(dir, "code.csv", &content)
}

/// Polls until a run's staging table exists on `conn`
///
/// # Returns
/// - Some(name): the staging table, while the run is still streaming
/// - None: the run finished before staging was seen
pub async fn wait_for_staging<T>(
    conn: &Arc<Mutex<Connection>>,
    run: &tokio::task::JoinHandle<T>,
) -> Option<String> {
    loop {
        if let Some(name) = temp_tables(conn)
            .into_iter()
            .find(|name| name.starts_with("staging_"))
        {
            return Some(name);
        }
        if run.is_finished() {
            return None;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
}
