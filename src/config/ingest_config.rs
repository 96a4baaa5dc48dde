// ==========================================
// Registry Ingest - pipeline tuning knobs
// ==========================================
// Resolution order (later wins):
//   built-in defaults → config_kv (scope 'global') → REGISTRY_INGEST_* env → CLI flags
// ==========================================

use crate::config::config_manager::config_keys;
use crate::importer::error::{IngestError, IngestResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Records per staging transaction (and per channel message)
    pub batch_size: usize,
    /// Batches in flight per channel
    pub channel_capacity: usize,
    /// Rows between cleaning progress lines
    pub progress_interval: u64,
    /// Age after which a run lock is considered stale
    pub lock_ttl_secs: u64,
    pub busy_timeout_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 1_000,
            channel_capacity: 4,
            progress_interval: 10_000,
            lock_ttl_secs: 6 * 60 * 60,
            busy_timeout_ms: crate::db::DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl IngestConfig {
    /// Applies one raw value by its config_kv key.
    ///
    /// Unknown keys are ignored; unparsable values fail with `Config`.
    pub fn set(&mut self, key: &str, raw: &str) -> IngestResult<()> {
        match key {
            config_keys::BATCH_SIZE => self.batch_size = parse(key, raw)?,
            config_keys::CHANNEL_CAPACITY => self.channel_capacity = parse(key, raw)?,
            config_keys::PROGRESS_INTERVAL => self.progress_interval = parse(key, raw)?,
            config_keys::LOCK_TTL_SECS => self.lock_ttl_secs = parse(key, raw)?,
            config_keys::BUSY_TIMEOUT_MS => self.busy_timeout_ms = parse(key, raw)?,
            _ => {}
        }
        Ok(())
    }

    /// Overlays every known key found by `lookup`.
    ///
    /// `lookup` receives the config_kv key and returns the raw value, if any.
    pub fn overlay<F>(&mut self, lookup: F) -> IngestResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in config_keys::ALL {
            if let Some(raw) = lookup(key) {
                self.set(key, &raw)?;
            }
        }
        Ok(())
    }

    /// Overlays `REGISTRY_INGEST_<KEY>` environment variables.
    pub fn overlay_env(&mut self) -> IngestResult<()> {
        self.overlay(|key| std::env::var(config_keys::env_name(key)).ok())
    }

    pub fn validate(&self) -> IngestResult<()> {
        let positive = [
            (config_keys::BATCH_SIZE, self.batch_size as u64),
            (config_keys::CHANNEL_CAPACITY, self.channel_capacity as u64),
            (config_keys::PROGRESS_INTERVAL, self.progress_interval),
            (config_keys::LOCK_TTL_SECS, self.lock_ttl_secs),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(IngestError::Config {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> IngestResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| IngestError::Config {
        key: key.to_string(),
        message: format!("cannot parse {:?}: {}", raw, e),
    })
}
