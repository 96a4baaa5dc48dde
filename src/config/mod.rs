// ==========================================
// Registry Ingest - configuration layer
// ==========================================
// Storage: config_kv table, overridable by env and CLI
// ==========================================

pub mod config_manager;
pub mod ingest_config;

pub use config_manager::{config_keys, ConfigManager};
pub use ingest_config::IngestConfig;
