// ==========================================
// Registry Ingest - repository layer
// ==========================================
// Data access only; no ingest rules here.
// All repositories share one Arc<Mutex<Connection>> per run
// (staging tables are TEMP and live on that connection).
// ==========================================

pub mod error;
pub mod merge_repo;
pub mod run_repo;
pub mod staging_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use merge_repo::{MergeCounts, MergePlan, MergeRepository};
pub use run_repo::{RunLockGuard, RunRepository};
pub use staging_repo::StagingTable;
