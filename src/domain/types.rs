// ==========================================
// Registry Ingest - domain types
// ==========================================
// Entity tags, merge policies and pipeline stage names shared by
// the registry, the importer and the repositories.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Entity type
// ==========================================
// Declaration order is the full-refresh load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Code,
    Enterprise,
    Establishment,
    Activity,
    Address,
    Contact,
    Denomination,
}

impl EntityType {
    /// All entity types, parents before dependents.
    pub const LOAD_ORDER: [EntityType; 7] = [
        EntityType::Code,
        EntityType::Enterprise,
        EntityType::Establishment,
        EntityType::Activity,
        EntityType::Address,
        EntityType::Contact,
        EntityType::Denomination,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            EntityType::Code => "code",
            EntityType::Enterprise => "enterprise",
            EntityType::Establishment => "establishment",
            EntityType::Activity => "activity",
            EntityType::Address => "address",
            EntityType::Contact => "contact",
            EntityType::Denomination => "denomination",
        }
    }

    /// Case-insensitive tag lookup.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let wanted = tag.trim();
        Self::LOAD_ORDER
            .into_iter()
            .find(|entity| entity.tag().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ==========================================
// Conflict policy (existing key in the permanent table)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// First load wins: rows whose identity already exists are skipped.
    Ignore,
    /// Latest load wins: non-key columns are overwritten.
    Upsert,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Ignore => write!(f, "ignore"),
            ConflictPolicy::Upsert => write!(f, "upsert"),
        }
    }
}

// ==========================================
// Dedup policy (same identity seen twice in one file)
// ==========================================
// "First" and "last" follow staging arrival order, which is file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    KeepFirst,
    KeepLast,
}

impl DedupPolicy {
    /// Aggregate picking the surviving staging rowid.
    pub fn rowid_aggregate(&self) -> &'static str {
        match self {
            DedupPolicy::KeepFirst => "MIN",
            DedupPolicy::KeepLast => "MAX",
        }
    }
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupPolicy::KeepFirst => write!(f, "keep-first"),
            DedupPolicy::KeepLast => write!(f, "keep-last"),
        }
    }
}

// ==========================================
// Field kind / key format
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    /// Source `dd-mm-yyyy`, stored `yyyy-mm-dd`.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyFormat {
    /// `dddd.ddd.ddd`
    EnterpriseNumber,
    /// `2.ddd.ddd.ddd`
    EstablishmentNumber,
    /// Either of the two above.
    EntityNumber,
    Free,
}

// ==========================================
// Rejection kinds (per-row, non-fatal)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    MissingKey,
    KeyTooLong,
    MalformedValue,
}

impl RejectKind {
    pub const ALL: [RejectKind; 3] = [
        RejectKind::MissingKey,
        RejectKind::KeyTooLong,
        RejectKind::MalformedValue,
    ];
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectKind::MissingKey => write!(f, "missing_key"),
            RejectKind::KeyTooLong => write!(f, "key_too_long"),
            RejectKind::MalformedValue => write!(f, "malformed_value"),
        }
    }
}

// ==========================================
// Pipeline stage (error context)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Setup,
    Source,
    Clean,
    Staging,
    Merge,
    Report,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Setup => write!(f, "setup"),
            PipelineStage::Source => write!(f, "source"),
            PipelineStage::Clean => write!(f, "clean"),
            PipelineStage::Staging => write!(f, "staging"),
            PipelineStage::Merge => write!(f, "merge"),
            PipelineStage::Report => write!(f, "report"),
        }
    }
}
