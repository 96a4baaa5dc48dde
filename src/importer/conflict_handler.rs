// ==========================================
// Registry Ingest - merge plan builder
// ==========================================
// Translates an entity descriptor into the set-based SQL the
// merge repository executes:
//   representative  one staging row per identity (MIN/MAX rowid),
//                   materialized once per merge in a TEMP table
//   resolved        parent key present in ANY parent table
//   existing        identity already in the permanent table
// Only registry identifiers (static strings) are spliced into SQL.
// ==========================================

use crate::domain::types::ConflictPolicy;
use crate::registry::{EntitySchema, Identity};
use crate::repository::merge_repo::MergePlan;

/// Duplicate keys listed in the report and log
pub const DUPLICATE_SAMPLE_LIMIT: usize = 10;

pub struct ConflictHandler {
    schema: &'static EntitySchema,
    staging: String,
    representatives: String,
}

impl ConflictHandler {
    /// # Arguments
    /// - staging: qualified staging table name, e.g. `temp.staging_code_ab12cd34`
    pub fn new(schema: &'static EntitySchema, staging: impl Into<String>) -> Self {
        let staging = staging.into();
        Self {
            schema,
            representatives: format!("{}_rep", staging),
            staging,
        }
    }

    fn identity_list(&self, alias: Option<&str>) -> String {
        self.schema
            .identity_columns()
            .iter()
            .map(|c| match alias {
                Some(a) => format!("{}.{}", a, c),
                None => c.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Printable identity used for duplicate samples
    fn sample_key_expr(&self) -> String {
        match self.schema.identity {
            Identity::Natural => self.schema.key_field().column.to_string(),
            Identity::Content => self
                .schema
                .columns()
                .iter()
                .map(|c| format!("COALESCE({}, '')", c))
                .collect::<Vec<_>>()
                .join(" || ' | ' || "),
        }
    }

    fn representative(&self) -> String {
        format!(
            "EXISTS (SELECT 1 FROM {} k WHERE k.staged_rowid = s.rowid)",
            self.representatives
        )
    }

    /// Staging is grouped by identity exactly once
    fn setup(&self) -> Vec<String> {
        vec![
            format!("DROP TABLE IF EXISTS {}", self.representatives),
            format!(
                "CREATE TABLE {} (staged_rowid INTEGER PRIMARY KEY)",
                self.representatives
            ),
            format!(
                "INSERT INTO {} (staged_rowid) SELECT {}(rowid) FROM {} GROUP BY {}",
                self.representatives,
                self.schema.dedup_policy.rowid_aggregate(),
                self.staging,
                self.identity_list(None)
            ),
        ]
    }

    fn resolved(&self) -> String {
        let fk = match self.schema.foreign_key {
            Some(fk) => fk,
            None => return "1".to_string(),
        };
        let column = self.schema.fields[fk.field_index].column;
        let branches = fk
            .parents
            .iter()
            .map(|p| {
                format!(
                    "EXISTS (SELECT 1 FROM {} p WHERE p.{} = s.{})",
                    p.table, p.column, column
                )
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("({})", branches)
    }

    fn existing(&self) -> String {
        let matches = match self.schema.identity {
            Identity::Natural => {
                let key = self.schema.key_field().column;
                format!("t.{key} = s.{key}", key = key)
            }
            // nullable columns compare with IS so NULL matches NULL
            Identity::Content => self
                .schema
                .fields
                .iter()
                .map(|f| {
                    let op = if f.is_not_null() { "=" } else { "IS" };
                    format!("t.{c} {op} s.{c}", c = f.column, op = op)
                })
                .collect::<Vec<_>>()
                .join(" AND "),
        };
        format!(
            "EXISTS (SELECT 1 FROM {} t WHERE {})",
            self.schema.table, matches
        )
    }

    fn insert(&self, rep: &str, resolved: &str, existing: &str) -> String {
        let schema = self.schema;
        let columns = schema.columns();
        let target = columns.join(", ");
        let source = columns
            .iter()
            .map(|c| format!("s.{}", c))
            .collect::<Vec<_>>()
            .join(", ");

        match schema.identity {
            Identity::Natural => {
                let key = schema.key_field().column;
                let updates: Vec<String> = columns
                    .iter()
                    .filter(|c| **c != key)
                    .map(|c| format!("{c} = excluded.{c}", c = c))
                    .collect();
                // WHERE is mandatory before ON CONFLICT in INSERT … SELECT
                let action = match schema.conflict_policy {
                    ConflictPolicy::Upsert if !updates.is_empty() => {
                        format!("DO UPDATE SET {}", updates.join(", "))
                    }
                    _ => "DO NOTHING".to_string(),
                };
                format!(
                    "INSERT INTO {table} ({target}) SELECT {source} FROM {staging} s \
                     WHERE {rep} AND {resolved} ON CONFLICT({key}) {action}",
                    table = schema.table,
                    target = target,
                    source = source,
                    staging = self.staging,
                    rep = rep,
                    resolved = resolved,
                    key = key,
                    action = action
                )
            }
            Identity::Content => format!(
                "INSERT INTO {table} ({target}) SELECT {source} FROM {staging} s \
                 WHERE {rep} AND {resolved} AND NOT {existing} ORDER BY s.rowid",
                table = schema.table,
                target = target,
                source = source,
                staging = self.staging,
                rep = rep,
                resolved = resolved,
                existing = existing
            ),
        }
    }

    /// Builds every statement of the merge
    pub fn build_plan(&self) -> MergePlan {
        let schema = self.schema;
        let staging = &self.staging;
        let rep = self.representative();
        let resolved = self.resolved();
        let existing = self.existing();
        let identity = self.identity_list(None);

        let soft_ref_misses = schema
            .soft_refs
            .iter()
            .map(|soft| {
                let column = schema.fields[soft.field_index].column;
                format!(
                    "SELECT COUNT(*) FROM {staging} s WHERE {rep} AND {resolved} \
                     AND s.{column} IS NOT NULL \
                     AND NOT EXISTS (SELECT 1 FROM {table} r WHERE r.{parent} = s.{column})",
                    staging = staging,
                    rep = rep,
                    resolved = resolved,
                    column = column,
                    table = soft.table,
                    parent = soft.column
                )
            })
            .collect();

        MergePlan {
            setup: self.setup(),
            staged: format!("SELECT COUNT(*) FROM {}", staging),
            duplicates: format!(
                "SELECT (SELECT COUNT(*) FROM {}) - (SELECT COUNT(*) FROM {})",
                staging, self.representatives
            ),
            duplicate_samples: format!(
                "SELECT {key}, COUNT(*) FROM {staging} GROUP BY {identity} \
                 HAVING COUNT(*) > 1 ORDER BY MIN(rowid) LIMIT {limit}",
                key = self.sample_key_expr(),
                staging = staging,
                identity = identity,
                limit = DUPLICATE_SAMPLE_LIMIT
            ),
            orphans: format!(
                "SELECT COUNT(*) FROM {} s WHERE {} AND NOT {}",
                staging, rep, resolved
            ),
            candidates: format!(
                "SELECT COUNT(*) FROM {} s WHERE {} AND {}",
                staging, rep, resolved
            ),
            existing: format!(
                "SELECT COUNT(*) FROM {} s WHERE {} AND {} AND {}",
                staging, rep, resolved, existing
            ),
            soft_ref_misses,
            insert: self.insert(&rep, &resolved, &existing),
            final_count: format!("SELECT COUNT(*) FROM {}", schema.table),
            teardown: vec![format!("DROP TABLE IF EXISTS {}", self.representatives)],
        }
    }
}
