// ==========================================
// Registry Ingest - record schema registry
// ==========================================
// Static per-entity descriptors: field list with constraints,
// identity, foreign key, soft references and merge policies.
// Pure lookup; the pipeline resolves a descriptor once per run.
// ==========================================

mod entities;

use crate::domain::types::{ConflictPolicy, DedupPolicy, EntityType, FieldKind, KeyFormat};
use crate::importer::error::{IngestError, IngestResult};

// ==========================================
// Field descriptor
// ==========================================

/// What happens when a field is empty after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Optional,
    /// Empty → `MissingKey`; over-long → `KeyTooLong`
    Key,
    /// Empty → `MalformedValue`
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// CSV header name (case-sensitive)
    pub header: &'static str,
    /// Store column name
    pub column: &'static str,
    pub kind: FieldKind,
    /// Maximum length in characters
    pub max_len: Option<usize>,
    pub presence: Presence,
    pub allowed: Option<&'static [&'static str]>,
}

impl FieldSpec {
    pub const fn key(header: &'static str, column: &'static str, max_len: Option<usize>) -> Self {
        Self {
            header,
            column,
            kind: FieldKind::Text,
            max_len,
            presence: Presence::Key,
            allowed: None,
        }
    }

    pub const fn text(header: &'static str, column: &'static str, max_len: Option<usize>) -> Self {
        Self {
            header,
            column,
            kind: FieldKind::Text,
            max_len,
            presence: Presence::Optional,
            allowed: None,
        }
    }

    pub const fn date(header: &'static str, column: &'static str) -> Self {
        Self {
            header,
            column,
            kind: FieldKind::Date,
            max_len: None,
            presence: Presence::Optional,
            allowed: None,
        }
    }

    pub const fn required(self) -> Self {
        Self {
            presence: Presence::Required,
            ..self
        }
    }

    pub const fn one_of(self, values: &'static [&'static str]) -> Self {
        Self {
            allowed: Some(values),
            ..self
        }
    }

    pub fn is_not_null(&self) -> bool {
        self.presence != Presence::Optional
    }
}

// ==========================================
// Relations
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef {
    pub entity: EntityType,
    pub table: &'static str,
    pub column: &'static str,
}

/// Hard reference: rows without a matching parent are orphans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub field_index: usize,
    /// A row resolves if ANY parent holds the key.
    pub parents: &'static [ParentRef],
}

/// Warn-only reference: misses are counted, rows are still stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftReference {
    pub field_index: usize,
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// The key field is the primary key.
    Natural,
    /// Surrogate id; identity is the tuple of all declared columns.
    Content,
}

// ==========================================
// Entity descriptor
// ==========================================

#[derive(Debug)]
pub struct EntitySchema {
    pub entity: EntityType,
    pub table: &'static str,
    /// Default extract file name used by full refresh
    pub file_name: &'static str,
    pub key_index: usize,
    pub key_format: KeyFormat,
    pub fields: &'static [FieldSpec],
    pub identity: Identity,
    pub foreign_key: Option<ForeignKey>,
    pub soft_refs: &'static [SoftReference],
    pub conflict_policy: ConflictPolicy,
    pub dedup_policy: DedupPolicy,
}

impl EntitySchema {
    pub fn key_field(&self) -> &FieldSpec {
        &self.fields[self.key_index]
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.column).collect()
    }

    pub fn identity_columns(&self) -> Vec<&'static str> {
        match self.identity {
            Identity::Natural => vec![self.key_field().column],
            Identity::Content => self.columns(),
        }
    }

    /// Parent entities that must be loaded before this one.
    pub fn parent_entities(&self) -> Vec<EntityType> {
        self.foreign_key
            .map(|fk| fk.parents.iter().map(|p| p.entity).collect())
            .unwrap_or_default()
    }

    /// Idempotent DDL for the permanent table (and its lookup index).
    pub fn create_table_sql(&self) -> String {
        let mut defs: Vec<String> = Vec::with_capacity(self.fields.len() + 1);

        if self.identity == Identity::Content {
            defs.push("id INTEGER PRIMARY KEY AUTOINCREMENT".to_string());
        }

        for (index, field) in self.fields.iter().enumerate() {
            let mut def = format!("{} TEXT", field.column);
            if self.identity == Identity::Natural && index == self.key_index {
                def.push_str(" PRIMARY KEY");
            }
            if field.is_not_null() {
                def.push_str(" NOT NULL");
            }
            if let Some(fk) = self.foreign_key.filter(|fk| fk.field_index == index) {
                // SQLite cannot express "references A or B"
                if let [parent] = fk.parents {
                    def.push_str(&format!(
                        " REFERENCES {}({}) ON DELETE CASCADE",
                        parent.table, parent.column
                    ));
                }
            }
            defs.push(def);
        }

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
            self.table,
            defs.join(",\n    ")
        );

        if let Some(fk) = self.foreign_key {
            let column = self.fields[fk.field_index].column;
            sql.push_str(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column});\n",
                table = self.table,
                column = column
            ));
        }

        sql
    }
}

// ==========================================
// Lookup
// ==========================================

/// All descriptors in full-refresh load order.
pub fn all() -> &'static [EntitySchema] {
    &entities::SCHEMAS
}

pub fn schema_for(entity: EntityType) -> &'static EntitySchema {
    // SCHEMAS mirrors EntityType::LOAD_ORDER
    &entities::SCHEMAS[entity as usize]
}

/// Resolves a (case-insensitive) entity tag.
pub fn lookup(tag: &str) -> IngestResult<&'static EntitySchema> {
    EntityType::from_tag(tag)
        .map(schema_for)
        .ok_or_else(|| IngestError::UnknownEntityType(tag.to_string()))
}
