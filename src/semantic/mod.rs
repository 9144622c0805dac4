//! Semantic layer: a derived, LLM-readable description of the store.
//!
//! Built wholesale on every request from live catalog metadata — the store
//! is the single source of truth and nothing here is cached.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::Db;
use crate::error::SchemaError;

pub mod inspect;
pub mod relations;
pub mod summary;

/// One column as declared in the catalog.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
}

/// A declared foreign key edge, authoritative when present.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ForeignKeyEdge {
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Point-in-time snapshot of tables, columns, and declared foreign keys.
///
/// Tables are listed in catalog-enumeration order (name order); columns
/// keep their declared order within each table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SchemaDocument {
    pub tables: Vec<String>,
    pub columns: BTreeMap<String, Vec<ColumnInfo>>,
    pub foreign_keys: BTreeMap<String, Vec<ForeignKeyEdge>>,
}

/// An inferred table relationship.
///
/// `fk` edges come straight from the catalog and are certain.
/// `heuristic_id` edges are naming-convention guesses and must never be
/// treated as ground truth. `bridge_hint` flags a likely many-to-many
/// association table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Relationship {
    #[serde(rename = "fk")]
    Declared {
        from_table: String,
        from_column: String,
        to_table: String,
        to_column: String,
    },
    #[serde(rename = "heuristic_id")]
    HeuristicId {
        from_table: String,
        from_column: String,
        to_table: String,
        to_column: String,
    },
    #[serde(rename = "bridge_hint")]
    BridgeHint {
        bridge_table: String,
        connects: Vec<String>,
    },
}

impl Relationship {
    pub fn kind(&self) -> &'static str {
        match self {
            Relationship::Declared { .. } => "fk",
            Relationship::HeuristicId { .. } => "heuristic_id",
            Relationship::BridgeHint { .. } => "bridge_hint",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RelationshipSet {
    pub relationships: Vec<Relationship>,
}

/// Aggregate semantic document: schema + relationships + text summary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SemanticDocument {
    pub schema: SchemaDocument,
    pub relationships: RelationshipSet,
    pub summary: String,
}

/// Build the full semantic document for an open store.
///
/// Pure read path: inspect → infer → summarize. Idempotent against an
/// unchanged store.
pub fn build_semantic_document(db: &Db) -> Result<SemanticDocument, SchemaError> {
    let schema = inspect::inspect_schema(db)?;
    let rels = relations::infer_relationships(&schema);
    let summary = summary::semantic_summary(&schema, &rels);
    Ok(SemanticDocument {
        schema,
        relationships: RelationshipSet {
            relationships: rels,
        },
        summary,
    })
}
