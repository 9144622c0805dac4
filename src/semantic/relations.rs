//! Relationship Inferencer: declared foreign keys plus naming-convention
//! guesses plus bridge-table detection.
//!
//! The pluralize/singularize rules are deliberately naive English suffix
//! rules (no irregular nouns). Downstream prompt consumers were tuned
//! against this exact output shape; do not tighten the matching.
use std::collections::HashSet;

use crate::semantic::{Relationship, SchemaDocument};

pub(crate) fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        return format!("{stem}ies");
    }
    if !name.ends_with('s') {
        return format!("{name}s");
    }
    name.to_string()
}

pub(crate) fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = name.strip_suffix('s') {
        return stem.to_string();
    }
    name.to_string()
}

/// True when a point-to-point relationship with this exact
/// (from_table, from_column, to_table) was already emitted.
fn has_edge(rels: &[Relationship], table: &str, column: &str, target: &str) -> bool {
    rels.iter().any(|r| match r {
        Relationship::Declared {
            from_table,
            from_column,
            to_table,
            ..
        }
        | Relationship::HeuristicId {
            from_table,
            from_column,
            to_table,
            ..
        } => from_table == table && from_column == column && to_table == target,
        Relationship::BridgeHint { .. } => false,
    })
}

/// Derive the ordered relationship sequence for a schema snapshot.
///
/// Order: declared edges first (table-enumeration order), then heuristic
/// `_id` matches, then bridge hints. A heuristic edge is suppressed when
/// an equivalent edge (same from table/column and target) already exists.
pub fn infer_relationships(schema: &SchemaDocument) -> Vec<Relationship> {
    let mut rels: Vec<Relationship> = Vec::new();

    // 1. Declared foreign keys, authoritative.
    for table in &schema.tables {
        for fk in &schema.foreign_keys[table] {
            rels.push(Relationship::Declared {
                from_table: table.clone(),
                from_column: fk.from_column.clone(),
                to_table: fk.to_table.clone(),
                to_column: fk.to_column.clone(),
            });
        }
    }

    // 2. Naming-convention guesses: <x>_id columns against table names,
    //    modulo naive singular/plural variants on both sides.
    for table in &schema.tables {
        for col in &schema.columns[table] {
            let Some(candidate) = col.name.strip_suffix("_id") else {
                continue;
            };
            if col.name == "id" {
                continue;
            }

            let variants: HashSet<String> = [
                candidate.to_string(),
                pluralize(candidate),
                singularize(candidate),
            ]
            .into_iter()
            .collect();

            for other in &schema.tables {
                let matches = variants.contains(other)
                    || variants.contains(&singularize(other))
                    || variants.contains(&pluralize(other));
                if matches && !has_edge(&rels, table, &col.name, other) {
                    rels.push(Relationship::HeuristicId {
                        from_table: table.clone(),
                        from_column: col.name.clone(),
                        to_table: other.clone(),
                        to_column: "id".to_string(),
                    });
                }
            }
        }
    }

    // 3. Bridge hints: a table whose declared FKs reach >= 2 distinct
    //    targets, where every `_id` column is itself a declared FK column.
    for table in &schema.tables {
        let fks = &schema.foreign_keys[table];

        let mut targets: Vec<&str> = Vec::new();
        for fk in fks {
            if !targets.contains(&fk.to_table.as_str()) {
                targets.push(&fk.to_table);
            }
        }
        if targets.len() < 2 {
            continue;
        }

        let purely_references = schema.columns[table]
            .iter()
            .filter(|c| c.name.ends_with("_id"))
            .all(|c| fks.iter().any(|fk| fk.from_column == c.name));
        if !purely_references {
            continue;
        }

        rels.push(Relationship::BridgeHint {
            bridge_table: table.clone(),
            connects: targets[..2].iter().map(|s| s.to_string()).collect(),
        });
    }

    rels
}
