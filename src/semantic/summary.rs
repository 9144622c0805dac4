//! Semantic Summarizer: renders the schema and inferred relationships
//! into a compact text block for a downstream LLM prompt.
//!
//! The exact wording is advisory; the information content (every table,
//! every relationship) is the contract.
use crate::semantic::{Relationship, SchemaDocument};

/// Render a deterministic multi-line summary.
pub fn semantic_summary(schema: &SchemaDocument, rels: &[Relationship]) -> String {
    let mut lines = vec![format!("Tables: {}", schema.tables.join(", "))];

    for table in &schema.tables {
        let cols: Vec<&str> = schema.columns[table]
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        lines.push(format!(" - {table}: columns = {}", cols.join(", ")));
    }

    if !rels.is_empty() {
        lines.push("Inferred relationships:".to_string());
        for rel in rels {
            match rel {
                Relationship::BridgeHint {
                    bridge_table,
                    connects,
                } => {
                    lines.push(format!(
                        "   * [bridge] {bridge_table} connects [{}]",
                        connects.join(", ")
                    ));
                }
                Relationship::Declared {
                    from_table,
                    from_column,
                    to_table,
                    to_column,
                }
                | Relationship::HeuristicId {
                    from_table,
                    from_column,
                    to_table,
                    to_column,
                } => {
                    lines.push(format!(
                        "   * {from_table}.{from_column} -> {to_table}.{to_column} ({})",
                        rel.kind()
                    ));
                }
            }
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{ColumnInfo, ForeignKeyEdge};
    use std::collections::BTreeMap;

    fn tiny_schema() -> SchemaDocument {
        let col = |name: &str| ColumnInfo {
            name: name.to_string(),
            data_type: "TEXT".to_string(),
            nullable: true,
            primary_key: false,
            default_value: None,
        };
        let mut columns = BTreeMap::new();
        columns.insert("customers".to_string(), vec![col("id"), col("name")]);
        columns.insert(
            "sales_orders".to_string(),
            vec![col("id"), col("customer_id")],
        );
        let mut foreign_keys = BTreeMap::new();
        foreign_keys.insert("customers".to_string(), vec![]);
        foreign_keys.insert(
            "sales_orders".to_string(),
            vec![ForeignKeyEdge {
                from_column: "customer_id".to_string(),
                to_table: "customers".to_string(),
                to_column: "id".to_string(),
            }],
        );
        SchemaDocument {
            tables: vec!["customers".to_string(), "sales_orders".to_string()],
            columns,
            foreign_keys,
        }
    }

    #[test]
    fn test_summary_lists_all_tables_and_relationships() {
        let schema = tiny_schema();
        let rels = crate::semantic::relations::infer_relationships(&schema);
        let summary = semantic_summary(&schema, &rels);

        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Tables: customers, sales_orders");
        assert_eq!(lines[1], " - customers: columns = id, name");
        assert_eq!(lines[2], " - sales_orders: columns = id, customer_id");
        assert_eq!(lines[3], "Inferred relationships:");
        assert!(lines[4].contains("sales_orders.customer_id -> customers.id (fk)"));
    }

    #[test]
    fn test_summary_omits_relationship_header_when_none() {
        let schema = tiny_schema();
        let summary = semantic_summary(&schema, &[]);
        assert!(!summary.contains("Inferred relationships:"));
    }

    #[test]
    fn test_bridge_hint_formatted_distinctly() {
        let schema = tiny_schema();
        let rels = vec![Relationship::BridgeHint {
            bridge_table: "links".to_string(),
            connects: vec!["customers".to_string(), "products".to_string()],
        }];
        let summary = semantic_summary(&schema, &rels);
        assert!(summary.contains("   * [bridge] links connects [customers, products]"));
    }
}
