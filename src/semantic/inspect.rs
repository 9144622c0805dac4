//! Schema Inspector: reads raw catalog metadata from the store.
//!
//! Purely read-only. System catalog tables (`sqlite_*`) are excluded.
use std::collections::BTreeMap;

use crate::db::Db;
use crate::error::SchemaError;
use crate::semantic::{ColumnInfo, ForeignKeyEdge, SchemaDocument};

/// Produce a fresh [`SchemaDocument`] for the open store.
///
/// Tables are enumerated in name order; columns and foreign keys keep
/// the order the catalog reports them in. A missing `to` column on a
/// foreign key defaults to `"id"`.
pub fn inspect_schema(db: &Db) -> Result<SchemaDocument, SchemaError> {
    let conn = db.conn();

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = BTreeMap::new();
    let mut foreign_keys = BTreeMap::new();

    for table in &tables {
        // Table names come from sqlite_master itself, but quote anyway.
        let quoted = table.replace('\'', "''");

        let mut stmt = conn.prepare(&format!("PRAGMA table_info('{quoted}')"))?;
        let cols = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get("name")?,
                    data_type: row.get("type")?,
                    nullable: row.get::<_, i64>("notnull")? == 0,
                    primary_key: row.get::<_, i64>("pk")? != 0,
                    default_value: row.get("dflt_value")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        columns.insert(table.clone(), cols);

        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list('{quoted}')"))?;
        let fks = stmt
            .query_map([], |row| {
                Ok(ForeignKeyEdge {
                    from_column: row.get("from")?,
                    to_table: row.get("table")?,
                    to_column: row
                        .get::<_, Option<String>>("to")?
                        .unwrap_or_else(|| "id".to_string()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        foreign_keys.insert(table.clone(), fks);
    }

    Ok(SchemaDocument {
        tables,
        columns,
        foreign_keys,
    })
}
