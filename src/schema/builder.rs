//! Folding raw catalog rows into tables and foreign keys.

use super::{ForeignKey, Schema, Table};
use crate::catalog::{CatalogRow, COLUMN_ROW_ARITY, FOREIGN_KEY_ROW_ARITY};
use ahash::AHashMap;
use std::fmt;
use thiserror::Error;

const COLUMN_FIELDS: [&str; COLUMN_ROW_ARITY] = ["schema", "table", "column"];

const FOREIGN_KEY_FIELDS: [&str; FOREIGN_KEY_ROW_ARITY] = [
    "schema",
    "table",
    "column",
    "foreign_schema",
    "foreign_table",
    "foreign_column",
];

/// Which catalog read a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Column,
    ForeignKey,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKind::Column => write!(f, "column"),
            RowKind::ForeignKey => write!(f, "foreign key"),
        }
    }
}

/// A catalog row the builder refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed {kind} row {row}: expected {expected} fields, found {found}")]
    Arity {
        kind: RowKind,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("malformed {kind} row {row}: field `{field}` is null or empty")]
    MissingField {
        kind: RowKind,
        row: usize,
        field: &'static str,
    },
}

/// Index of a table inside the builder, in first-seen order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub u32);

/// Accumulates catalog rows into a `Schema`.
///
/// Tables are keyed by `(schema, name)` and emitted in the order their first
/// row arrived. Foreign keys are kept one per row, unmerged.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<Table>,
    index: AHashMap<(String, String), TableId>,
    foreign_keys: Vec<ForeignKey>,
    column_rows: usize,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a whole extraction in one go
    pub fn from_rows(
        columns: &[CatalogRow],
        foreign_keys: &[CatalogRow],
    ) -> Result<Schema, ValidationError> {
        let mut builder = Self::new();
        for row in columns {
            builder.add_column_row(row)?;
        }
        for row in foreign_keys {
            builder.add_foreign_key_row(row)?;
        }
        Ok(builder.build())
    }

    /// Fold an existing model (e.g. one read back from JSON) through the same
    /// row checks as a live extraction. Duplicate tables merge their columns;
    /// a table without columns is a missing `column` field.
    pub fn from_schema(schema: &Schema) -> Result<Schema, ValidationError> {
        let mut builder = Self::new();
        for table in &schema.tables {
            if table.columns.is_empty() {
                builder.add_column_row(&CatalogRow(vec![
                    Some(table.schema.clone()),
                    Some(table.name.clone()),
                    None,
                ]))?;
            }
            for column in &table.columns {
                builder.add_column_row(&CatalogRow::from_values([
                    table.schema.as_str(),
                    table.name.as_str(),
                    column.as_str(),
                ]))?;
            }
        }
        for fk in &schema.foreign_keys {
            builder.add_foreign_key_row(&CatalogRow::from_values([
                fk.schema.as_str(),
                fk.table_name.as_str(),
                fk.column_name.as_str(),
                fk.foreign_schema.as_str(),
                fk.foreign_table_name.as_str(),
                fk.foreign_column_name.as_str(),
            ]))?;
        }
        Ok(builder.build())
    }

    /// Append one `(schema, table, column)` row, creating the table on first sight
    pub fn add_column_row(&mut self, row: &CatalogRow) -> Result<TableId, ValidationError> {
        let row_index = self.column_rows;
        let [schema, table, column] =
            required_fields(row, RowKind::Column, row_index, COLUMN_FIELDS)?;
        self.column_rows += 1;

        let id = self.table_id(schema, table);
        self.tables[id.0 as usize].columns.push(column.to_string());
        Ok(id)
    }

    /// Append one foreign key row
    pub fn add_foreign_key_row(&mut self, row: &CatalogRow) -> Result<(), ValidationError> {
        let row_index = self.foreign_keys.len();
        let [schema, table, column, foreign_schema, foreign_table, foreign_column] =
            required_fields(row, RowKind::ForeignKey, row_index, FOREIGN_KEY_FIELDS)?;

        self.foreign_keys.push(ForeignKey {
            schema: schema.to_string(),
            table_name: table.to_string(),
            column_name: column.to_string(),
            foreign_schema: foreign_schema.to_string(),
            foreign_table_name: foreign_table.to_string(),
            foreign_column_name: foreign_column.to_string(),
        });
        Ok(())
    }

    /// Number of distinct tables seen so far
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn build(self) -> Schema {
        Schema {
            tables: self.tables,
            foreign_keys: self.foreign_keys,
        }
    }

    fn table_id(&mut self, schema: &str, name: &str) -> TableId {
        let key = (schema.to_string(), name.to_string());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = TableId(self.tables.len() as u32);
        self.tables.push(Table::new(schema, name));
        self.index.insert(key, id);
        id
    }
}

/// Check arity and presence of every cell, returning them in order
fn required_fields<'r, const N: usize>(
    row: &'r CatalogRow,
    kind: RowKind,
    row_index: usize,
    fields: [&'static str; N],
) -> Result<[&'r str; N], ValidationError> {
    if row.len() != N {
        return Err(ValidationError::Arity {
            kind,
            row: row_index,
            expected: N,
            found: row.len(),
        });
    }

    let mut values = [""; N];
    for (i, field) in fields.iter().enumerate() {
        match row.get(i) {
            Some(value) if !value.is_empty() => values[i] = value,
            _ => {
                return Err(ValidationError::MissingField {
                    kind,
                    row: row_index,
                    field: *field,
                })
            }
        }
    }
    Ok(values)
}
