//! Schema model for ERD extraction.
//!
//! This module provides:
//! - Data models for tables (schema-qualified, with ordered column names)
//! - Single-column foreign key relationships
//! - `SchemaBuilder`, which folds raw catalog rows into the model

mod builder;

pub use builder::*;

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A table, identified by its schema and name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Namespace the table lives in
    pub schema: String,
    /// Table name
    pub name: String,
    /// Column names in catalog scan order
    pub columns: Vec<String>,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// A directed single-column foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Schema of the referencing table
    pub schema: String,
    /// Referencing table
    pub table_name: String,
    /// Referencing column
    pub column_name: String,
    /// Schema of the referenced table
    pub foreign_schema: String,
    /// Referenced table
    pub foreign_table_name: String,
    /// Referenced column
    pub foreign_column_name: String,
}

impl ForeignKey {
    /// `schema.table` of the referencing side
    pub fn source_name(&self) -> String {
        format!("{}.{}", self.schema, self.table_name)
    }

    /// `schema.table` of the referenced side
    pub fn target_name(&self) -> String {
        format!("{}.{}", self.foreign_schema, self.foreign_table_name)
    }

    /// Whether the key points back at its own table
    pub fn is_self_reference(&self) -> bool {
        self.schema == self.foreign_schema && self.table_name == self.foreign_table_name
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} -> {}.{}.{}",
            self.schema,
            self.table_name,
            self.column_name,
            self.foreign_schema,
            self.foreign_table_name,
            self.foreign_column_name
        )
    }
}

/// Tables and foreign keys read from one catalog snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Tables in first-seen order
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Foreign keys in catalog order
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a table by schema and name (exact match)
    pub fn get_table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }

    /// Get the number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if schema has no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of columns across all tables
    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    /// Keep only tables whose qualified name matches one of the patterns
    pub fn filter_tables(&mut self, patterns: &[Pattern]) {
        if patterns.is_empty() {
            return;
        }
        self.retain_tables(|name| patterns.iter().any(|p| p.matches(name)));
    }

    /// Drop tables whose qualified name matches one of the patterns
    pub fn exclude_tables(&mut self, patterns: &[Pattern]) {
        if patterns.is_empty() {
            return;
        }
        self.retain_tables(|name| !patterns.iter().any(|p| p.matches(name)));
    }

    // Foreign keys touching a dropped table go with it, so filtering never
    // turns into unresolved edges later.
    fn retain_tables(&mut self, keep: impl Fn(&str) -> bool) {
        self.tables.retain(|t| keep(&t.qualified_name()));
        self.foreign_keys
            .retain(|fk| keep(&fk.source_name()) && keep(&fk.target_name()));
    }
}
