//! Catalog access: the two metadata reads the rest of the pipeline is built on.
//!
//! This module provides:
//! - `CatalogRow`, a raw row of nullable text cells
//! - The `Catalog` trait implemented by every metadata source
//! - `PgCatalog`, reading PostgreSQL's `information_schema` views
//! - `StaticCatalog`, a fixed in-memory source for tests and embedding

mod postgres;

pub use postgres::PgCatalog;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Schemas that never contain user tables
pub const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema"];

/// Number of cells in a column row: schema, table, column
pub const COLUMN_ROW_ARITY: usize = 3;

/// Number of cells in a foreign key row: schema, table, column and the referenced triple
pub const FOREIGN_KEY_ROW_ARITY: usize = 6;

/// A raw catalog row as returned by the engine.
///
/// Cells are kept nullable and unchecked; the schema builder decides what a
/// well-formed row looks like.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogRow(pub Vec<Option<String>>);

impl CatalogRow {
    /// Build a row where every cell is present
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(|v| Some(v.into())).collect())
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cell at `index`, `None` for both SQL NULL and out-of-range
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|cell| cell.as_deref())
    }
}

/// A failed catalog query, carrying the engine's message
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CatalogError {
    pub message: String,
}

impl CatalogError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err)
    }
}

/// A source of catalog metadata.
///
/// Implementations issue exactly one read per call and never retry.
#[async_trait]
pub trait Catalog: Send {
    /// `(schema, table, column)` rows for every column of every user table
    async fn read_columns(&mut self) -> Result<Vec<CatalogRow>, CatalogError>;

    /// `(schema, table, column, foreign_schema, foreign_table, foreign_column)`
    /// rows, one per column pair of every foreign key constraint
    async fn read_foreign_keys(&mut self) -> Result<Vec<CatalogRow>, CatalogError>;
}

/// A catalog whose answers are fixed up front.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    columns: Vec<CatalogRow>,
    foreign_keys: Vec<CatalogRow>,
    column_failure: Option<String>,
    foreign_key_failure: Option<String>,
}

impl StaticCatalog {
    pub fn new(columns: Vec<CatalogRow>, foreign_keys: Vec<CatalogRow>) -> Self {
        Self {
            columns,
            foreign_keys,
            ..Self::default()
        }
    }

    /// Add a fully populated column row
    pub fn with_column(mut self, schema: &str, table: &str, column: &str) -> Self {
        self.columns
            .push(CatalogRow::from_values([schema, table, column]));
        self
    }

    /// Add a fully populated foreign key row
    pub fn with_foreign_key(
        mut self,
        (schema, table, column): (&str, &str, &str),
        (foreign_schema, foreign_table, foreign_column): (&str, &str, &str),
    ) -> Self {
        self.foreign_keys.push(CatalogRow::from_values([
            schema,
            table,
            column,
            foreign_schema,
            foreign_table,
            foreign_column,
        ]));
        self
    }

    /// Make `read_columns` fail with the given engine message
    pub fn failing_columns(mut self, message: &str) -> Self {
        self.column_failure = Some(message.to_string());
        self
    }

    /// Make `read_foreign_keys` fail with the given engine message
    pub fn failing_foreign_keys(mut self, message: &str) -> Self {
        self.foreign_key_failure = Some(message.to_string());
        self
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn read_columns(&mut self) -> Result<Vec<CatalogRow>, CatalogError> {
        match &self.column_failure {
            Some(message) => Err(CatalogError::new(message)),
            None => Ok(self.columns.clone()),
        }
    }

    async fn read_foreign_keys(&mut self) -> Result<Vec<CatalogRow>, CatalogError> {
        match &self.foreign_key_failure {
            Some(message) => Err(CatalogError::new(message)),
            None => Ok(self.foreign_keys.clone()),
        }
    }
}
