//! PostgreSQL catalog reader over `information_schema`.

use super::{Catalog, CatalogError, CatalogRow, SYSTEM_SCHEMAS};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use tracing::debug;

// Identifiers are cast to text because `information_schema` exposes them as
// the `sql_identifier` domain.
const COLUMNS_SQL: &str = r#"
SELECT
    table_schema::text,
    table_name::text,
    column_name::text
FROM information_schema.columns
WHERE table_schema::text <> ALL($1::text[])
ORDER BY table_schema, table_name, ordinal_position
"#;

// Each referencing column is paired with the referenced column at the same
// position of the unique constraint. Constraint names are only unique per
// schema, so every join carries the schema too.
const FOREIGN_KEYS_SQL: &str = r#"
SELECT
    kcu.table_schema::text,
    kcu.table_name::text,
    kcu.column_name::text,
    ukcu.table_schema::text AS foreign_table_schema,
    ukcu.table_name::text AS foreign_table_name,
    ukcu.column_name::text AS foreign_column_name
FROM information_schema.table_constraints AS tc
JOIN information_schema.key_column_usage AS kcu
    ON kcu.constraint_schema = tc.constraint_schema
    AND kcu.constraint_name = tc.constraint_name
    AND kcu.table_schema = tc.table_schema
    AND kcu.table_name = tc.table_name
JOIN information_schema.referential_constraints AS rc
    ON rc.constraint_schema = tc.constraint_schema
    AND rc.constraint_name = tc.constraint_name
JOIN information_schema.key_column_usage AS ukcu
    ON ukcu.constraint_schema = rc.unique_constraint_schema
    AND ukcu.constraint_name = rc.unique_constraint_name
    AND ukcu.ordinal_position = kcu.position_in_unique_constraint
WHERE tc.constraint_type = 'FOREIGN KEY'
ORDER BY tc.table_schema, tc.table_name, tc.constraint_name, kcu.ordinal_position
"#;

/// Catalog reader borrowing one open connection
pub struct PgCatalog<'c> {
    conn: &'c mut PgConnection,
    excluded_schemas: Vec<String>,
}

impl<'c> PgCatalog<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self {
            conn,
            excluded_schemas: SYSTEM_SCHEMAS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Exclude more schemas from the column scan, on top of the system schemas
    pub fn excluding<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for schema in schemas {
            let schema = schema.into();
            if !self.excluded_schemas.contains(&schema) {
                self.excluded_schemas.push(schema);
            }
        }
        self
    }
}

#[async_trait]
impl<'c> Catalog for PgCatalog<'c> {
    async fn read_columns(&mut self) -> Result<Vec<CatalogRow>, CatalogError> {
        let rows = sqlx::query(COLUMNS_SQL)
            .bind(self.excluded_schemas.clone())
            .fetch_all(&mut *self.conn)
            .await?;
        debug!(rows = rows.len(), "read column rows");
        rows.iter().map(decode_row).collect()
    }

    async fn read_foreign_keys(&mut self) -> Result<Vec<CatalogRow>, CatalogError> {
        let rows = sqlx::query(FOREIGN_KEYS_SQL)
            .fetch_all(&mut *self.conn)
            .await?;
        debug!(rows = rows.len(), "read foreign key rows");
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &PgRow) -> Result<CatalogRow, CatalogError> {
    let cells = (0..row.len())
        .map(|i| row.try_get::<Option<String>, _>(i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CatalogRow(cells))
}
