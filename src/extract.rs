//! Extraction entry points: connect, read the catalog, build the model.
//!
//! Every call opens its own connection and closes it before returning, on
//! success and on every error path. Nothing is shared between calls.

use crate::catalog::{Catalog, CatalogError, PgCatalog};
use crate::graph::{ErGraph, GraphAssembler, ResolutionError, ResolutionPolicy};
use crate::schema::{Schema, SchemaBuilder, ValidationError};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, PgConnection};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;

/// `application_name` reported to the server
pub const APPLICATION_NAME: &str = "pg-erd";

/// Connection credentials for one extraction
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub database: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    /// libpq-style sslmode: disable, allow, prefer, require, verify-ca, verify-full
    pub ssl_mode: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            database: database.into(),
            password: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ssl_mode: "disable".to_string(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_ssl_mode(mut self, ssl_mode: impl Into<String>) -> Self {
        self.ssl_mode = ssl_mode.into();
        self
    }

    fn connect_options(&self) -> Result<PgConnectOptions, ExtractError> {
        let ssl_mode: PgSslMode = self
            .ssl_mode
            .parse()
            .map_err(ExtractError::Connection)?;

        // The driver seeds options from PG* variables; overwrite every one of
        // them so only these credentials reach the server. An empty password
        // is what the driver sends when none is set.
        Ok(PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(self.password.as_deref().unwrap_or_default())
            .database(&self.database)
            .ssl_mode(ssl_mode)
            .application_name(APPLICATION_NAME))
    }
}

// Never print the password.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("database", &self.database)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

/// Knobs for one extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Deadline applied to the connect step and to each catalog query
    pub timeout: Option<Duration>,
    /// Schemas skipped by the column scan, on top of the system schemas
    pub exclude_schemas: Vec<String>,
    /// How `extract_graph` treats foreign keys with a missing endpoint
    pub policy: ResolutionPolicy,
}

/// Why an extraction failed
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("{context}: {source}")]
    Catalog {
        context: &'static str,
        #[source]
        source: CatalogError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },
}

const TABLES_CONTEXT: &str = "error extracting tables";
const FOREIGN_KEYS_CONTEXT: &str = "error extracting foreign keys";

/// Read both catalog views from any `Catalog` and fold them into a `Schema`
pub async fn read_schema<C: Catalog + ?Sized>(
    catalog: &mut C,
    timeout: Option<Duration>,
) -> Result<Schema, ExtractError> {
    let columns = with_deadline(timeout, "reading columns", catalog.read_columns())
        .await?
        .map_err(|source| ExtractError::Catalog {
            context: TABLES_CONTEXT,
            source,
        })?;

    let foreign_keys =
        with_deadline(timeout, "reading foreign keys", catalog.read_foreign_keys())
            .await?
            .map_err(|source| ExtractError::Catalog {
                context: FOREIGN_KEYS_CONTEXT,
                source,
            })?;

    let schema = SchemaBuilder::from_rows(&columns, &foreign_keys)?;
    debug!(
        column_rows = columns.len(),
        tables = schema.len(),
        foreign_keys = schema.foreign_keys.len(),
        "built schema model"
    );
    Ok(schema)
}

/// Connect, read the catalog and return tables and foreign keys
pub async fn extract_schema(
    credentials: &Credentials,
    options: &ExtractOptions,
) -> Result<Schema, ExtractError> {
    let start = Instant::now();
    let mut conn = connect(credentials, options.timeout).await?;

    let result = {
        let mut catalog =
            PgCatalog::new(&mut conn).excluding(options.exclude_schemas.iter().cloned());
        read_schema(&mut catalog, options.timeout).await
    };

    if let Err(e) = conn.close().await {
        warn!(error = %e, "failed to close connection cleanly");
    }

    if let Ok(schema) = &result {
        info!(
            database = %credentials.database,
            tables = schema.len(),
            foreign_keys = schema.foreign_keys.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "extracted schema"
        );
    }
    result
}

/// Connect, read the catalog and assemble the ER graph
pub async fn extract_graph(
    credentials: &Credentials,
    options: &ExtractOptions,
) -> Result<ErGraph, ExtractError> {
    let schema = extract_schema(credentials, options).await?;
    assemble(&schema, options.policy)
}

/// Assemble an already extracted schema under the given policy
pub fn assemble(schema: &Schema, policy: ResolutionPolicy) -> Result<ErGraph, ExtractError> {
    Ok(GraphAssembler::new().with_policy(policy).assemble(schema)?)
}

async fn connect(
    credentials: &Credentials,
    timeout: Option<Duration>,
) -> Result<PgConnection, ExtractError> {
    debug!(target_db = %credentials, "connecting");
    let options = credentials.connect_options()?;
    with_deadline(timeout, "connecting", PgConnection::connect_with(&options))
        .await?
        .map_err(ExtractError::Connection)
}

async fn with_deadline<F: Future>(
    timeout: Option<Duration>,
    stage: &'static str,
    fut: F,
) -> Result<F::Output, ExtractError> {
    match timeout {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| ExtractError::Timeout { stage, after }),
        None => Ok(fut.await),
    }
}
