//! YAML configuration and connection settings resolution.
//!
//! Settings are layered: command-line flags (and their environment variables)
//! win over the config file, the config file wins over interactive prompts,
//! and built-in defaults fill whatever is left.

use crate::extract::{Credentials, ExtractOptions, DEFAULT_HOST, DEFAULT_PORT};
use crate::graph::{Layout, ResolutionPolicy};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Connection section of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub database: Option<String>,
    pub password: Option<String>,
    pub sslmode: Option<String>,
}

/// Diagram section of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// `lr` or `tb`
    pub layout: Option<String>,
    /// Fail on unresolved foreign keys instead of skipping them
    pub strict: bool,
    /// Renderer executable, `dot` when unset
    pub dot_program: Option<String>,
}

/// Complete YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErdConfig {
    pub connection: ConnectionConfig,
    /// Deadline for connecting and for each catalog query
    pub timeout_secs: Option<u64>,
    /// Extra schemas to leave out of the column scan
    pub exclude_schemas: Vec<String>,
    pub diagram: DiagramConfig,
}

impl ErdConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Load from an optional path, falling back to defaults
    pub fn load_optional(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolve credentials, prompting for whatever is still missing
    pub fn credentials<P>(
        &self,
        overrides: &ConnectionOverrides,
        mut prompt: P,
    ) -> anyhow::Result<Credentials>
    where
        P: FnMut(PromptField) -> anyhow::Result<String>,
    {
        let conn = &self.connection;

        let username = match pick(&overrides.username, &conn.username) {
            Some(v) => v,
            None => prompt(PromptField::Username)?,
        };
        let database = match pick(&overrides.database, &conn.database) {
            Some(v) => v,
            None => prompt(PromptField::Database)?,
        };
        if username.trim().is_empty() || database.trim().is_empty() {
            bail!("username and dbname are required");
        }

        let mut credentials = Credentials::new(username.trim(), database.trim()).with_host(
            pick(&overrides.host, &conn.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            overrides.port.or(conn.port).unwrap_or(DEFAULT_PORT),
        );
        if let Some(ssl_mode) = pick(&overrides.ssl_mode, &conn.sslmode) {
            credentials = credentials.with_ssl_mode(ssl_mode);
        }
        if let Some(password) = pick(&overrides.password, &conn.password) {
            credentials = credentials.with_password(password);
        }
        Ok(credentials)
    }

    /// Extraction options with command-line values taking precedence
    pub fn extract_options(
        &self,
        timeout_secs: Option<u64>,
        exclude_schemas: &[String],
        strict: bool,
    ) -> ExtractOptions {
        let mut schemas = self.exclude_schemas.clone();
        for schema in exclude_schemas {
            if !schemas.contains(schema) {
                schemas.push(schema.clone());
            }
        }

        ExtractOptions {
            timeout: timeout_secs
                .or(self.timeout_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            exclude_schemas: schemas,
            policy: if strict || self.diagram.strict {
                ResolutionPolicy::Strict
            } else {
                ResolutionPolicy::Skip
            },
        }
    }

    /// Diagram layout, command line first
    pub fn layout(&self, cli: Option<&str>) -> anyhow::Result<Layout> {
        cli.or(self.diagram.layout.as_deref())
            .map(|l| l.parse::<Layout>())
            .transpose()
            .map_err(|e: String| anyhow::anyhow!(e))
            .map(Option::unwrap_or_default)
    }
}

/// Connection values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub username: Option<String>,
    pub database: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ssl_mode: Option<String>,
}

/// Which value an interactive prompt is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptField {
    Username,
    Database,
}

impl PromptField {
    pub fn prompt(&self) -> &'static str {
        match self {
            PromptField::Username => "Enter database username: ",
            PromptField::Database => "Enter database name: ",
        }
    }
}

fn pick(first: &Option<String>, second: &Option<String>) -> Option<String> {
    first
        .as_ref()
        .or(second.as_ref())
        .filter(|v| !v.is_empty())
        .cloned()
}
