mod graph;
mod inspect;
mod prompt;
mod serve;

use anyhow::Context;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use pg_erd::config::{ConnectionOverrides, ErdConfig};
use pg_erd::Credentials;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pg-erd")]
#[command(version)]
#[command(about = "Generate entity-relationship diagrams from a PostgreSQL database", long_about = None)]
pub struct Cli {
    /// Increase log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags shared by every database command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Database user
    #[arg(short = 'U', long, env = "PGUSER")]
    pub username: Option<String>,

    /// Database name
    #[arg(short = 'd', long, env = "PGDATABASE")]
    pub dbname: Option<String>,

    /// Database server host
    #[arg(long, env = "PGHOST")]
    pub host: Option<String>,

    /// Database server port
    #[arg(long, env = "PGPORT")]
    pub port: Option<u16>,

    /// SSL mode: disable, allow, prefer, require, verify-ca, verify-full
    #[arg(long, env = "PGSSLMODE")]
    pub sslmode: Option<String>,

    #[arg(long = "pgpassword", env = "PGPASSWORD", hide = true, hide_env_values = true)]
    pub password_env: Option<String>,

    /// Prompt for a password
    #[arg(short = 'W', long = "password")]
    pub ask_password: bool,

    /// YAML config file with connection and diagram settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seconds allowed for connecting and for each catalog query (0 = no limit)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Additional schemas to leave out (comma-separated)
    #[arg(long = "exclude-schema", value_delimiter = ',')]
    pub exclude_schemas: Vec<String>,
}

impl ConnectionArgs {
    pub fn load_config(&self) -> anyhow::Result<ErdConfig> {
        ErdConfig::load_optional(self.config.as_deref())
    }

    pub fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            username: self.username.clone(),
            database: self.dbname.clone(),
            password: self.password_env.clone(),
            host: self.host.clone(),
            port: self.port,
            ssl_mode: self.sslmode.clone(),
        }
    }

    /// Resolve credentials from flags, environment, config file and prompts
    pub fn credentials(&self, config: &ErdConfig) -> anyhow::Result<Credentials> {
        let credentials = config.credentials(&self.overrides(), prompt::ask)?;
        if self.ask_password {
            let password = prompt::password(&credentials)?;
            return Ok(credentials.with_password(password));
        }
        Ok(credentials)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the schema and write a Graphviz ER diagram
    Graph {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Read a schema JSON file (from `inspect`) instead of connecting
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: er_diagram.dot, or er_diagram.json with --format json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: dot, json (detected from --output extension when omitted)
        #[arg(short, long)]
        format: Option<String>,

        /// Rendered image path; png, svg or pdf by extension
        #[arg(long, default_value = "er_diagram.png")]
        image: PathBuf,

        /// Write the DOT file only, do not run Graphviz
        #[arg(long)]
        no_render: bool,

        /// Layout direction: tb (top-bottom) or lr (left-right)
        #[arg(long)]
        layout: Option<String>,

        /// Only include tables matching these patterns (comma-separated, glob over schema.table)
        #[arg(short, long)]
        tables: Option<String>,

        /// Exclude tables matching these patterns (comma-separated, glob over schema.table)
        #[arg(short, long)]
        exclude: Option<String>,

        /// Fail when a foreign key references a table outside the diagram
        #[arg(long)]
        strict: bool,

        /// Graphviz executable used for rendering
        #[arg(long)]
        dot_program: Option<String>,

        /// Show a spinner while reading the catalog
        #[arg(short, long)]
        progress: bool,
    },

    /// Extract tables and foreign keys as JSON
    Inspect {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show a spinner while reading the catalog
        #[arg(short, long)]
        progress: bool,
    },

    /// Serve the extraction API over HTTP
    Serve {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,

        /// Layout direction for the DOT endpoint
        #[arg(long)]
        layout: Option<String>,

        /// Fail requests on unresolved foreign keys instead of skipping them
        #[arg(long)]
        strict: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Graph {
            connection,
            input,
            output,
            format,
            image,
            no_render,
            layout,
            tables,
            exclude,
            strict,
            dot_program,
            progress,
        } => {
            graph::run(graph::GraphArgs {
                connection,
                input,
                output,
                format,
                image,
                no_render,
                layout,
                tables,
                exclude,
                strict,
                dot_program,
                progress,
            })
            .await
        }
        Commands::Inspect {
            connection,
            output,
            progress,
        } => inspect::run(connection, output, progress).await,
        Commands::Serve {
            connection,
            bind,
            layout,
            strict,
        } => serve::run(connection, bind, layout, strict).await,
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "pg-erd", &mut io::stdout());
            Ok(())
        }
    }
}

/// Spinner on stderr while the catalog is read
pub(crate) fn spinner(enabled: bool, message: String) -> anyhow::Result<Option<ProgressBar>> {
    if !enabled {
        return Ok(None);
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("invalid progress template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(Some(pb))
}
