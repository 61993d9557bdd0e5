//! Serve command: the HTTP extraction API.

use super::ConnectionArgs;
use anyhow::{Context, Result};
use pg_erd::extract::{DEFAULT_HOST, DEFAULT_PORT};
use pg_erd::server::{self, ServerConfig};

pub async fn run(
    connection: ConnectionArgs,
    bind: String,
    layout: Option<String>,
    strict: bool,
) -> Result<()> {
    let config = connection.load_config()?;
    let file = &config.connection;

    let server_config = ServerConfig {
        bind_addr: bind
            .parse()
            .with_context(|| format!("invalid bind address '{}'", bind))?,
        host: connection
            .host
            .or_else(|| file.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: connection.port.or(file.port).unwrap_or(DEFAULT_PORT),
        ssl_mode: connection
            .sslmode
            .or_else(|| file.sslmode.clone())
            .unwrap_or_else(|| "disable".to_string()),
        options: config.extract_options(connection.timeout, &connection.exclude_schemas, strict),
        layout: config.layout(layout.as_deref())?,
    };

    server::serve(server_config).await
}
