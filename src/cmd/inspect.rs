//! Inspect command: tables and foreign keys as JSON.

use super::{spinner, ConnectionArgs};
use anyhow::Result;
use pg_erd::extract;
use pg_erd::render::write_artifact;
use std::path::PathBuf;

pub async fn run(
    connection: ConnectionArgs,
    output: Option<PathBuf>,
    progress: bool,
) -> Result<()> {
    let config = connection.load_config()?;
    let options =
        config.extract_options(connection.timeout, &connection.exclude_schemas, false);
    let credentials = connection.credentials(&config)?;

    let pb = spinner(progress, format!("Reading catalog of {}", credentials))?;
    let result = extract::extract_schema(&credentials, &options).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let schema = result?;

    let json = serde_json::to_string_pretty(&schema)?;
    match output {
        Some(path) => {
            write_artifact(&path, &json)?;
            eprintln!(
                "Schema written to: {} ({} tables, {} foreign keys)",
                path.display(),
                schema.len(),
                schema.foreign_keys.len()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
