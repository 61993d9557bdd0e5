//! Graph command: database (or schema file) to DOT and a rendered image.

use super::{spinner, ConnectionArgs};
use anyhow::{Context, Result};
use glob::Pattern;
use pg_erd::graph::{to_dot, to_json, OutputFormat};
use pg_erd::render::{write_artifact, Graphviz, ImageFormat, Renderer};
use pg_erd::{extract, Schema, SchemaBuilder};
use std::fs;
use std::path::{Path, PathBuf};

pub struct GraphArgs {
    pub connection: ConnectionArgs,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub image: PathBuf,
    pub no_render: bool,
    pub layout: Option<String>,
    pub tables: Option<String>,
    pub exclude: Option<String>,
    pub strict: bool,
    pub dot_program: Option<String>,
    pub progress: bool,
}

/// Run the graph command
pub async fn run(args: GraphArgs) -> Result<()> {
    let config = args.connection.load_config()?;
    let layout = config.layout(args.layout.as_deref())?;
    let options = config.extract_options(
        args.connection.timeout,
        &args.connection.exclude_schemas,
        args.strict,
    );

    let format = match (&args.format, &args.output) {
        (Some(f), _) => f
            .parse::<OutputFormat>()
            .map_err(|e: String| anyhow::anyhow!(e))?,
        (None, Some(out)) => out
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension)
            .unwrap_or_default(),
        (None, None) => OutputFormat::Dot,
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("er_diagram.{}", format.extension())));

    let mut schema = match &args.input {
        Some(path) => load_schema_file(path)?,
        None => {
            let credentials = args.connection.credentials(&config)?;
            let pb = spinner(args.progress, format!("Reading catalog of {}", credentials))?;
            let result = extract::extract_schema(&credentials, &options).await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            result?
        }
    };

    if let Some(tables) = &args.tables {
        schema.filter_tables(&parse_patterns(tables)?);
    }
    if let Some(exclude) = &args.exclude {
        schema.exclude_tables(&parse_patterns(exclude)?);
    }

    if schema.is_empty() {
        eprintln!("No tables found.");
    }

    let graph = extract::assemble(&schema, options.policy)?;

    let content = match format {
        OutputFormat::Dot => to_dot(&graph, layout),
        OutputFormat::Json => to_json(&schema, &graph),
    };
    write_artifact(&output, &content)?;
    eprintln!("ERD written to: {}", output.display());

    if format == OutputFormat::Dot && !args.no_render {
        let program = args
            .dot_program
            .clone()
            .or_else(|| config.diagram.dot_program.clone())
            .unwrap_or_else(|| "dot".to_string());
        let image_format = ImageFormat::from_path(&args.image).unwrap_or_default();

        Graphviz::with_program(program).render(&output, &args.image, image_format)?;
        eprintln!("Rendered to: {}", args.image.display());
    }

    eprintln!(
        "\nERD: {} tables, {} columns, {} relationships",
        graph.node_count(),
        schema.column_count(),
        graph.edge_count()
    );
    if !graph.warnings().is_empty() {
        eprintln!(
            "Skipped {} foreign keys referencing tables outside the diagram:",
            graph.warnings().len()
        );
        for warning in graph.warnings() {
            eprintln!("  {}", warning);
        }
    }

    Ok(())
}

/// Read a schema previously written by `inspect` or `graph --format json`
fn load_schema_file(path: &Path) -> Result<Schema> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("input file does not exist: {}", path.display()))?;
    let parsed: Schema = serde_json::from_str(&content)
        .with_context(|| format!("invalid schema file {}", path.display()))?;
    SchemaBuilder::from_schema(&parsed)
        .with_context(|| format!("invalid schema file {}", path.display()))
}

fn parse_patterns(list: &str) -> Result<Vec<Pattern>> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| Pattern::new(p).with_context(|| format!("invalid table pattern '{}'", p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_patterns() {
        let patterns = parse_patterns("public.*, audit.log ,").unwrap();
        assert_eq!(patterns.len(), 2);
        assert!(patterns[0].matches("public.users"));
        assert!(patterns[1].matches("audit.log"));

        assert!(parse_patterns("public.[").is_err());
    }
}
