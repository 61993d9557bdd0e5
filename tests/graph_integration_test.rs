//! Integration tests for the graph and inspect commands.
//!
//! Everything here runs offline: the schema comes from a JSON file and the
//! renderer is either disabled or replaced with a stand-in program.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn get_binary_path() -> String {
    std::env::var("CARGO_BIN_EXE_pg-erd").unwrap_or_else(|_| "target/debug/pg-erd".to_string())
}

fn pg_erd(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(get_binary_path())
        .current_dir(dir.path())
        .args(args)
        .env_remove("PGUSER")
        .env_remove("PGDATABASE")
        .env_remove("PGPASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run pg-erd")
}

fn create_schema_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("schema.json");
    fs::write(
        &path,
        r#"{
  "tables": [
    {"schema": "public", "name": "users", "columns": ["id", "email"]},
    {"schema": "public", "name": "orders", "columns": ["id", "user_id"]},
    {"schema": "public", "name": "categories", "columns": ["id", "parent_id"]},
    {"schema": "audit", "name": "log", "columns": ["id", "actor_id"]}
  ],
  "foreignKeys": [
    {"schema": "public", "tableName": "orders", "columnName": "user_id",
     "foreignSchema": "public", "foreignTableName": "users", "foreignColumnName": "id"},
    {"schema": "public", "tableName": "categories", "columnName": "parent_id",
     "foreignSchema": "public", "foreignTableName": "categories", "foreignColumnName": "id"},
    {"schema": "audit", "tableName": "log", "columnName": "actor_id",
     "foreignSchema": "public", "foreignTableName": "users", "foreignColumnName": "id"},
    {"schema": "public", "tableName": "users", "columnName": "role",
     "foreignSchema": "pg_catalog", "foreignTableName": "pg_roles", "foreignColumnName": "rolname"}
  ]
}"#,
    )
    .unwrap();
    path
}

#[test]
fn test_graph_writes_default_dot_file() {
    let dir = TempDir::new().unwrap();
    create_schema_file(&dir);

    let output = pg_erd(&dir, &["graph", "--input", "schema.json", "--no-render"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let dot = fs::read_to_string(dir.path().join("er_diagram.dot")).unwrap();
    assert!(dot.starts_with("digraph \"ER Diagram\" {\n  rankdir=TB;\n"));
    assert!(dot.contains("n0 [label=\"public.users\\nid, email\""));
    assert!(dot.contains("n1 -> n0 [label=\"user_id -> id\"];"));
    assert!(dot.contains("n2 -> n2 [label=\"parent_id -> id\"];"));
    assert!(dot.contains("n3 -> n0 [label=\"actor_id -> id\"];"));
    assert!(!dot.contains("pg_roles"));
    assert!(!dir.path().join("er_diagram.png").exists());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("4 tables, 8 columns, 3 relationships"));
    assert!(stderr.contains("Skipped 1 foreign keys"));
    assert!(stderr.contains("pg_catalog.pg_roles.rolname"));
}

#[test]
fn test_graph_strict_rejects_unresolved_foreign_key() {
    let dir = TempDir::new().unwrap();
    create_schema_file(&dir);

    let output = pg_erd(
        &dir,
        &["graph", "--input", "schema.json", "--no-render", "--strict"],
    );
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unresolved foreign key"));
    assert!(stderr.contains("target table not found"));
    assert!(!dir.path().join("er_diagram.dot").exists());
}

#[test]
fn test_graph_lr_layout() {
    let dir = TempDir::new().unwrap();
    create_schema_file(&dir);

    let output = pg_erd(
        &dir,
        &[
            "graph",
            "--input",
            "schema.json",
            "--no-render",
            "--layout",
            "lr",
            "-o",
            "out.gv",
        ],
    );
    assert!(output.status.success());

    let dot = fs::read_to_string(dir.path().join("out.gv")).unwrap();
    assert!(dot.contains("rankdir=LR;"));
}

#[test]
fn test_graph_table_filters_drop_touching_foreign_keys() {
    let dir = TempDir::new().unwrap();
    create_schema_file(&dir);

    let output = pg_erd(
        &dir,
        &[
            "graph",
            "--input",
            "schema.json",
            "--no-render",
            "--exclude",
            "audit.*,public.categories",
        ],
    );
    assert!(output.status.success());

    let dot = fs::read_to_string(dir.path().join("er_diagram.dot")).unwrap();
    assert!(dot.contains("public.users"));
    assert!(dot.contains("public.orders"));
    assert!(!dot.contains("audit.log"));
    assert!(!dot.contains("categories"));

    // users -> pg_roles survives the exclusion and is still skipped
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 tables, 4 columns, 1 relationships"));

    let output = pg_erd(
        &dir,
        &[
            "graph",
            "--input",
            "schema.json",
            "--no-render",
            "--tables",
            "audit.*",
            "-o",
            "audit.dot",
        ],
    );
    assert!(output.status.success());
    let dot = fs::read_to_string(dir.path().join("audit.dot")).unwrap();
    assert!(dot.contains("audit.log"));
    assert!(!dot.contains("->"));
}

#[test]
fn test_graph_json_output() {
    let dir = TempDir::new().unwrap();
    create_schema_file(&dir);

    let output = pg_erd(
        &dir,
        &["graph", "--input", "schema.json", "--format", "json"],
    );
    assert!(output.status.success());

    let content = fs::read_to_string(dir.path().join("er_diagram.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["tables"].as_array().unwrap().len(), 4);
    assert_eq!(json["foreignKeys"].as_array().unwrap().len(), 4);
    assert_eq!(json["stats"]["relationshipCount"], 3);
    assert_eq!(json["unresolved"].as_array().unwrap().len(), 1);

    // JSON output never invokes the renderer
    assert!(!dir.path().join("er_diagram.png").exists());
}

#[cfg(unix)]
#[test]
fn test_graph_renders_with_configured_program() {
    let dir = TempDir::new().unwrap();
    create_schema_file(&dir);

    let output = pg_erd(
        &dir,
        &[
            "graph",
            "--input",
            "schema.json",
            "--dot-program",
            "true",
            "--image",
            "diagram.svg",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Rendered to: diagram.svg"));
}

#[test]
fn test_graph_missing_renderer_keeps_dot_file() {
    let dir = TempDir::new().unwrap();
    create_schema_file(&dir);

    let output = pg_erd(
        &dir,
        &[
            "graph",
            "--input",
            "schema.json",
            "--dot-program",
            "pg-erd-missing-graphviz",
        ],
    );
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pg-erd-missing-graphviz"));
    assert!(stderr.contains("command not found"));
    assert!(dir.path().join("er_diagram.dot").exists());
}

#[test]
fn test_graph_empty_schema_is_valid() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("empty.json"), "{}").unwrap();

    let output = pg_erd(&dir, &["graph", "--input", "empty.json", "--no-render"]);
    assert!(output.status.success());

    let dot = fs::read_to_string(dir.path().join("er_diagram.dot")).unwrap();
    assert_eq!(dot, "digraph \"ER Diagram\" {\n  rankdir=TB;\n}\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("No tables found."));
}

#[test]
fn test_graph_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let output = pg_erd(&dir, &["graph", "--input", "nope.json", "--no-render"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.json"));
}

#[test]
fn test_graph_config_file_layout() {
    let dir = TempDir::new().unwrap();
    create_schema_file(&dir);
    fs::write(
        dir.path().join("erd.yaml"),
        "diagram:\n  layout: lr\n  strict: false\n",
    )
    .unwrap();

    let output = pg_erd(
        &dir,
        &[
            "graph",
            "--input",
            "schema.json",
            "--config",
            "erd.yaml",
            "--no-render",
        ],
    );
    assert!(output.status.success());

    let dot = fs::read_to_string(dir.path().join("er_diagram.dot")).unwrap();
    assert!(dot.contains("rankdir=LR;"));
}

#[test]
fn test_inspect_without_credentials_fails() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(get_binary_path())
        .current_dir(dir.path())
        .arg("inspect")
        .env_remove("PGUSER")
        .env_remove("PGDATABASE")
        .stdin(std::process::Stdio::null())
        .output()
        .expect("failed to run pg-erd");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("username and dbname are required"));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    let output = pg_erd(&dir, &["completions", "bash"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("pg-erd"));
}

#[test]
fn test_graph_input_duplicate_tables_merge_columns() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("dup.json"),
        r#"{"tables": [
            {"schema": "public", "name": "users", "columns": ["id"]},
            {"schema": "public", "name": "users", "columns": ["email"]}
        ]}"#,
    )
    .unwrap();

    let output = pg_erd(&dir, &["graph", "--input", "dup.json", "--no-render"]);
    assert!(output.status.success());

    let dot = fs::read_to_string(dir.path().join("er_diagram.dot")).unwrap();
    assert!(dot.contains("n0 [label=\"public.users\\nid, email\""));
    assert!(!dot.contains("n1 ["));
}

#[test]
fn test_graph_input_blank_table_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("blank.json"),
        r#"{"tables": [{"schema": "public", "name": "", "columns": ["id"]}]}"#,
    )
    .unwrap();

    let output = pg_erd(&dir, &["graph", "--input", "blank.json", "--no-render"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid schema file"));
    assert!(!dir.path().join("er_diagram.dot").exists());
}
