//! JSON format output for ERD data.

use crate::graph::assembler::ErGraph;
use crate::schema::{ForeignKey, Schema, Table};
use serde::Serialize;

/// JSON representation of the ERD.
///
/// `tables` and `foreignKeys` have the same shape as a serialized `Schema`, so
/// the document can be read back with `--input`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErdJson<'a> {
    pub tables: &'a [Table],
    pub foreign_keys: &'a [ForeignKey],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<UnresolvedJson<'a>>,
    pub stats: ErdStats,
}

/// A foreign key that produced no edge
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedJson<'a> {
    pub foreign_key: &'a ForeignKey,
    pub reason: String,
}

/// ERD statistics
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErdStats {
    pub table_count: usize,
    pub column_count: usize,
    pub relationship_count: usize,
}

/// Generate JSON output from the extracted schema and its graph
pub fn to_json(schema: &Schema, graph: &ErGraph) -> String {
    serde_json::to_string_pretty(&build_erd_json(schema, graph))
        .unwrap_or_else(|_| "{}".to_string())
}

/// Same document as a `serde_json::Value`
pub fn to_json_value(schema: &Schema, graph: &ErGraph) -> serde_json::Value {
    serde_json::to_value(build_erd_json(schema, graph)).unwrap_or_default()
}

fn build_erd_json<'a>(schema: &'a Schema, graph: &'a ErGraph) -> ErdJson<'a> {
    let unresolved = graph
        .warnings()
        .iter()
        .map(|w| UnresolvedJson {
            foreign_key: &w.foreign_key,
            reason: w.missing.to_string(),
        })
        .collect();

    ErdJson {
        tables: &schema.tables,
        foreign_keys: &schema.foreign_keys,
        unresolved,
        stats: ErdStats {
            table_count: graph.node_count(),
            column_count: schema.column_count(),
            relationship_count: graph.edge_count(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::assembler::GraphAssembler;

    fn create_test_schema() -> Schema {
        serde_json::from_str(
            r#"{
                "tables": [
                    {"schema": "public", "name": "users", "columns": ["id", "name"]},
                    {"schema": "public", "name": "orders", "columns": ["id", "user_id"]}
                ],
                "foreignKeys": [
                    {"schema": "public", "tableName": "orders", "columnName": "user_id",
                     "foreignSchema": "public", "foreignTableName": "users", "foreignColumnName": "id"},
                    {"schema": "public", "tableName": "orders", "columnName": "region",
                     "foreignSchema": "geo", "foreignTableName": "regions", "foreignColumnName": "code"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_json_contains_schema_and_stats() {
        let schema = create_test_schema();
        let graph = GraphAssembler::new().assemble(&schema).unwrap();
        let value = to_json_value(&schema, &graph);

        assert_eq!(value["tables"].as_array().unwrap().len(), 2);
        assert_eq!(value["foreignKeys"].as_array().unwrap().len(), 2);
        assert_eq!(value["stats"]["tableCount"], 2);
        assert_eq!(value["stats"]["columnCount"], 4);
        assert_eq!(value["stats"]["relationshipCount"], 1);
        assert_eq!(value["unresolved"][0]["reason"], "target table not found");
        assert_eq!(value["unresolved"][0]["foreignKey"]["foreignSchema"], "geo");
    }

    #[test]
    fn test_json_reads_back_as_schema() {
        let schema = create_test_schema();
        let graph = GraphAssembler::new().assemble(&schema).unwrap();
        let output = to_json(&schema, &graph);

        let parsed: Schema = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_json_omits_empty_unresolved() {
        let schema = Schema::new();
        let graph = GraphAssembler::new().assemble(&schema).unwrap();
        let value = to_json_value(&schema, &graph);

        assert!(value.get("unresolved").is_none());
        assert_eq!(value["stats"]["tableCount"], 0);
    }
}
