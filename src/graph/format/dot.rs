//! Graphviz DOT format output for ERD diagrams.

use crate::graph::assembler::ErGraph;
use crate::graph::format::Layout;
use petgraph::graph::NodeIndex;

/// Graph name written into the `digraph` header
pub const GRAPH_NAME: &str = "ER Diagram";

/// Generate DOT output: one box per table, one arrow per foreign key
pub fn to_dot(graph: &ErGraph, layout: Layout) -> String {
    let mut output = String::new();

    // Header
    output.push_str(&format!("digraph {} {{\n", quote(GRAPH_NAME)));

    let rankdir = match layout {
        Layout::LR => "LR",
        Layout::TB => "TB",
    };
    output.push_str(&format!("  rankdir={};\n", rankdir));

    if !graph.is_empty() {
        output.push('\n');
    }

    // Node ids come from graph identity, never from the label
    for (idx, table) in graph.nodes() {
        let mut attrs = vec![format!("label={}", quote(&table.label))];
        for (key, value) in table.style.attributes() {
            attrs.push(format!("{}={}", key, quote(value)));
        }
        output.push_str(&format!("  {} [{}];\n", node_id(idx), attrs.join(", ")));
    }

    if graph.edge_count() > 0 {
        output.push('\n');
    }

    for (from, to, rel) in graph.edges() {
        let label = format!("{} -> {}", rel.column, rel.foreign_column);
        output.push_str(&format!(
            "  {} -> {} [label={}];\n",
            node_id(from),
            node_id(to),
            quote(&label)
        ));
    }

    output.push_str("}\n");
    output
}

fn node_id(idx: NodeIndex) -> String {
    format!("n{}", idx.index())
}

/// Quote a string as a DOT string literal
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::assembler::GraphAssembler;
    use crate::schema::{ForeignKey, Schema, Table};

    fn create_test_graph() -> ErGraph {
        let schema = Schema {
            tables: vec![
                Table {
                    schema: "public".to_string(),
                    name: "users".to_string(),
                    columns: vec!["id".to_string(), "name".to_string()],
                },
                Table {
                    schema: "public".to_string(),
                    name: "orders".to_string(),
                    columns: vec!["id".to_string(), "user_id".to_string()],
                },
            ],
            foreign_keys: vec![ForeignKey {
                schema: "public".to_string(),
                table_name: "orders".to_string(),
                column_name: "user_id".to_string(),
                foreign_schema: "public".to_string(),
                foreign_table_name: "users".to_string(),
                foreign_column_name: "id".to_string(),
            }],
        };
        GraphAssembler::new().assemble(&schema).unwrap()
    }

    #[test]
    fn test_dot_contains_nodes_with_style() {
        let output = to_dot(&create_test_graph(), Layout::TB);

        assert!(output.starts_with("digraph \"ER Diagram\" {\n"));
        assert!(output.contains("rankdir=TB;"));
        assert!(output.contains(
            "  n0 [label=\"public.users\\nid, name\", shape=\"box\", style=\"filled\", \
             color=\"black\", fillcolor=\"#D3D3D3\", fontname=\"Arial\", fontsize=\"12\", \
             penwidth=\"1.0\"];"
        ));
        assert!(output.contains("n1 [label=\"public.orders\\nid, user_id\""));
        assert!(output.ends_with("}\n"));
    }

    #[test]
    fn test_dot_contains_edges() {
        let output = to_dot(&create_test_graph(), Layout::LR);

        assert!(output.contains("rankdir=LR;"));
        assert!(output.contains("  n1 -> n0 [label=\"user_id -> id\"];"));
        assert_eq!(output.matches("->").count(), 2); // edge operator + label text
    }

    #[test]
    fn test_dot_empty_graph() {
        let output = to_dot(&ErGraph::default(), Layout::TB);
        assert_eq!(output, "digraph \"ER Diagram\" {\n  rankdir=TB;\n}\n");
    }

    #[test]
    fn test_quote_escapes_specials() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("line\nbreak"), "\"line\\nbreak\"");
        assert_eq!(quote("crlf\r\nend"), "\"crlf\\r\\nend\"");
    }
}
