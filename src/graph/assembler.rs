//! Graph assembly: tables become nodes, foreign keys become directed edges.

use crate::schema::{ForeignKey, Schema, Table};
use ahash::AHashMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Rendering attributes applied uniformly to every table node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    pub shape: &'static str,
    pub style: &'static str,
    pub color: &'static str,
    pub fill_color: &'static str,
    pub font_name: &'static str,
    pub font_size: &'static str,
    pub pen_width: &'static str,
}

impl NodeStyle {
    /// Grey filled boxes with a black border
    pub const DEFAULT: NodeStyle = NodeStyle {
        shape: "box",
        style: "filled",
        color: "black",
        fill_color: "#D3D3D3",
        font_name: "Arial",
        font_size: "12",
        pen_width: "1.0",
    };

    /// Graphviz attribute pairs, in output order
    pub fn attributes(&self) -> [(&'static str, &'static str); 7] {
        [
            ("shape", self.shape),
            ("style", self.style),
            ("color", self.color),
            ("fillcolor", self.fill_color),
            ("fontname", self.font_name),
            ("fontsize", self.font_size),
            ("penwidth", self.pen_width),
        ]
    }
}

/// A table as a graph node
#[derive(Debug, Clone)]
pub struct TableNode {
    pub schema: String,
    pub name: String,
    /// `schema.name`, a newline, then the comma-joined columns
    pub label: String,
    pub style: NodeStyle,
}

impl TableNode {
    fn from_table(table: &Table) -> Self {
        Self {
            schema: table.schema.clone(),
            name: table.name.clone(),
            label: format!(
                "{}.{}\n{}",
                table.schema,
                table.name,
                table.columns.join(", ")
            ),
            style: NodeStyle::DEFAULT,
        }
    }
}

/// Edge payload: the column pair behind one foreign key row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub column: String,
    pub foreign_column: String,
}

/// Which end of a foreign key had no table node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEndpoint {
    Source,
    Target,
    Both,
}

impl fmt::Display for MissingEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEndpoint::Source => write!(f, "source table not found"),
            MissingEndpoint::Target => write!(f, "target table not found"),
            MissingEndpoint::Both => write!(f, "source and target tables not found"),
        }
    }
}

/// A foreign key that could not become an edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedEdge {
    pub foreign_key: ForeignKey,
    pub missing: MissingEndpoint,
}

impl fmt::Display for UnresolvedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.foreign_key, self.missing)
    }
}

/// Strict-mode failure: the first foreign key that did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved foreign key {0}")]
pub struct ResolutionError(pub UnresolvedEdge);

/// What to do with a foreign key whose endpoint table is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Drop the edge and record it in the warnings list
    #[default]
    Skip,
    /// Fail the whole build
    Strict,
}

impl FromStr for ResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" | "warn" => Ok(ResolutionPolicy::Skip),
            "strict" | "fail" => Ok(ResolutionPolicy::Strict),
            _ => Err(format!(
                "Unknown resolution policy: {}. Valid options: skip, strict",
                s
            )),
        }
    }
}

/// Directed ER graph with composite-key lookup
#[derive(Debug, Clone, Default)]
pub struct ErGraph {
    graph: DiGraph<TableNode, Relationship>,
    index: AHashMap<(String, String), NodeIndex>,
    warnings: Vec<UnresolvedEdge>,
}

impl ErGraph {
    /// Node for a table, by schema and name
    pub fn node(&self, schema: &str, name: &str) -> Option<NodeIndex> {
        self.index
            .get(&(schema.to_string(), name.to_string()))
            .copied()
    }

    /// Table payload of a node
    pub fn table(&self, node: NodeIndex) -> Option<&TableNode> {
        self.graph.node_weight(node)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &TableNode)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// All edges in insertion order as `(source, target, relationship)`
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &Relationship)> {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight()))
    }

    /// Foreign keys skipped under `ResolutionPolicy::Skip`
    pub fn warnings(&self) -> &[UnresolvedEdge] {
        &self.warnings
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn add_table(&mut self, table: &Table) -> NodeIndex {
        let key = (table.schema.clone(), table.name.clone());
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }
        let idx = self.graph.add_node(TableNode::from_table(table));
        self.index.insert(key, idx);
        idx
    }

    fn add_foreign_key(&mut self, fk: &ForeignKey) -> Result<(), UnresolvedEdge> {
        let from = self.node(&fk.schema, &fk.table_name);
        let to = self.node(&fk.foreign_schema, &fk.foreign_table_name);

        let missing = match (from, to) {
            (Some(from), Some(to)) => {
                self.graph.add_edge(
                    from,
                    to,
                    Relationship {
                        column: fk.column_name.clone(),
                        foreign_column: fk.foreign_column_name.clone(),
                    },
                );
                return Ok(());
            }
            (None, Some(_)) => MissingEndpoint::Source,
            (Some(_), None) => MissingEndpoint::Target,
            (None, None) => MissingEndpoint::Both,
        };

        Err(UnresolvedEdge {
            foreign_key: fk.clone(),
            missing,
        })
    }
}

/// Builds an `ErGraph` from a `Schema` under a resolution policy
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphAssembler {
    policy: ResolutionPolicy,
}

impl GraphAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn assemble(&self, schema: &Schema) -> Result<ErGraph, ResolutionError> {
        let mut graph = ErGraph::default();

        for table in &schema.tables {
            graph.add_table(table);
        }

        for fk in &schema.foreign_keys {
            if let Err(unresolved) = graph.add_foreign_key(fk) {
                match self.policy {
                    ResolutionPolicy::Strict => return Err(ResolutionError(unresolved)),
                    ResolutionPolicy::Skip => {
                        warn!(
                            foreign_key = %unresolved.foreign_key,
                            "skipping edge: {}",
                            unresolved.missing
                        );
                        graph.warnings.push(unresolved);
                    }
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped = graph.warnings.len(),
            "assembled ER graph"
        );
        Ok(graph)
    }
}
