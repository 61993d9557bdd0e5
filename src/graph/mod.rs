//! ERD (Entity-Relationship Diagram) graph module.
//!
//! This module provides:
//! - `ErGraph`, a directed graph of tables (nodes) and foreign keys (edges)
//! - `GraphAssembler`, which resolves foreign keys to node pairs
//! - Output formats: DOT (Graphviz) and JSON

pub mod assembler;
pub mod format;

pub use assembler::{
    ErGraph, GraphAssembler, MissingEndpoint, NodeStyle, Relationship, ResolutionError,
    ResolutionPolicy, TableNode, UnresolvedEdge,
};
pub use format::{to_dot, to_json, to_json_value, Layout, OutputFormat};
