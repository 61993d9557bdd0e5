//! Entity-relationship diagrams from a live PostgreSQL catalog.
//!
//! The pipeline reads `information_schema` through a [`catalog::Catalog`],
//! folds the rows into a [`schema::Schema`], assembles a directed
//! [`graph::ErGraph`] and writes it out as DOT or JSON. [`extract`] wires the
//! steps together behind one call per request.

pub mod catalog;
pub mod config;
pub mod extract;
pub mod graph;
pub mod render;
pub mod schema;
pub mod server;

pub use extract::{
    assemble, extract_graph, extract_schema, read_schema, Credentials, ExtractError,
    ExtractOptions,
};
pub use graph::{ErGraph, GraphAssembler, ResolutionPolicy};
pub use schema::{ForeignKey, Schema, SchemaBuilder, Table};
