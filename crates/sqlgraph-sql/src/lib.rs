//! SQL parsing and dependency extraction
//!
//! This crate handles:
//! - Tokenizing procedural SQL with a configurable dialect
//! - Grouping tokens into a typed syntax tree
//! - Resolving bare object names against a schema knowledge base
//! - Walking the tree and collecting dependency edges

pub mod collector;
pub mod extractor;
pub mod parser;
pub mod resolver;
pub mod syntax;

pub use collector::{DependencyCollector, DYNAMIC_SQL_TARGET};
pub use extractor::{
    extract_object_name, looks_like_table_reference, DependencyExtractor, Extraction,
};
pub use parser::{ParseError, ParsedScript, SqlParser};
pub use resolver::{Resolution, SchemaResolver};
pub use syntax::{NodeKind, ScriptBuilder, SyntaxNode};
