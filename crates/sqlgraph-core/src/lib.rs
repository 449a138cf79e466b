//! sqlgraph Core
//!
//! Core domain model with stable, versioned types.
//! Never rename diagnostic codes - they are part of the public API.

pub mod config;
pub mod diagnostic;
pub mod object;
pub mod report;

pub use config::{AmbiguityStrategy, Config, ConfigError, DialectConfig};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use object::{
    DependencyEdge, ObjectKind, Relationship, SchemaObject, TEMP_OBJECT_MARKER, UNKNOWN_SCHEMA,
};
pub use report::{Report, ReportSummary, ReportVersion};
