//! Report schema (stable v1)
//!
//! Edge serialization is otherwise the caller's choice; this is the stable
//! JSON artifact for callers that want one. Breaking changes require a new
//! version.

use serde::{Deserialize, Serialize};

use crate::diagnostic::{Diagnostic, Severity};
use crate::object::{DependencyEdge, Relationship};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of edges
    pub edges: usize,

    /// Number of call edges
    pub calls: usize,

    /// Number of read edges
    pub reads: usize,

    /// Number of write edges
    pub writes: usize,

    /// Number of create edges
    pub creates: usize,

    /// Number of opaque reference edges
    pub references: usize,

    /// Number of edges whose target schema was inferred under ambiguity
    pub ambiguous: usize,

    /// Number of warning diagnostics
    pub warnings: usize,

    /// Number of error diagnostics
    pub errors: usize,
}

/// Dependency report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Discovered edges, in discovery order
    pub edges: Vec<DependencyEdge>,

    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            edges: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Build a report from extraction output
    pub fn from_edges(edges: Vec<DependencyEdge>, diagnostics: Vec<Diagnostic>) -> Self {
        let summary = ReportSummary {
            edges: edges.len(),
            calls: count_relationship(&edges, Relationship::Calls),
            reads: count_relationship(&edges, Relationship::Reads),
            writes: count_relationship(&edges, Relationship::Writes),
            creates: count_relationship(&edges, Relationship::Creates),
            references: count_relationship(&edges, Relationship::References),
            ambiguous: edges.iter().filter(|e| e.ambiguous).count(),
            warnings: diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Warn)
                .count(),
            errors: diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Error)
                .count(),
        };

        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary,
            edges,
            diagnostics,
        }
    }

    /// Check if the report carries any error diagnostics
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

fn count_relationship(edges: &[DependencyEdge], relationship: Relationship) -> usize {
    edges
        .iter()
        .filter(|e| e.relationship == relationship)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::object::{ObjectKind, SchemaObject};

    fn edge(relationship: Relationship, ambiguous: bool) -> DependencyEdge {
        DependencyEdge {
            source: SchemaObject::new("usp_load", Some("dbo".to_string()), ObjectKind::Procedure),
            target: SchemaObject::new("Orders", Some("sales".to_string()), ObjectKind::Table),
            relationship,
            line: 1,
            snippet: "SELECT * FROM sales.Orders".to_string(),
            ambiguous,
        }
    }

    #[test]
    fn empty_report() {
        let report = Report::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.edges, 0);
        assert!(!report.has_errors());
    }

    #[test]
    fn summary_counts_match_contents() {
        let edges = vec![
            edge(Relationship::Reads, false),
            edge(Relationship::Reads, true),
            edge(Relationship::Writes, false),
            edge(Relationship::Calls, false),
        ];
        let diagnostics = vec![Diagnostic::new(
            DiagnosticCode::AmbiguousSchema,
            Severity::Warn,
            "ambiguous",
        )];

        let report = Report::from_edges(edges, diagnostics);
        assert_eq!(report.summary.edges, 4);
        assert_eq!(report.summary.reads, 2);
        assert_eq!(report.summary.writes, 1);
        assert_eq!(report.summary.calls, 1);
        assert_eq!(report.summary.creates, 0);
        assert_eq!(report.summary.ambiguous, 1);
        assert_eq!(report.summary.warnings, 1);
        assert!(!report.has_errors());
    }

    #[test]
    fn report_serialization() {
        let report = Report::from_edges(vec![edge(Relationship::Reads, false)], Vec::new());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"edges\""));
        assert!(json.contains("sales"));
    }
}
