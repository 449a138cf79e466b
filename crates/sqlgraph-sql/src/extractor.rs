//! Tree walker and statement classifier
//!
//! Walks the syntax tree depth-first in document order, recognizes
//! definition boundaries and statement kinds, and drives the resolver and
//! collector. The walker never fails: malformed node shapes degrade to "no
//! dependency recorded" and traversal continues, so a run always returns
//! whatever edges were discovered.

use std::collections::HashSet;

use sqlgraph_core::{
    Config, ConfigError, DependencyEdge, Diagnostic, DiagnosticCode, Location, ObjectKind,
    Relationship, SchemaObject, Severity, TEMP_OBJECT_MARKER,
};

use crate::collector::DependencyCollector;
use crate::parser::{ParseError, SqlParser};
use crate::resolver::SchemaResolver;
use crate::syntax::{NodeKind, SyntaxNode};

/// Location label used for in-memory sources
const INPUT_LABEL: &str = "<input>";

/// Words that are never table references, even when they slip into term position
const KEYWORD_STOPLIST: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "AS", "ON", "INTO", "JOIN", "INNER", "OUTER", "LEFT",
    "RIGHT", "FULL", "CROSS", "APPLY", "GROUP", "BY", "ORDER", "HAVING", "UNION", "EXCEPT",
    "INTERSECT", "ALL", "DISTINCT", "TOP", "SET", "VALUES", "NULL", "NOT", "IN", "IS", "EXISTS",
    "BETWEEN", "LIKE", "CASE", "WHEN", "THEN", "ELSE", "END", "ASC", "DESC", "WITH", "NOLOCK",
    "LIMIT", "OFFSET", "INSERT", "UPDATE", "DELETE", "OUTPUT", "DEFAULT", "MATCHED", "USING",
];

/// Result of one extraction run: the ordered edges plus ambient diagnostics
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Discovered edges, in discovery order
    pub edges: Vec<DependencyEdge>,

    /// Warnings and informational notes gathered during the walk
    pub diagnostics: Vec<Diagnostic>,
}

/// Extracts dependency edges from procedural SQL
///
/// Construction validates the config; a single extractor may serve any
/// number of sequential runs, and the borrowed config may back concurrent
/// extractors over different inputs.
pub struct DependencyExtractor<'a> {
    config: &'a Config,
    resolver: SchemaResolver<'a>,
}

impl<'a> DependencyExtractor<'a> {
    /// Create an extractor over an immutable config
    pub fn new(config: &'a Config) -> Result<Self, ConfigError> {
        let resolver = SchemaResolver::new(config)?;
        Ok(Self { config, resolver })
    }

    /// Tokenize, build the syntax tree, and extract edges from `sql`
    pub fn extract_script(&self, sql: &str) -> Result<Extraction, ParseError> {
        let parser = SqlParser::from_dialect(self.config.dialect);
        let script = parser.parse(sql, None)?;
        Ok(self.extract_tree(&script.root))
    }

    /// Extract edges from an already-built syntax tree
    pub fn extract_tree(&self, root: &SyntaxNode) -> Extraction {
        let mut walker = Walker {
            collector: DependencyCollector::new(&self.resolver),
            resolver: &self.resolver,
            diagnostics: Vec::new(),
        };

        walker.visit(root);

        Extraction {
            edges: walker.collector.into_edges(),
            diagnostics: walker.diagnostics,
        }
    }
}

struct Walker<'r> {
    collector: DependencyCollector<'r>,
    resolver: &'r SchemaResolver<'r>,
    diagnostics: Vec<Diagnostic>,
}

impl<'r> Walker<'r> {
    fn visit(&mut self, node: &SyntaxNode) {
        match node.kind {
            NodeKind::ProcedureDefinition => self.visit_definition(node, ObjectKind::Procedure),
            NodeKind::FunctionDefinition => self.visit_definition(node, ObjectKind::Function),
            NodeKind::Call => self.visit_call(node),
            NodeKind::DynamicSql => self.visit_dynamic(node),
            NodeKind::Select => self.visit_dml(node, Relationship::Reads),
            NodeKind::Insert | NodeKind::Update | NodeKind::Delete => {
                self.visit_dml(node, Relationship::Writes)
            }
            NodeKind::CreateTable => self.visit_create_table(node),
            // every other kind recurses without side effect
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: &SyntaxNode) {
        for child in &node.children {
            self.visit(child);
        }
    }

    fn visit_definition(&mut self, node: &SyntaxNode, kind: ObjectKind) {
        let name_text = match node.object_reference() {
            Some(name_node) => name_node.text.clone(),
            None => {
                // defective header: walk the body anyway; edges attribute to
                // the outer definition if one is active
                tracing::debug!(line = node.line, "definition without a name");
                self.visit_children(node);
                return;
            }
        };

        let (schema, name) = extract_object_name(&name_text);
        if name.is_empty() {
            self.visit_children(node);
            return;
        }

        // definitions are not edges, so the ambiguity flag is dropped here
        let resolution = self.resolver.resolve(&name, schema.as_deref());
        let object = SchemaObject::new(name, Some(resolution.schema), kind);

        self.collector.enter_definition(object);
        self.visit_children(node);
        self.collector.exit_definition();
    }

    fn visit_call(&mut self, node: &SyntaxNode) {
        if !self.ensure_definition(node) {
            return;
        }

        let Some(callee) = node.object_reference() else {
            return;
        };

        let (schema, name) = extract_object_name(&callee.text);
        if name.is_empty() {
            return;
        }

        self.record(
            &name,
            schema,
            Relationship::Calls,
            ObjectKind::Procedure,
            callee.line,
            &node.text,
        );
    }

    fn visit_dynamic(&mut self, node: &SyntaxNode) {
        if !self.ensure_definition(node) {
            return;
        }

        self.collector.record_dynamic(node.line, &node.text);
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::DynamicSqlSkipped,
                Severity::Info,
                "dynamic SQL executed; its contents were not analyzed",
            )
            .with_location(Location::with_line(INPUT_LABEL, node.line)),
        );
    }

    fn visit_dml(&mut self, node: &SyntaxNode, relationship: Relationship) {
        if !self.ensure_definition(node) {
            return;
        }

        for reference in find_references(node) {
            let (schema, name) = extract_object_name(&reference.text);
            if name.is_empty() {
                continue;
            }

            self.record(
                &name,
                schema,
                relationship,
                ObjectKind::Table,
                reference.line,
                &node.text,
            );
        }
    }

    fn visit_create_table(&mut self, node: &SyntaxNode) {
        if !self.ensure_definition(node) {
            return;
        }

        let Some(target) = node.object_reference() else {
            return;
        };

        let (schema, name) = extract_object_name(&target.text);
        if name.is_empty() {
            return;
        }

        if name.starts_with(TEMP_OBJECT_MARKER) {
            self.collector.register_temp_object(&name);
        }

        self.record(
            &name,
            schema,
            Relationship::Creates,
            ObjectKind::Table,
            target.line,
            &node.text,
        );
    }

    /// Record an edge, surfacing ambiguity as a warning diagnostic
    fn record(
        &mut self,
        name: &str,
        schema: Option<String>,
        relationship: Relationship,
        kind: ObjectKind,
        line: u64,
        snippet: &str,
    ) {
        let outcome = self
            .collector
            .record(name, schema.as_deref(), relationship, kind, line, snippet)
            .map(|edge| (edge.ambiguous, edge.target.full_name()));

        if let Some((true, attributed)) = outcome {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::AmbiguousSchema,
                    Severity::Warn,
                    format!(
                        "schema for '{}' is uncertain; attributed to '{}'",
                        name, attributed
                    ),
                )
                .with_location(Location::with_line(INPUT_LABEL, line)),
            );
        }
    }

    /// True when a definition is active; otherwise notes the dropped statement
    fn ensure_definition(&mut self, node: &SyntaxNode) -> bool {
        if self.collector.current_definition().is_some() {
            return true;
        }

        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::UnattributedStatement,
                Severity::Info,
                "statement outside any procedure or function definition; dropped",
            )
            .with_location(Location::with_line(INPUT_LABEL, node.line)),
        );

        false
    }
}

/// Table-like references within a statement subtree, in document order
///
/// Prefers names the builder tagged in table position; only a subtree with
/// no tagged reference at all falls back to the textual heuristic over free
/// terms. References are deduplicated by text within one statement.
fn find_references(node: &SyntaxNode) -> Vec<&SyntaxNode> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    collect_typed(node, &mut seen, &mut refs);
    if refs.is_empty() {
        collect_heuristic(node, &mut seen, &mut refs);
    }

    refs
}

fn collect_typed<'n>(
    node: &'n SyntaxNode,
    seen: &mut HashSet<&'n str>,
    out: &mut Vec<&'n SyntaxNode>,
) {
    for child in &node.children {
        if child.kind == NodeKind::ObjectReference && seen.insert(child.text.as_str()) {
            out.push(child);
        }
        collect_typed(child, seen, out);
    }
}

fn collect_heuristic<'n>(
    node: &'n SyntaxNode,
    seen: &mut HashSet<&'n str>,
    out: &mut Vec<&'n SyntaxNode>,
) {
    for child in &node.children {
        if child.kind == NodeKind::Term
            && looks_like_table_reference(&child.text)
            && seen.insert(child.text.as_str())
        {
            out.push(child);
        }
        collect_heuristic(child, seen, out);
    }
}

/// Textual fallback classifier for table-like references
///
/// Conservative, not grammar-precise: text with parentheses (function calls,
/// opaque subqueries), parameter references, stoplisted keywords, and short
/// all-uppercase tokens are excluded. False positives and negatives are an
/// accepted tradeoff; prefer the builder's tagged references where present.
pub fn looks_like_table_reference(text: &str) -> bool {
    if text.is_empty() || text.contains('(') || text.starts_with('@') {
        return false;
    }

    let upper = text.to_ascii_uppercase();
    if KEYWORD_STOPLIST.contains(&upper.as_str()) {
        return false;
    }

    if text.len() < 3 && text.chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }

    true
}

/// Split a name's literal text into (schema, name)
///
/// Exactly one `.` separates schema from name; zero or more than one `.`
/// yields an unqualified bare name. Enclosing quote characters are stripped
/// from each part, so quoted identifiers without a dot pass through intact.
pub fn extract_object_name(text: &str) -> (Option<String>, String) {
    let parts: Vec<&str> = text.split('.').collect();

    if parts.len() == 2 {
        let schema = strip_quotes(parts[0]);
        let name = strip_quotes(parts[1]);
        if !schema.is_empty() && !name.is_empty() {
            return (Some(schema), name);
        }
    }

    (None, strip_quotes(text))
}

fn strip_quotes(text: &str) -> String {
    text.trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '"' | '\'' | '`'))
        .to_string()
}
