//! Edge accumulation and enclosing-definition context
//!
//! The collector owns the definition stack and the ordered edge list for one
//! extraction run. References discovered outside any definition have no
//! source to attribute them to and are dropped by policy, without error.

use std::collections::HashSet;

use sqlgraph_core::{
    DependencyEdge, ObjectKind, Relationship, SchemaObject, TEMP_OBJECT_MARKER,
};

use crate::resolver::SchemaResolver;

/// Target name recorded for dynamic SQL execution
pub const DYNAMIC_SQL_TARGET: &str = "(dynamic sql)";

const SNIPPET_MAX_CHARS: usize = 100;

/// One enclosing definition plus its temp-object bookkeeping
#[derive(Debug)]
struct DefinitionFrame {
    object: SchemaObject,
    temp_objects: HashSet<String>,
}

/// Accumulates dependency edges during a traversal
pub struct DependencyCollector<'a> {
    resolver: &'a SchemaResolver<'a>,
    frames: Vec<DefinitionFrame>,
    edges: Vec<DependencyEdge>,
}

impl<'a> DependencyCollector<'a> {
    /// Create an empty collector for one run
    pub fn new(resolver: &'a SchemaResolver<'a>) -> Self {
        Self {
            resolver,
            frames: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Enter a procedure or function definition
    pub fn enter_definition(&mut self, object: SchemaObject) {
        tracing::debug!(definition = %object.full_name(), "entering definition");
        self.frames.push(DefinitionFrame {
            object,
            temp_objects: HashSet::new(),
        });
    }

    /// Leave the innermost definition
    pub fn exit_definition(&mut self) -> Option<SchemaObject> {
        self.frames.pop().map(|f| f.object)
    }

    /// The innermost active definition, if any
    pub fn current_definition(&self) -> Option<&SchemaObject> {
        self.frames.last().map(|f| &f.object)
    }

    /// Record a reference to `name` from the current definition
    ///
    /// No-op when no definition is active. Temp-marked names bypass schema
    /// resolution entirely: their schema is synthesized from the enclosing
    /// definition and they are never ambiguous.
    pub fn record(
        &mut self,
        name: &str,
        explicit_schema: Option<&str>,
        relationship: Relationship,
        kind: ObjectKind,
        line: u64,
        snippet: &str,
    ) -> Option<&DependencyEdge> {
        let source = match self.frames.last() {
            Some(frame) => frame.object.clone(),
            None => {
                tracing::debug!(name, line, "reference outside any definition dropped");
                return None;
            }
        };

        let (target, ambiguous) = if name.starts_with(TEMP_OBJECT_MARKER) {
            (SchemaObject::temporary(name, &source.name), false)
        } else {
            let resolution = self.resolver.resolve(name, explicit_schema);
            (
                SchemaObject::new(name, Some(resolution.schema), kind),
                resolution.ambiguous,
            )
        };

        self.edges.push(DependencyEdge {
            source,
            target,
            relationship,
            line,
            snippet: truncate_snippet(snippet),
            ambiguous,
        });

        self.edges.last()
    }

    /// Record a dynamic SQL execution from the current definition
    ///
    /// The executed string is opaque, so the edge points at a sentinel
    /// unresolved target.
    pub fn record_dynamic(&mut self, line: u64, snippet: &str) -> Option<&DependencyEdge> {
        let source = match self.frames.last() {
            Some(frame) => frame.object.clone(),
            None => {
                tracing::debug!(line, "dynamic SQL outside any definition dropped");
                return None;
            }
        };

        self.edges.push(DependencyEdge {
            source,
            target: SchemaObject::new(DYNAMIC_SQL_TARGET, None, ObjectKind::Procedure),
            relationship: Relationship::References,
            line,
            snippet: truncate_snippet(snippet),
            ambiguous: true,
        });

        self.edges.last()
    }

    /// Note a temp object created by the current definition
    pub fn register_temp_object(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.temp_objects.insert(name.to_string());
        }
    }

    /// Temp objects created so far by the current definition
    pub fn temp_objects(&self) -> Option<&HashSet<String>> {
        self.frames.last().map(|f| &f.temp_objects)
    }

    /// Edges recorded so far, in discovery order
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Consume the collector, keeping discovery order
    pub fn into_edges(self) -> Vec<DependencyEdge> {
        self.edges
    }
}

fn truncate_snippet(snippet: &str) -> String {
    if snippet.chars().count() <= SNIPPET_MAX_CHARS {
        snippet.to_string()
    } else {
        snippet.chars().take(SNIPPET_MAX_CHARS).collect()
    }
}
