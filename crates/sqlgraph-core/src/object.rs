//! Object identity and dependency edge types

use serde::{Deserialize, Serialize};

/// Marker character prefixing temporary object names (e.g. `#staging`)
pub const TEMP_OBJECT_MARKER: char = '#';

/// Schema used in `unique_key` when an object's schema is unresolved
pub const UNKNOWN_SCHEMA: &str = "unknown";

/// Kind of database object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Stored procedure
    Procedure,

    /// User-defined function
    Function,

    /// Base table
    Table,

    /// View
    View,

    /// Temporary table, scoped to the definition that created it
    TemporaryTable,
}

impl ObjectKind {
    /// Stable lowercase identifier, used in `unique_key`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Procedure => "procedure",
            Self::Function => "function",
            Self::Table => "table",
            Self::View => "view",
            Self::TemporaryTable => "temporarytable",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of relationship an edge represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// Direct invocation of a procedure or function
    Calls,

    /// Statement reads from the target
    Reads,

    /// Statement writes to the target
    Writes,

    /// Statement creates the target
    Creates,

    /// Opaque reference (e.g. dynamic SQL execution)
    References,
}

impl Relationship {
    /// Stable lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Reads => "reads",
            Self::Writes => "writes",
            Self::Creates => "creates",
            Self::References => "references",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a schema-qualified database object
///
/// Two objects with equal `unique_key()` are the same graph node regardless
/// of how or when they were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaObject {
    /// Bare identifier, case as written in source
    pub name: String,

    /// Owning schema; `None` means unresolved at construction time
    pub schema: Option<String>,

    /// Object kind
    pub kind: ObjectKind,
}

impl SchemaObject {
    /// Create a new object identity
    pub fn new(name: impl Into<String>, schema: Option<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            schema,
            kind,
        }
    }

    /// Create a temporary-table identity scoped to its creating definition
    ///
    /// Temporary objects are never globally addressable; their schema is
    /// synthesized from the enclosing definition's name.
    pub fn temporary(name: impl Into<String>, enclosing_definition: &str) -> Self {
        Self {
            name: name.into(),
            schema: Some(format!("temp_{}", enclosing_definition)),
            kind: ObjectKind::TemporaryTable,
        }
    }

    /// `schema.name` if the schema is known, else the bare name
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Graph node identity: `schema.name.kind` with `unknown` for a missing schema
    pub fn unique_key(&self) -> String {
        format!(
            "{}.{}.{}",
            self.schema.as_deref().unwrap_or(UNKNOWN_SCHEMA),
            self.name,
            self.kind.as_str()
        )
    }
}

impl std::fmt::Display for SchemaObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.full_name(), self.kind)
    }
}

/// One discovered relationship between two database objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The enclosing definition the relationship was discovered in
    pub source: SchemaObject,

    /// The referenced object
    pub target: SchemaObject,

    /// What the statement does with the target
    pub relationship: Relationship,

    /// 1-based line number in the source text
    pub line: u64,

    /// Excerpt of the triggering construct, at most 100 characters
    pub snippet: String,

    /// True if the target's schema was inferred and more than one candidate existed
    pub ambiguous: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_with_and_without_schema() {
        let qualified = SchemaObject::new("Orders", Some("sales".to_string()), ObjectKind::Table);
        assert_eq!(qualified.full_name(), "sales.Orders");

        let bare = SchemaObject::new("Orders", None, ObjectKind::Table);
        assert_eq!(bare.full_name(), "Orders");
    }

    #[test]
    fn unique_key_ignores_construction_order() {
        let a = SchemaObject::new("usp_load", Some("dbo".to_string()), ObjectKind::Procedure);
        let b = SchemaObject::new("usp_load".to_string(), Some("dbo".to_string()), ObjectKind::Procedure);
        assert_eq!(a.unique_key(), b.unique_key());
        assert_eq!(a.unique_key(), "dbo.usp_load.procedure");
    }

    #[test]
    fn unique_key_without_schema_uses_unknown() {
        let obj = SchemaObject::new("Customer", None, ObjectKind::Table);
        assert_eq!(obj.unique_key(), "unknown.Customer.table");
    }

    #[test]
    fn temporary_objects_are_scoped_to_their_definition() {
        let tmp = SchemaObject::temporary("#Temp", "usp_load");
        assert_eq!(tmp.kind, ObjectKind::TemporaryTable);
        assert_eq!(tmp.schema.as_deref(), Some("temp_usp_load"));
        assert_eq!(tmp.full_name(), "temp_usp_load.#Temp");
    }

    #[test]
    fn kind_serialization_is_lowercase() {
        let json = serde_json::to_string(&ObjectKind::TemporaryTable).unwrap();
        assert_eq!(json, "\"temporarytable\"");
        let json = serde_json::to_string(&Relationship::Calls).unwrap();
        assert_eq!(json, "\"calls\"");
    }
}
