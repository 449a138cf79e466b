//! SQL tokenization front-end
//!
//! Procedural scripts (multi-statement bodies, vendor control flow) do not
//! round-trip through a full AST parser, so the front-end tokenizes with a
//! configurable dialect and groups tokens into the syntax tree the engine
//! walks.

use sqlparser::dialect::{Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::tokenizer::Tokenizer;
use std::path::{Path, PathBuf};

use sqlgraph_core::{Diagnostic, DiagnosticCode, DialectConfig, Location, Severity};

use crate::syntax::{ScriptBuilder, SyntaxNode};

/// SQL parser with configurable dialect
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
}

impl SqlParser {
    /// Create a new parser with the default (Transact-SQL) dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(MsSqlDialect {}),
        }
    }

    /// Create a parser for Transact-SQL
    pub fn mssql() -> Self {
        Self::new()
    }

    /// Create a parser for PostgreSQL
    pub fn postgres() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    /// Create a parser for MySQL
    pub fn mysql() -> Self {
        Self {
            dialect: Box::new(MySqlDialect {}),
        }
    }

    /// Create a parser for generic ANSI SQL
    pub fn ansi() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a parser from a dialect config
    pub fn from_dialect(dialect: DialectConfig) -> Self {
        match dialect {
            DialectConfig::MsSql => Self::mssql(),
            DialectConfig::Postgres => Self::postgres(),
            DialectConfig::MySql => Self::mysql(),
            DialectConfig::Ansi => Self::ansi(),
        }
    }

    /// Tokenize SQL and build the syntax tree
    ///
    /// Returns `ParsedScript` on success, or `ParseError` when the source
    /// cannot be tokenized (unterminated strings and the like). Statement
    /// grouping itself never fails.
    pub fn parse(&self, sql: &str, file_path: Option<&Path>) -> Result<ParsedScript, ParseError> {
        let tokens = Tokenizer::new(&*self.dialect, sql)
            .tokenize_with_location()
            .map_err(|e| ParseError {
                sql: sql.to_string(),
                message: e.to_string(),
                file_path: file_path.map(|p| p.to_path_buf()),
            })?;

        let root = ScriptBuilder::new(tokens).build();

        Ok(ParsedScript {
            sql: sql.to_string(),
            root,
            file_path: file_path.map(|p| p.to_path_buf()),
        })
    }

    /// Parse SQL from a file
    pub fn parse_file(&self, path: &Path) -> Result<ParsedScript, ParseError> {
        let sql = std::fs::read_to_string(path).map_err(|e| ParseError {
            sql: String::new(),
            message: format!("Failed to read file: {}", e),
            file_path: Some(path.to_path_buf()),
        })?;

        self.parse(&sql, Some(path))
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Successfully parsed script with its syntax tree
#[derive(Debug, Clone)]
pub struct ParsedScript {
    /// Original SQL string
    pub sql: String,

    /// Root of the syntax tree
    pub root: SyntaxNode,

    /// Source file path (if parsed from file)
    pub file_path: Option<PathBuf>,
}

impl ParsedScript {
    /// Count the top-level statements
    pub fn statement_count(&self) -> usize {
        self.root.children.len()
    }
}

/// Tokenization error with diagnostic information
#[derive(Debug)]
pub struct ParseError {
    /// Original SQL string
    pub sql: String,

    /// Tokenizer error message
    pub message: String,

    /// Source file path
    pub file_path: Option<PathBuf>,
}

impl ParseError {
    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::new(
            DiagnosticCode::TokenizeError,
            Severity::Error,
            format!("Failed to tokenize SQL: {}", self.message),
        );

        if let Some(path) = &self.file_path {
            diag = diag.with_location(Location::new(path.display().to_string()));
        }

        diag
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SQL tokenize error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::NodeKind;

    #[test]
    fn parse_simple_select() {
        let parser = SqlParser::new();
        let sql = "SELECT Id, Name FROM Users WHERE Active = 1";

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 1);
        assert_eq!(parsed.root.children[0].kind, NodeKind::Select);
    }

    #[test]
    fn parse_procedure_script() {
        let parser = SqlParser::new();
        let sql = r#"
            CREATE PROCEDURE dbo.usp_Report AS
            BEGIN
                SELECT * FROM dbo.Orders;
            END
        "#;

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 1);
        assert_eq!(
            parsed.root.children[0].kind,
            NodeKind::ProcedureDefinition
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let parser = SqlParser::new();
        let result = parser.parse("SELECT 'broken FROM t", None);

        let error = result.unwrap_err();
        let diag = error.to_diagnostic();
        assert_eq!(diag.code, DiagnosticCode::TokenizeError);
        assert_eq!(diag.severity, Severity::Error);
    }

    #[test]
    fn different_dialects() {
        let sql = "SELECT Id FROM Users";

        assert!(SqlParser::mssql().parse(sql, None).is_ok());
        assert!(SqlParser::postgres().parse(sql, None).is_ok());
        assert!(SqlParser::mysql().parse(sql, None).is_ok());
        assert!(SqlParser::ansi().parse(sql, None).is_ok());
    }

    #[test]
    fn from_dialect_config() {
        let parser = SqlParser::from_dialect(DialectConfig::MsSql);
        let parsed = parser.parse("SELECT * FROM #Staging", None).unwrap();
        assert_eq!(parsed.statement_count(), 1);
    }
}
