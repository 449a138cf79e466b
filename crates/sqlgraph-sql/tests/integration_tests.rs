//! End-to-end extraction tests over full scripts

use anyhow::Result;
use pretty_assertions::assert_eq;

use sqlgraph_core::{Config, DiagnosticCode, ObjectKind, Relationship, Report};
use sqlgraph_sql::{DependencyExtractor, DYNAMIC_SQL_TARGET};

fn config() -> Config {
    Config::with_schemas(vec![
        "dbo".to_string(),
        "sales".to_string(),
        "hr".to_string(),
    ])
    .with_object("Orders", vec!["sales".to_string()])
    .with_object("Customer", vec!["sales".to_string(), "hr".to_string()])
}

#[test]
fn qualified_select_yields_one_read_edge() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE PROCEDURE sales.usp_X AS\nBEGIN\n    SELECT * FROM sales.Orders;\nEND",
    )?;

    assert_eq!(extraction.edges.len(), 1);
    let edge = &extraction.edges[0];
    assert_eq!(edge.source.full_name(), "sales.usp_X");
    assert_eq!(edge.source.kind, ObjectKind::Procedure);
    assert_eq!(edge.target.full_name(), "sales.Orders");
    assert_eq!(edge.target.kind, ObjectKind::Table);
    assert_eq!(edge.relationship, Relationship::Reads);
    assert_eq!(edge.line, 3);
    assert!(!edge.ambiguous);
    assert!(edge.snippet.contains("sales.Orders"));

    Ok(())
}

#[test]
fn unqualified_insert_resolves_first_candidate_and_flags_ambiguity() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    // Customer lives in both sales and hr
    let extraction = extractor.extract_script(
        "CREATE PROCEDURE sales.usp_X AS\nBEGIN\n    INSERT INTO Customer (Id) VALUES (1);\nEND",
    )?;

    assert_eq!(extraction.edges.len(), 1);
    let edge = &extraction.edges[0];
    assert_eq!(edge.relationship, Relationship::Writes);
    assert_eq!(edge.target.schema.as_deref(), Some("sales"));
    assert!(edge.ambiguous);

    assert!(extraction
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::AmbiguousSchema));

    Ok(())
}

#[test]
fn temp_tables_are_scoped_to_their_procedure() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE PROCEDURE dbo.usp_Load AS\nBEGIN\n    CREATE TABLE #Staging (Id INT);\n    INSERT INTO #Staging SELECT Id FROM sales.Orders;\nEND",
    )?;

    let temp_edges: Vec<_> = extraction
        .edges
        .iter()
        .filter(|e| e.target.name == "#Staging")
        .collect();
    assert_eq!(temp_edges.len(), 2);

    assert_eq!(temp_edges[0].relationship, Relationship::Creates);
    assert_eq!(temp_edges[1].relationship, Relationship::Writes);
    for edge in temp_edges {
        assert_eq!(edge.target.kind, ObjectKind::TemporaryTable);
        assert_eq!(edge.target.schema.as_deref(), Some("temp_usp_Load"));
        assert!(!edge.ambiguous);
    }

    Ok(())
}

#[test]
fn statements_outside_definitions_yield_zero_edges() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script("EXEC dbo.usp_Other;")?;

    assert!(extraction.edges.is_empty());
    assert!(extraction
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::UnattributedStatement));

    Ok(())
}

#[test]
fn dynamic_sql_yields_one_sentinel_reference() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE PROCEDURE app.usp_Dynamic AS\nBEGIN\n    EXECUTE IMMEDIATE v_sql;\nEND",
    )?;

    assert_eq!(extraction.edges.len(), 1);
    let edge = &extraction.edges[0];
    assert_eq!(edge.relationship, Relationship::References);
    assert_eq!(edge.target.name, DYNAMIC_SQL_TARGET);
    assert_eq!(edge.target.schema, None);

    assert!(extraction
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::DynamicSqlSkipped));

    Ok(())
}

#[test]
fn sequential_routines_attribute_to_their_own_definition() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE PROCEDURE dbo.usp_A AS\nBEGIN\n    EXEC dbo.usp_B;\nEND\nGO\nCREATE PROCEDURE dbo.usp_B AS\nBEGIN\n    SELECT * FROM dbo.Config;\nEND",
    )?;

    assert_eq!(extraction.edges.len(), 2);

    assert_eq!(extraction.edges[0].source.name, "usp_A");
    assert_eq!(extraction.edges[0].relationship, Relationship::Calls);
    assert_eq!(extraction.edges[0].target.full_name(), "dbo.usp_B");
    assert_eq!(extraction.edges[0].target.kind, ObjectKind::Procedure);

    assert_eq!(extraction.edges[1].source.name, "usp_B");
    assert_eq!(extraction.edges[1].relationship, Relationship::Reads);
    assert_eq!(extraction.edges[1].target.full_name(), "dbo.Config");

    Ok(())
}

#[test]
fn edges_preserve_discovery_order() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE PROCEDURE dbo.usp_Flow AS\nBEGIN\n    SELECT * FROM sales.Orders;\n    UPDATE Customer SET Active = 1;\n    EXEC dbo.usp_Notify;\nEND",
    )?;

    let relationships: Vec<Relationship> =
        extraction.edges.iter().map(|e| e.relationship).collect();
    assert_eq!(
        relationships,
        vec![Relationship::Reads, Relationship::Writes, Relationship::Calls]
    );

    let lines: Vec<u64> = extraction.edges.iter().map(|e| e.line).collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted);

    Ok(())
}

#[test]
fn unqualified_definition_names_resolve_to_the_default_schema() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE PROCEDURE usp_Plain AS\nBEGIN\n    SELECT * FROM sales.Orders;\nEND",
    )?;

    assert_eq!(extraction.edges.len(), 1);
    // the defining object ran through the resolver, but carries no
    // ambiguity flag anywhere
    assert_eq!(extraction.edges[0].source.full_name(), "dbo.usp_Plain");
    assert!(!extraction.edges[0].ambiguous);

    Ok(())
}

#[test]
fn functions_are_definitions_too() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE FUNCTION sales.fn_OrderTotal (@OrderId INT) RETURNS INT AS\nBEGIN\n    SELECT * FROM sales.Orders;\n    RETURN 1;\nEND",
    )?;

    assert_eq!(extraction.edges.len(), 1);
    assert_eq!(extraction.edges[0].source.kind, ObjectKind::Function);
    assert_eq!(extraction.edges[0].source.full_name(), "sales.fn_OrderTotal");

    Ok(())
}

#[test]
fn graph_nodes_share_identity_across_edges() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE PROCEDURE dbo.usp_Twice AS\nBEGIN\n    SELECT * FROM sales.Orders;\n    DELETE FROM sales.Orders;\nEND",
    )?;

    assert_eq!(extraction.edges.len(), 2);
    assert_eq!(
        extraction.edges[0].target.unique_key(),
        extraction.edges[1].target.unique_key()
    );
    assert_eq!(extraction.edges[0].relationship, Relationship::Reads);
    assert_eq!(extraction.edges[1].relationship, Relationship::Writes);

    Ok(())
}

#[test]
fn extraction_feeds_the_versioned_report() -> Result<()> {
    let config = config();
    let extractor = DependencyExtractor::new(&config)?;

    let extraction = extractor.extract_script(
        "CREATE PROCEDURE dbo.usp_Report AS\nBEGIN\n    SELECT * FROM sales.Orders;\n    INSERT INTO Customer (Id) VALUES (1);\nEND",
    )?;

    let report = Report::from_edges(extraction.edges, extraction.diagnostics);
    assert_eq!(report.summary.edges, 2);
    assert_eq!(report.summary.reads, 1);
    assert_eq!(report.summary.writes, 1);
    assert_eq!(report.summary.ambiguous, 1);
    assert_eq!(report.summary.warnings, 1);
    assert!(!report.has_errors());

    let json = report.to_json()?;
    assert!(json.contains("\"edges\""));
    assert!(json.contains("\"Orders\""));

    Ok(())
}

#[test]
fn config_rejects_running_without_schemas() {
    let config = Config::default();
    assert!(DependencyExtractor::new(&config).is_err());
}
