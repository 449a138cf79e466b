//! Schema resolution for bare and qualified object names
//!
//! Decides which schema owns a referenced object, and whether that decision
//! is certain. Ambiguity is carried as data on the resulting edge, never as
//! an error.

use sqlgraph_core::{AmbiguityStrategy, Config, ConfigError};

/// Outcome of a resolution: the owning schema and whether it was inferred
/// under ambiguity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The chosen schema
    pub schema: String,

    /// True when more than one candidate existed, or the object was unknown
    pub ambiguous: bool,
}

/// Resolves object names against the configured knowledge base
///
/// Borrows the immutable config for the duration of a run; the same config
/// may back any number of concurrent resolvers.
pub struct SchemaResolver<'a> {
    config: &'a Config,
}

impl<'a> SchemaResolver<'a> {
    /// Create a resolver, validating the config first
    ///
    /// Fails fast on an empty `known_schemas` list: a resolver with no
    /// fallback schema has no defined behavior, and that must surface before
    /// traversal begins rather than deep inside it.
    pub fn new(config: &'a Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Decide the owning schema for `object_name`
    ///
    /// An explicit schema always wins and is never second-guessed against
    /// the knowledge base. Otherwise the knowledge base decides: a single
    /// candidate is certain; multiple candidates resolve per the configured
    /// tie-break strategy but are flagged ambiguous; an unknown object falls
    /// back to the default schema, also flagged ambiguous.
    pub fn resolve(&self, object_name: &str, explicit_schema: Option<&str>) -> Resolution {
        if let Some(schema) = explicit_schema {
            if !schema.is_empty() {
                return Resolution {
                    schema: schema.to_string(),
                    ambiguous: false,
                };
            }
        }

        if let Some(candidates) = self.config.object_locations.get(object_name) {
            match candidates.len() {
                0 => {}
                1 => {
                    return Resolution {
                        schema: candidates[0].clone(),
                        ambiguous: false,
                    }
                }
                _ => {
                    return Resolution {
                        schema: self.pick_candidate(candidates),
                        ambiguous: true,
                    }
                }
            }
        }

        // non-empty by construction-time validation
        Resolution {
            schema: self.config.known_schemas[0].clone(),
            ambiguous: true,
        }
    }

    fn pick_candidate(&self, candidates: &[String]) -> String {
        match self.config.ambiguity {
            AmbiguityStrategy::FirstCandidate => candidates[0].clone(),
            AmbiguityStrategy::PreferDefault => {
                let default = &self.config.known_schemas[0];
                if candidates.iter().any(|c| c == default) {
                    default.clone()
                } else {
                    candidates[0].clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::with_schemas(vec!["dbo".to_string(), "sales".to_string(), "hr".to_string()])
            .with_object("Orders", vec!["sales".to_string()])
            .with_object("Customer", vec!["sales".to_string(), "hr".to_string()])
    }

    #[test]
    fn explicit_schema_always_wins() {
        let config = config();
        let resolver = SchemaResolver::new(&config).unwrap();

        // even against knowledge-base contents that disagree
        let resolution = resolver.resolve("Orders", Some("archive"));
        assert_eq!(resolution.schema, "archive");
        assert!(!resolution.ambiguous);
    }

    #[test]
    fn single_candidate_is_certain() {
        let config = config();
        let resolver = SchemaResolver::new(&config).unwrap();

        let resolution = resolver.resolve("Orders", None);
        assert_eq!(resolution.schema, "sales");
        assert!(!resolution.ambiguous);
    }

    #[test]
    fn multiple_candidates_pick_first_and_flag() {
        let config = config();
        let resolver = SchemaResolver::new(&config).unwrap();

        let resolution = resolver.resolve("Customer", None);
        assert_eq!(resolution.schema, "sales");
        assert!(resolution.ambiguous);
    }

    #[test]
    fn unknown_object_falls_back_to_default() {
        let config = config();
        let resolver = SchemaResolver::new(&config).unwrap();

        let resolution = resolver.resolve("Nowhere", None);
        assert_eq!(resolution.schema, "dbo");
        assert!(resolution.ambiguous);
    }

    #[test]
    fn prefer_default_strategy_picks_default_when_candidate() {
        let mut config = Config::with_schemas(vec!["hr".to_string(), "sales".to_string()])
            .with_object("Customer", vec!["sales".to_string(), "hr".to_string()]);
        config.ambiguity = AmbiguityStrategy::PreferDefault;
        let resolver = SchemaResolver::new(&config).unwrap();

        // default "hr" is among the candidates, so it beats insertion order
        let resolution = resolver.resolve("Customer", None);
        assert_eq!(resolution.schema, "hr");
        assert!(resolution.ambiguous);

        // default not a candidate: back to insertion order
        let resolution = resolver.resolve("Orders", None);
        assert_eq!(resolution.schema, "hr");
        assert!(resolution.ambiguous);
    }

    #[test]
    fn empty_schema_list_is_rejected_at_construction() {
        let config = Config::default();
        assert!(SchemaResolver::new(&config).is_err());
    }
}
