// SPDX-License-Identifier: Apache-2.0

//! Catalog of transformers grouped by semantic category.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::transforms::{get_all_transformers, Transformer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MutationCategory {
    Arrays,
    Booleans,
    Numbers,
    Strings,
    Dicts,
    Conditionals,
    Loops,
    Math,
    CodeStyle,
}

impl MutationCategory {
    pub const ALL: [MutationCategory; 9] = [
        MutationCategory::Arrays,
        MutationCategory::Booleans,
        MutationCategory::Numbers,
        MutationCategory::Strings,
        MutationCategory::Dicts,
        MutationCategory::Conditionals,
        MutationCategory::Loops,
        MutationCategory::Math,
        MutationCategory::CodeStyle,
    ];
}

impl fmt::Display for MutationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationCategory::Arrays => "arrays",
            MutationCategory::Booleans => "booleans",
            MutationCategory::Numbers => "numbers",
            MutationCategory::Strings => "strings",
            MutationCategory::Dicts => "dicts",
            MutationCategory::Conditionals => "conditionals",
            MutationCategory::Loops => "loops",
            MutationCategory::Math => "math",
            MutationCategory::CodeStyle => "code_style",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for MutationCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let category = match normalized.as_str() {
            "arrays" => MutationCategory::Arrays,
            "booleans" => MutationCategory::Booleans,
            "numbers" => MutationCategory::Numbers,
            "strings" => MutationCategory::Strings,
            "dicts" => MutationCategory::Dicts,
            "conditionals" => MutationCategory::Conditionals,
            "loops" => MutationCategory::Loops,
            "math" => MutationCategory::Math,
            "code_style" | "style" => MutationCategory::CodeStyle,
            _ => return Err(ConfigError::UnknownCategory(s.to_string())),
        };
        Ok(category)
    }
}

/// Parses a comma-separated category list such as `booleans,code_style`.
pub fn parse_category_list(s: &str) -> Result<Vec<MutationCategory>, ConfigError> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(MutationCategory::from_str)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingCategory { transformer: String },
    UnknownCategory(String),
    UnknownMutation(String),
    DuplicateMutation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingCategory { transformer } => write!(
                f,
                "ConfigError: category must be provided for registered transformer {}",
                transformer
            ),
            ConfigError::UnknownCategory(s) => {
                write!(f, "ConfigError: unknown mutation category {:?}", s)
            }
            ConfigError::UnknownMutation(s) => write!(f, "ConfigError: unknown mutation {:?}", s),
            ConfigError::DuplicateMutation(s) => {
                write!(f, "ConfigError: mutation {} registered twice", s)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub type SharedTransformer = Arc<dyn Transformer>;

#[derive(Debug, Clone)]
pub struct MutationRegistry {
    registry: BTreeMap<MutationCategory, Vec<SharedTransformer>>,
}

impl Default for MutationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationRegistry {
    /// An empty registry with every category present and empty.
    pub fn new() -> Self {
        let registry = MutationCategory::ALL
            .iter()
            .map(|c| (*c, Vec::new()))
            .collect();
        Self { registry }
    }

    pub fn register(
        &mut self,
        transformer: Box<dyn Transformer>,
        category: Option<MutationCategory>,
    ) -> Result<(), ConfigError> {
        let name = transformer.name();
        let category = category.ok_or_else(|| ConfigError::MissingCategory {
            transformer: name.clone(),
        })?;
        if self.find(&name).is_some() {
            return Err(ConfigError::DuplicateMutation(name));
        }
        log::info!("Registered mutation {} to category {}", name, category);
        self.registry
            .entry(category)
            .or_default()
            .push(Arc::from(transformer));
        Ok(())
    }

    /// Returns transformers grouped by category, leaving out the categories
    /// in `exclude`.
    pub fn get(
        &self,
        exclude: Option<&[MutationCategory]>,
    ) -> BTreeMap<MutationCategory, Vec<SharedTransformer>> {
        let exclude = exclude.unwrap_or(&[]);
        self.registry
            .iter()
            .filter(|(category, _)| !exclude.contains(category))
            .map(|(category, transformers)| (*category, transformers.clone()))
            .collect()
    }

    pub fn get_category(&self, category: MutationCategory) -> Vec<SharedTransformer> {
        self.registry.get(&category).cloned().unwrap_or_default()
    }

    pub fn find(&self, name: &str) -> Option<SharedTransformer> {
        self.registry
            .values()
            .flatten()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// Total number of registered transformers.
    pub fn len(&self) -> usize {
        self.registry.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registers every transformer in the catalog. Must run before the engine is
/// used through a registry.
pub fn build_default_registry() -> Result<MutationRegistry, ConfigError> {
    let mut registry = MutationRegistry::new();
    for transformer in get_all_transformers() {
        let category = transformer.category();
        registry.register(transformer, category)?;
    }
    Ok(registry)
}

/// Looks up a catalog transformer by its name.
pub fn get_transformer(name: &str) -> Result<Box<dyn Transformer>, ConfigError> {
    get_all_transformers()
        .into_iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| ConfigError::UnknownMutation(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NodeBuilder, TransformContext};
    use crate::transforms::MutationKind;
    use pretty_assertions::assert_eq;
    use stembench_pyast::NodeRef;

    #[derive(Debug)]
    struct Uncategorized;

    impl Transformer for Uncategorized {
        fn kind(&self) -> MutationKind {
            MutationKind::AddParens
        }

        fn category(&self) -> Option<MutationCategory> {
            None
        }

        fn is_transformable(&self, _ctx: &TransformContext, _node: NodeRef) -> bool {
            false
        }

        fn transform_node(&self, _builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
            vec![node]
        }
    }

    #[test]
    fn register_without_category_is_a_config_error() {
        let mut registry = MutationRegistry::new();
        let t = Box::new(Uncategorized);
        let category = t.category();
        let err = registry.register(t, category).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingCategory {
                transformer: "AddParens".to_string()
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn excluding_booleans_leaves_other_counts_unchanged() {
        let registry = build_default_registry().unwrap();
        let all = registry.get(None);
        let without = registry.get(Some(&[MutationCategory::Booleans]));
        assert!(!without.contains_key(&MutationCategory::Booleans));
        assert!(!all[&MutationCategory::Booleans].is_empty());
        for (category, transformers) in &without {
            assert_eq!(transformers.len(), all[category].len(), "{}", category);
        }
        let total: usize = without.values().map(|v| v.len()).sum();
        assert_eq!(
            total + all[&MutationCategory::Booleans].len(),
            registry.len()
        );
    }

    #[test]
    fn every_category_has_transformers() {
        let registry = build_default_registry().unwrap();
        for category in MutationCategory::ALL {
            assert!(
                !registry.get_category(category).is_empty(),
                "no transformers in {}",
                category
            );
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = build_default_registry().unwrap();
        let again = get_transformer("LenToGenerator").unwrap();
        let category = again.category();
        assert_eq!(
            registry.register(again, category),
            Err(ConfigError::DuplicateMutation("LenToGenerator".to_string()))
        );
    }

    #[test]
    fn category_names_round_trip() {
        for category in MutationCategory::ALL {
            let parsed: MutationCategory = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert_eq!(
            parse_category_list("booleans, code_style").unwrap(),
            vec![MutationCategory::Booleans, MutationCategory::CodeStyle]
        );
        assert!(parse_category_list("nope").is_err());
    }

    #[test]
    fn unknown_mutation_lookup_fails() {
        assert!(matches!(
            get_transformer("NoSuchThing"),
            Err(ConfigError::UnknownMutation(_))
        ));
    }
}
