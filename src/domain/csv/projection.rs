// ============================================================
// ROW PROJECTION
// ============================================================
// Derives the storage shape of a row from its sanitized fields

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::FieldRecord;
use crate::domain::batch::StorageRecord;
use crate::domain::error::{AppError, Result};

static SQL_IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap());

/// True when `name` can be used unquoted-safe as a table or column name
pub fn is_sql_identifier(name: &str) -> bool {
    SQL_IDENTIFIER_PATTERN.is_match(name)
}

fn default_separator() -> String {
    " ".to_string()
}

/// How one target column is computed from the sanitized fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DerivationRule {
    /// Copy a single field; absent fields become an empty string
    Field { source: String },

    /// Join the non-empty values of several fields
    Concat {
        sources: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

impl DerivationRule {
    pub fn sources(&self) -> Vec<&str> {
        match self {
            DerivationRule::Field { source } => vec![source.as_str()],
            DerivationRule::Concat { sources, .. } => sources.iter().map(String::as_str).collect(),
        }
    }

    pub fn derive(&self, record: &FieldRecord) -> String {
        match self {
            DerivationRule::Field { source } => record.get(source).unwrap_or("").to_string(),
            DerivationRule::Concat { sources, separator } => sources
                .iter()
                .filter_map(|s| record.get(s))
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(separator),
        }
    }
}

/// Mapping `{target_field: derivation_rule}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Projection(BTreeMap<String, DerivationRule>);

impl Projection {
    pub fn new(rules: BTreeMap<String, DerivationRule>) -> Self {
        Self(rules)
    }

    /// `full_name` built from `first_name` and `last_name`
    pub fn full_name() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            "full_name".to_string(),
            DerivationRule::Concat {
                sources: vec!["first_name".to_string(), "last_name".to_string()],
                separator: default_separator(),
            },
        );
        Self(rules)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::full_name()
    }

    pub fn targets(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = (&String, &DerivationRule)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check targets are usable column names and every rule only reads recognized fields
    pub fn validate(&self, recognized_fields: &[String]) -> Result<()> {
        if self.0.is_empty() {
            return Err(AppError::ValidationError(
                "Projection must define at least one target field".to_string(),
            ));
        }

        for (target, rule) in &self.0 {
            if !is_sql_identifier(target) {
                return Err(AppError::ValidationError(format!(
                    "Target field '{}' is not a valid column name",
                    target
                )));
            }

            let sources = rule.sources();
            if sources.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "Target field '{}' has no source fields",
                    target
                )));
            }

            if let Some(unknown) = sources
                .iter()
                .find(|s| !recognized_fields.iter().any(|f| f == *s))
            {
                return Err(AppError::ValidationError(format!(
                    "Target field '{}' references unrecognized field '{}'",
                    target, unknown
                )));
            }
        }

        Ok(())
    }

    pub fn apply(&self, record: &FieldRecord) -> StorageRecord {
        let mut storage = StorageRecord::default();
        for (target, rule) in &self.0 {
            storage.push(target.clone(), rule.derive(record));
        }
        storage
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::full_name()
    }
}
