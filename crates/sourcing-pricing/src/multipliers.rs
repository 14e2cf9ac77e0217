//! Keyword-driven markup factors applied to wholesale cost.
//!
//! Lookup is by substring containment over the lower-cased item name, in
//! declaration order; the first matching keyword wins.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Multiplier used when no keyword matches (2.5).
#[must_use]
pub fn default_multiplier() -> Decimal {
    Decimal::new(25, 1)
}

const BUILTIN: &[(&str, i64)] = &[
    ("전자", 20),
    ("디지털", 20),
    ("가전", 20),
    ("충전기", 20),
    ("이어폰", 20),
    ("문구", 30),
    ("사무용품", 30),
    ("학용품", 30),
    ("주방", 25),
    ("수납", 25),
    ("생활용품", 25),
    ("리빙", 25),
    ("캠핑", 23),
    ("등산", 23),
    ("스포츠", 23),
    ("완구", 30),
    ("장난감", 30),
    ("반려동물", 28),
    ("펫", 28),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMultiplier {
    pub keyword: String,
    pub multiplier: Decimal,
}

/// Result of a lookup: the factor and the keyword that produced it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplierMatch<'a> {
    pub keyword: Option<&'a str>,
    pub multiplier: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMultiplierTable {
    entries: Vec<CategoryMultiplier>,
    default_multiplier: Decimal,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default = "default_multiplier")]
    default: Decimal,
    categories: Vec<CategoryMultiplier>,
}

impl Default for CategoryMultiplierTable {
    fn default() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(keyword, tenths)| CategoryMultiplier {
                    keyword: (*keyword).to_owned(),
                    multiplier: Decimal::new(*tenths, 1),
                })
                .collect(),
            default_multiplier: default_multiplier(),
        }
    }
}

impl CategoryMultiplierTable {
    /// Builds a validated table. Keywords are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::TableValidation`] for an empty or duplicate
    /// keyword or a non-positive multiplier.
    pub fn new(
        entries: Vec<CategoryMultiplier>,
        default_multiplier: Decimal,
    ) -> Result<Self, PricingError> {
        if default_multiplier <= Decimal::ZERO {
            return Err(PricingError::TableValidation(format!(
                "default multiplier must be positive, got {default_multiplier}"
            )));
        }

        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(entries.len());
        for entry in entries {
            let keyword = entry.keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(PricingError::TableValidation(
                    "category keyword must be non-empty".to_string(),
                ));
            }
            if entry.multiplier <= Decimal::ZERO {
                return Err(PricingError::TableValidation(format!(
                    "multiplier for '{keyword}' must be positive, got {}",
                    entry.multiplier
                )));
            }
            if !seen.insert(keyword.clone()) {
                return Err(PricingError::TableValidation(format!(
                    "duplicate category keyword: '{keyword}'"
                )));
            }
            normalized.push(CategoryMultiplier {
                keyword,
                multiplier: entry.multiplier,
            });
        }

        Ok(Self {
            entries: normalized,
            default_multiplier,
        })
    }

    /// Loads a table from YAML:
    ///
    /// ```yaml
    /// default: 2.5
    /// categories:
    ///   - keyword: 이어폰
    ///     multiplier: 2.0
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, PricingError> {
        let content = std::fs::read_to_string(path).map_err(|e| PricingError::TableIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            PricingError::TableParse { source, .. } => PricingError::TableParse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// # Errors
    ///
    /// Returns [`PricingError`] if the YAML is malformed or fails validation.
    pub fn from_yaml_str(content: &str) -> Result<Self, PricingError> {
        let file: TableFile =
            serde_yaml::from_str(content).map_err(|e| PricingError::TableParse {
                path: "<inline>".to_string(),
                source: e,
            })?;
        Self::new(file.categories, file.default)
    }

    #[must_use]
    pub fn entries(&self) -> &[CategoryMultiplier] {
        &self.entries
    }

    #[must_use]
    pub fn default_multiplier(&self) -> Decimal {
        self.default_multiplier
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> MultiplierMatch<'_> {
        let text = name.to_lowercase();
        self.entries
            .iter()
            .find(|entry| text.contains(entry.keyword.as_str()))
            .map_or(
                MultiplierMatch {
                    keyword: None,
                    multiplier: self.default_multiplier,
                },
                |entry| MultiplierMatch {
                    keyword: Some(entry.keyword.as_str()),
                    multiplier: entry.multiplier,
                },
            )
    }
}
