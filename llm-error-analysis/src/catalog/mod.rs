//! Static catalog of software-error scenarios
//!
//! Each category holds a fixed, ordered list of error definitions. Selection
//! can be seeded (`seed mod len`) so two operators running the same batch
//! plan pick the same errors, or uniformly random.

mod data;

use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;

/// One raw catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: &'static str,
    pub name: &'static str,
    pub message: &'static str,
}

/// A category and its entries, in declaration order
#[derive(Debug, Clone, Copy)]
pub struct CategoryDef {
    pub key: &'static str,
    pub name: &'static str,
    pub errors: &'static [ErrorEntry],
}

/// A fully resolved error scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorDefinition {
    pub category: &'static str,
    pub category_name: &'static str,
    pub code: &'static str,
    pub name: &'static str,
    pub message: &'static str,
}

impl ErrorDefinition {
    fn from_entry(category: &CategoryDef, entry: &ErrorEntry) -> Self {
        Self {
            category: category.key,
            category_name: category.name,
            code: entry.code,
            name: entry.name,
            message: entry.message,
        }
    }
}

/// Catalog lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Error code '{code}' not found in category '{category}'")]
    UnknownErrorCode { category: String, code: String },
}

/// Read-only view over a set of categories
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    categories: &'static [CategoryDef],
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The catalog shipped with the crate (12 categories, 75 errors)
    pub fn builtin() -> Self {
        Self {
            categories: data::BUILTIN_CATEGORIES,
        }
    }

    /// Wrap a custom category table
    pub fn new(categories: &'static [CategoryDef]) -> Self {
        Self { categories }
    }

    /// Category keys in declaration order
    pub fn list_categories(&self) -> Vec<&'static str> {
        self.categories.iter().map(|c| c.key).collect()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn category(&self, key: &str) -> Result<&'static CategoryDef, CatalogError> {
        self.categories
            .iter()
            .find(|c| c.key == key)
            .ok_or_else(|| CatalogError::InvalidCategory(key.to_string()))
    }

    /// Pick an error from a category.
    ///
    /// With a seed the index is `seed % len`, so the same seed always yields
    /// the same error. Without one the choice is uniformly random.
    pub fn pick_error(&self, category: &str, seed: Option<u64>) -> Result<ErrorDefinition, CatalogError> {
        let def = self.category(category)?;
        if def.errors.is_empty() {
            return Err(CatalogError::InvalidCategory(category.to_string()));
        }

        let index = match seed {
            Some(seed) => (seed % def.errors.len() as u64) as usize,
            None => rand::thread_rng().gen_range(0..def.errors.len()),
        };

        Ok(ErrorDefinition::from_entry(def, &def.errors[index]))
    }

    /// Exact lookup by code within a category
    pub fn lookup_error(&self, category: &str, code: &str) -> Result<ErrorDefinition, CatalogError> {
        let def = self.category(category)?;
        def.errors
            .iter()
            .find(|e| e.code == code)
            .map(|e| ErrorDefinition::from_entry(def, e))
            .ok_or_else(|| CatalogError::UnknownErrorCode {
                category: category.to_string(),
                code: code.to_string(),
            })
    }

    /// Every entry, category by category
    pub fn all_errors(&self) -> Vec<ErrorDefinition> {
        self.categories
            .iter()
            .flat_map(|c| c.errors.iter().map(move |e| ErrorDefinition::from_entry(c, e)))
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.categories.iter().map(|c| c.errors.len()).sum()
    }

    /// Entries whose code is absent from `present`, grouped by category.
    ///
    /// Categories with nothing missing are omitted; both category and entry
    /// order follow the catalog declaration.
    pub fn missing_codes(&self, present: &BTreeSet<String>) -> IndexMap<&'static str, Vec<ErrorDefinition>> {
        let mut missing = IndexMap::new();
        for category in self.categories {
            let absent: Vec<ErrorDefinition> = category
                .errors
                .iter()
                .filter(|e| !present.contains(e.code))
                .map(|e| ErrorDefinition::from_entry(category, e))
                .collect();
            if !absent.is_empty() {
                missing.insert(category.key, absent);
            }
        }
        missing
    }

    /// Fraction of catalog codes present in `present`
    pub fn coverage(&self, present: &BTreeSet<String>) -> f64 {
        let total = self.error_count();
        if total == 0 {
            return 0.0;
        }
        let covered = self
            .all_errors()
            .iter()
            .filter(|e| present.contains(e.code))
            .count();
        covered as f64 / total as f64
    }
}
