//! Schema rules
//!
//! A [`SchemaRules`] set maps source table names to [`TransformRule`]s. The
//! built-in set covers the AdventureWorks product dimensions; a YAML rules
//! file can replace it.
//!
//! Example format:
//! ```yaml
//! tables:
//!   DimProductCategory:
//!     retain:
//!       - ProductCategoryKey
//!       - EnglishProductCategoryName
//!     rename:
//!       EnglishProductCategoryName: ProductCategoryName
//!   DimProduct:
//!     retain: [ProductKey, StandardCost]
//!     fill:
//!       StandardCost: "0"
//!     coerce:
//!       StandardCost: decimal(2)
//! ```

mod builtin;
mod rules;

pub use builtin::{
    CANDIDATE_TABLES, CATEGORY_KEY, CATEGORY_TABLE, MERGED_TABLE, PRODUCT_TABLE,
    SUBCATEGORY_KEY, SUBCATEGORY_TABLE,
};
pub use rules::{TransformRule, TransformRuleBuilder};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Transform rules keyed by source table name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaRules {
    #[serde(default)]
    tables: BTreeMap<String, TransformRule>,
}

impl SchemaRules {
    /// Create an empty rule set; every table passes through unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the AdventureWorks product dimensions
    pub fn builtin() -> Self {
        builtin::adventure_works()
    }

    pub fn insert(&mut self, table: impl Into<String>, rule: TransformRule) {
        self.tables.insert(table.into(), rule);
    }

    pub fn get(&self, table: &str) -> Option<&TransformRule> {
        self.tables.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parse and validate rules from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: Self =
            serde_yaml::from_str(yaml).with_context(|| "Failed to parse rules YAML")?;
        for (table, rule) in &rules.tables {
            rule.validate(table)?;
        }
        Ok(rules)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).with_context(|| "Failed to serialize rules")
    }

    /// Read rules from a YAML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read rules file: {}", path.as_ref().display())
        })?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid rules file: {}", path.as_ref().display()))
    }

    /// Write rules to a YAML file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), self.to_yaml()?).with_context(|| {
            format!("Failed to write rules file: {}", path.as_ref().display())
        })?;
        Ok(())
    }
}
