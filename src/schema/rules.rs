//! Per-table transform rules

use crate::error::{EtlError, Result};
use crate::etl::Transformer;
use crate::table::{ScalarKind, TableSnapshot};
use crate::transform::{Coercion, NullFill, Projection, Rename};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How one source table is reshaped for the destination
///
/// `rename`, `fill` and `coerce` are keyed by source column names, all of
/// which must appear in `retain`. Rules are immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformRule {
    retain: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    rename: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    fill: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    coerce: BTreeMap<String, ScalarKind>,
}

impl TransformRule {
    pub fn builder() -> TransformRuleBuilder {
        TransformRuleBuilder::default()
    }

    pub fn retain(&self) -> &[String] {
        &self.retain
    }

    pub fn rename_map(&self) -> &BTreeMap<String, String> {
        &self.rename
    }

    pub fn fill_map(&self) -> &BTreeMap<String, String> {
        &self.fill
    }

    pub fn coerce_map(&self) -> &BTreeMap<String, ScalarKind> {
        &self.coerce
    }

    /// Column names after projection and rename
    pub fn output_columns(&self) -> Vec<String> {
        self.retain
            .iter()
            .map(|c| self.rename.get(c).unwrap_or(c).clone())
            .collect()
    }

    /// Check the rule's internal consistency
    ///
    /// `table` only labels the error.
    pub fn validate(&self, table: &str) -> Result<()> {
        let mut retained = HashSet::new();
        for column in &self.retain {
            if !retained.insert(column.as_str()) {
                return Err(EtlError::schema(
                    table,
                    format!("column '{}' retained twice", column),
                ));
            }
        }

        let keyed = [
            ("rename", self.rename.keys().collect::<Vec<_>>()),
            ("fill", self.fill.keys().collect()),
            ("coerce", self.coerce.keys().collect()),
        ];
        for (map, keys) in keyed {
            if let Some(key) = keys.into_iter().find(|k| !retained.contains(k.as_str())) {
                return Err(EtlError::schema(
                    table,
                    format!("{} key '{}' is not a retained column", map, key),
                ));
            }
        }

        let mut outputs = HashSet::new();
        for column in self.output_columns() {
            if !outputs.insert(column.clone()) {
                return Err(EtlError::schema(
                    table,
                    format!("output column '{}' appears twice after rename", column),
                ));
            }
        }

        Ok(())
    }

    /// Apply projection, null fill, rename and coercion, in that order
    ///
    /// Coercion targets are resolved through the rename map, so they keep
    /// referring to source column names.
    pub fn apply(&self, snapshot: TableSnapshot) -> Result<TableSnapshot> {
        let projected = Projection::new(&self.retain).transform(snapshot)?;
        let filled = NullFill::new(&self.fill).transform(projected)?;
        let renamed = Rename::new(&self.rename).transform(filled)?;

        let targets = self.coerce.iter().map(|(column, kind)| {
            let resolved = self.rename.get(column).unwrap_or(column).clone();
            (resolved, *kind)
        });
        Coercion::new(targets).transform(renamed)
    }
}

/// Incremental construction of a [`TransformRule`]
#[derive(Debug, Default)]
pub struct TransformRuleBuilder {
    rule: TransformRule,
}

impl TransformRuleBuilder {
    pub fn retain<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule.retain.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rule.rename.insert(from.into(), to.into());
        self
    }

    pub fn fill(mut self, column: impl Into<String>, default: impl Into<String>) -> Self {
        self.rule.fill.insert(column.into(), default.into());
        self
    }

    /// Fill each listed column with the same default
    pub fn fill_all<I, S>(mut self, columns: I, default: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            self.rule.fill.insert(column.into(), default.to_string());
        }
        self
    }

    pub fn coerce(mut self, column: impl Into<String>, kind: ScalarKind) -> Self {
        self.rule.coerce.insert(column.into(), kind);
        self
    }

    pub fn build(self) -> Result<TransformRule> {
        self.rule.validate("transform rule")?;
        Ok(self.rule)
    }
}
