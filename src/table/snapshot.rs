//! In-memory table snapshots passed between phases

use super::Scalar;
use crate::error::{EtlError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// A fully materialized table
///
/// Rows are positional and aligned with `columns`, so every row carries
/// exactly the snapshot's column set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSnapshot {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

impl TableSnapshot {
    /// Create an empty snapshot with the given columns
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a snapshot from positional rows, rejecting rows of the wrong width
    pub fn with_rows(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Scalar>>,
    ) -> Result<Self> {
        let mut snapshot = Self::new(name, columns);
        for row in rows {
            snapshot.push_row(row)?;
        }
        Ok(snapshot)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the same data under another table name
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Cell at `row` in `column`
    pub fn get(&self, row: usize, column: &str) -> Option<&Scalar> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All cells of one column, in row order
    pub fn column_values(&self, column: &str) -> Option<Vec<&Scalar>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Row as a column-name keyed map
    pub fn record(&self, row: usize) -> Option<HashMap<&str, &Scalar>> {
        self.rows.get(row).map(|r| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(r.iter())
                .collect()
        })
    }

    pub fn push_row(&mut self, row: Vec<Scalar>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::schema(
                &self.name,
                format!(
                    "row has {} cells but the table has {} columns",
                    row.len(),
                    self.columns.len()
                ),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (String, Vec<String>, Vec<Vec<Scalar>>) {
        (self.name, self.columns, self.rows)
    }

    pub(crate) fn from_parts_unchecked(
        name: String,
        columns: Vec<String>,
        rows: Vec<Vec<Scalar>>,
    ) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self {
            name,
            columns,
            rows,
        }
    }
}
