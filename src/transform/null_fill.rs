//! Null filling with per-column defaults

use crate::error::{EtlError, Result};
use crate::etl::Transformer;
use crate::table::{Scalar, TableSnapshot};
use std::collections::BTreeMap;

/// Replaces null cells with a per-column default text
///
/// By convention numeric columns default to `"0"` and descriptive columns to
/// `"NA"`. Filling an already filled table changes nothing.
pub struct NullFill<'a> {
    defaults: &'a BTreeMap<String, String>,
}

impl<'a> NullFill<'a> {
    pub fn new(defaults: &'a BTreeMap<String, String>) -> Self {
        Self { defaults }
    }
}

impl Transformer for NullFill<'_> {
    type Input = TableSnapshot;
    type Output = TableSnapshot;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        let targets = self
            .defaults
            .iter()
            .map(|(column, default)| {
                input
                    .column_index(column)
                    .map(|idx| (idx, default))
                    .ok_or_else(|| {
                        EtlError::schema(input.name(), format!("fill column '{}' not found", column))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let (name, columns, mut rows) = input.into_parts();
        let mut filled = 0usize;
        for row in rows.iter_mut() {
            for (idx, default) in &targets {
                if row[*idx].is_null() {
                    row[*idx] = Scalar::text(default.as_str());
                    filled += 1;
                }
            }
        }
        if filled > 0 {
            log::debug!("Filled {} null cell(s) in {}", filled, name);
        }

        Ok(TableSnapshot::from_parts_unchecked(name, columns, rows))
    }
}
