//! Denormalizing merge of the product dimensions

use crate::error::{EtlError, Result};
use crate::schema::{
    CATEGORY_KEY, CATEGORY_TABLE, MERGED_TABLE, PRODUCT_TABLE, SUBCATEGORY_KEY,
    SUBCATEGORY_TABLE,
};
use crate::table::TableSnapshot;
use std::collections::HashMap;

/// Inner join of `left` and `right` on the column `key` present in both
///
/// Output columns are all of `left`'s, then `right`'s except its copy of
/// the key. A right column whose name is already taken is renamed
/// `<RightTable>_<Column>`. Rows follow `left` order, then match order in
/// `right`. Null keys never match.
pub fn inner_join(
    left: &TableSnapshot,
    right: &TableSnapshot,
    key: &str,
    output: &str,
) -> Result<TableSnapshot> {
    let left_key = left.column_index(key).ok_or_else(|| {
        EtlError::schema(left.name(), format!("join key '{}' not found", key))
    })?;
    let right_key = right.column_index(key).ok_or_else(|| {
        EtlError::schema(right.name(), format!("join key '{}' not found", key))
    })?;

    let mut columns = left.columns().to_vec();
    let mut carried = Vec::with_capacity(right.columns().len().saturating_sub(1));
    for (idx, column) in right.columns().iter().enumerate() {
        if idx == right_key {
            continue;
        }
        let name = if columns.contains(column) {
            let prefixed = format!("{}_{}", right.name(), column);
            if columns.contains(&prefixed) {
                return Err(EtlError::schema(
                    output,
                    format!("cannot disambiguate column '{}' from {}", column, right.name()),
                ));
            }
            log::debug!("Column {} from {} renamed to {}", column, right.name(), prefixed);
            prefixed
        } else {
            column.clone()
        };
        columns.push(name);
        carried.push(idx);
    }

    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (row_no, row) in right.rows().iter().enumerate() {
        if let Some(k) = row[right_key].join_key() {
            index.entry(k).or_default().push(row_no);
        }
    }

    let mut joined = TableSnapshot::new(output, columns);
    for row in left.rows() {
        let Some(k) = row[left_key].join_key() else {
            continue;
        };
        for &matched in index.get(&k).map(Vec::as_slice).unwrap_or_default() {
            let other = &right.rows()[matched];
            let mut cells = row.clone();
            cells.extend(carried.iter().map(|&i| other[i].clone()));
            joined.push_row(cells)?;
        }
    }

    Ok(joined)
}

/// `product ⋈ subcategory ON ProductSubcategoryKey ⋈ category ON ProductCategoryKey`
pub fn merge(
    product: &TableSnapshot,
    subcategory: &TableSnapshot,
    category: &TableSnapshot,
) -> Result<TableSnapshot> {
    let with_subcategory = inner_join(product, subcategory, SUBCATEGORY_KEY, MERGED_TABLE)?;
    inner_join(&with_subcategory, category, CATEGORY_KEY, MERGED_TABLE)
}

/// Locates the three product dimensions in a set of snapshots and merges them
pub struct Merger {
    output: String,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(MERGED_TABLE)
    }
}

impl Merger {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// Merge the product hierarchy out of `tables`
    ///
    /// # Errors
    /// A schema error if one of the three dimensions is missing from `tables`
    pub fn merge_tables(&self, tables: &[TableSnapshot]) -> Result<TableSnapshot> {
        let find = |name: &str| {
            tables.iter().find(|t| t.name() == name).ok_or_else(|| {
                EtlError::schema(
                    self.output.as_str(),
                    format!("merge input {} was not extracted", name),
                )
            })
        };
        let product = find(PRODUCT_TABLE)?;
        let subcategory = find(SUBCATEGORY_TABLE)?;
        let category = find(CATEGORY_TABLE)?;

        let merged = merge(product, subcategory, category)?.renamed(self.output.as_str());
        log::info!(
            "Merged {} product(s) into {} row(s)",
            product.len(),
            merged.len()
        );
        Ok(merged)
    }
}
