//! Column renaming

use crate::error::{EtlError, Result};
use crate::etl::Transformer;
use crate::table::TableSnapshot;
use std::collections::{BTreeMap, HashSet};

/// Relabels columns; cell data is untouched
pub struct Rename<'a> {
    mapping: &'a BTreeMap<String, String>,
}

impl<'a> Rename<'a> {
    pub fn new(mapping: &'a BTreeMap<String, String>) -> Self {
        Self { mapping }
    }
}

impl Transformer for Rename<'_> {
    type Input = TableSnapshot;
    type Output = TableSnapshot;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        if let Some(missing) = self.mapping.keys().find(|k| !input.has_column(k)) {
            return Err(EtlError::schema(
                input.name(),
                format!("rename source column '{}' not found", missing),
            ));
        }

        let (name, columns, rows) = input.into_parts();
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| self.mapping.get(&c).cloned().unwrap_or(c))
            .collect();

        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(EtlError::schema(
                name.as_str(),
                format!("rename produces duplicate column '{}'", dup),
            ));
        }

        Ok(TableSnapshot::from_parts_unchecked(name, columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Scalar;

    #[test]
    fn test_rename_changes_labels_only() {
        let input = TableSnapshot::with_rows(
            "DimProduct",
            vec!["ProductKey".to_string(), "EnglishProductName".to_string()],
            vec![vec![Scalar::Integer(1), Scalar::text("Adjustable Race")]],
        )
        .unwrap();
        let mapping = BTreeMap::from([(
            "EnglishProductName".to_string(),
            "ProductName".to_string(),
        )]);

        let output = Rename::new(&mapping).transform(input.clone()).unwrap();
        assert_eq!(
            output.columns(),
            &["ProductKey".to_string(), "ProductName".to_string()]
        );
        assert_eq!(output.rows(), input.rows());
    }

    #[test]
    fn test_rename_into_existing_column_fails() {
        let input = TableSnapshot::new("t", vec!["a".to_string(), "b".to_string()]);
        let mapping = BTreeMap::from([("a".to_string(), "b".to_string())]);

        let err = Rename::new(&mapping).transform(input).unwrap_err();
        assert!(err.to_string().contains("duplicate column 'b'"));
    }
}
