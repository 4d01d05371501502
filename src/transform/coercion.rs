//! Type coercion of designated columns

use crate::error::{EtlError, Result};
use crate::etl::Transformer;
use crate::table::{ScalarKind, TableSnapshot};

/// Casts whole columns to a [`ScalarKind`]
///
/// A single bad cell fails the whole table; there is no partial-row recovery.
pub struct Coercion {
    targets: Vec<(String, ScalarKind)>,
}

impl Coercion {
    pub fn new(targets: impl IntoIterator<Item = (String, ScalarKind)>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
        }
    }
}

impl Transformer for Coercion {
    type Input = TableSnapshot;
    type Output = TableSnapshot;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        let targets = self
            .targets
            .iter()
            .map(|(column, kind)| {
                input
                    .column_index(column)
                    .map(|idx| (idx, column, *kind))
                    .ok_or_else(|| {
                        EtlError::schema(
                            input.name(),
                            format!("coercion column '{}' not found", column),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let (name, columns, mut rows) = input.into_parts();
        for (row_no, row) in rows.iter_mut().enumerate() {
            for (idx, column, kind) in &targets {
                row[*idx] = row[*idx].coerce(*kind).map_err(|e| {
                    EtlError::schema(
                        name.as_str(),
                        format!("cannot coerce {} in row {} to {}: {}", column, row_no, kind, e),
                    )
                })?;
            }
        }

        Ok(TableSnapshot::from_parts_unchecked(name, columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Scalar;

    fn snapshot(cost: Scalar) -> TableSnapshot {
        TableSnapshot::with_rows(
            "DimProduct",
            vec!["ProductSubcategoryKey".to_string(), "StandardCost".to_string()],
            vec![vec![Scalar::text("14"), cost]],
        )
        .unwrap()
    }

    fn coercion() -> Coercion {
        Coercion::new([
            ("ProductSubcategoryKey".to_string(), ScalarKind::Integer),
            ("StandardCost".to_string(), ScalarKind::FixedPoint { scale: 2 }),
        ])
    }

    #[test]
    fn test_coercion_casts_keys_and_currency() {
        let output = coercion().transform(snapshot(Scalar::Decimal(12.0278))).unwrap();
        assert_eq!(output.get(0, "ProductSubcategoryKey"), Some(&Scalar::Integer(14)));
        assert_eq!(output.get(0, "StandardCost"), Some(&Scalar::text("12.03")));
    }

    #[test]
    fn test_coercion_failure_fails_whole_table() {
        let err = coercion().transform(snapshot(Scalar::text("n/a"))).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
        assert!(err.to_string().contains("StandardCost in row 0"));
    }
}
