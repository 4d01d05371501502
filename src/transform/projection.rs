//! Column projection

use crate::error::{EtlError, Result};
use crate::etl::Transformer;
use crate::table::TableSnapshot;

/// Keeps only the listed columns, in the listed order
///
/// # Example
/// ```
/// use dw_etl::etl::Transformer;
/// use dw_etl::table::{Scalar, TableSnapshot};
/// use dw_etl::transform::Projection;
///
/// let keep = vec!["ProductKey".to_string()];
/// let input = TableSnapshot::with_rows(
///     "DimProduct",
///     vec!["ProductKey".to_string(), "LargePhoto".to_string()],
///     vec![vec![Scalar::Integer(1), Scalar::Null]],
/// ).unwrap();
///
/// let output = Projection::new(&keep).transform(input).unwrap();
/// assert_eq!(output.columns(), &keep[..]);
/// ```
pub struct Projection<'a> {
    columns: &'a [String],
}

impl<'a> Projection<'a> {
    pub fn new(columns: &'a [String]) -> Self {
        Self { columns }
    }
}

impl Transformer for Projection<'_> {
    type Input = TableSnapshot;
    type Output = TableSnapshot;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        let indices = self
            .columns
            .iter()
            .map(|c| {
                input.column_index(c).ok_or_else(|| {
                    EtlError::schema(input.name(), format!("retained column '{}' not found", c))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let (name, _, rows) = input.into_parts();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                indices
                    .iter()
                    .map(|&i| std::mem::take(&mut row[i]))
                    .collect()
            })
            .collect();

        Ok(TableSnapshot::from_parts_unchecked(
            name,
            self.columns.to_vec(),
            rows,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Scalar;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_projection_reorders_and_drops() {
        let input = TableSnapshot::with_rows(
            "DimProductSubcategory",
            strings(&["a", "b", "c"]),
            vec![vec![Scalar::Integer(1), Scalar::Integer(2), Scalar::Integer(3)]],
        )
        .unwrap();
        let keep = strings(&["c", "a"]);

        let output = Projection::new(&keep).transform(input).unwrap();
        assert_eq!(output.columns(), &keep[..]);
        assert_eq!(output.rows()[0], vec![Scalar::Integer(3), Scalar::Integer(1)]);
        assert_eq!(output.name(), "DimProductSubcategory");
    }

    #[test]
    fn test_projection_fails_on_missing_column() {
        let input = TableSnapshot::new("DimProduct", strings(&["ProductKey"]));
        let keep = strings(&["ProductKey", "Color"]);

        let err = Projection::new(&keep).transform(input).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
        assert!(err.to_string().contains("'Color'"));
    }
}
