//! Extraction from the source database

use crate::client::SourceCatalog;
use crate::error::Result;
use crate::table::TableSnapshot;
use owo_colors::OwoColorize;

/// Extractor trait for extracting data from a source
///
/// # Example
/// ```no_run
/// use dw_etl::etl::Extractor;
/// use dw_etl::error::Result;
///
/// struct Fixed(Vec<String>);
///
/// impl Extractor for Fixed {
///     type Item = String;
///
///     async fn extract(&self) -> Result<Vec<Self::Item>> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// The type of items extracted
    type Item: Send;

    /// Extract items from the source
    ///
    /// # Errors
    /// Returns an error if extraction fails (network, catalog, decoding)
    fn extract(&self) -> impl std::future::Future<Output = Result<Vec<Self::Item>>> + Send;
}

/// Pulls every allow-listed table that exists at the source as a full snapshot
pub struct TableExtractor<'a, S> {
    source: &'a S,
    candidates: Vec<String>,
}

impl<'a, S: SourceCatalog> TableExtractor<'a, S> {
    /// Create an extractor over an open source handle
    ///
    /// # Arguments
    /// * `source` - Open source connection
    /// * `candidates` - Allow-list of table names of interest
    pub fn new(source: &'a S, candidates: &[String]) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(candidates.len());
        for name in candidates {
            if !unique.contains(name) {
                unique.push(name.clone());
            }
        }
        Self {
            source,
            candidates: unique,
        }
    }

    /// Intersect the allow-list with the source catalog
    ///
    /// Tables missing at the source are skipped, not reported as errors.
    /// The result follows allow-list order.
    pub async fn discover_tables(&self) -> Result<Vec<String>> {
        let found = self.source.list_tables(&self.candidates).await?;
        let matched: Vec<String> = self
            .candidates
            .iter()
            .filter(|c| found.contains(c))
            .cloned()
            .collect();

        for skipped in self.candidates.iter().filter(|c| !matched.contains(c)) {
            log::debug!("Table {} not present at source, skipping", skipped);
        }
        log::info!(
            "Discovered {} of {} candidate table(s)",
            matched.len().cyan(),
            self.candidates.len()
        );

        Ok(matched)
    }

    /// Pull the full contents of one table
    pub async fn extract_table(&self, table: &str) -> Result<TableSnapshot> {
        let snapshot = self.source.fetch_table(table).await?;
        log::info!(
            "Extracted {} row(s) from {}",
            snapshot.len().cyan(),
            table.bright_black()
        );
        Ok(snapshot)
    }
}

impl<S: SourceCatalog> Extractor for TableExtractor<'_, S> {
    type Item = TableSnapshot;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        let tables = self.discover_tables().await?;

        let mut snapshots = Vec::with_capacity(tables.len());
        for table in &tables {
            snapshots.push(self.extract_table(table).await?);
        }

        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::table::Scalar;

    struct FakeSource {
        tables: Vec<TableSnapshot>,
    }

    impl SourceCatalog for FakeSource {
        async fn list_tables(&self, candidates: &[String]) -> Result<Vec<String>> {
            // Catalog order deliberately differs from the allow-list
            Ok(self
                .tables
                .iter()
                .rev()
                .map(|t| t.name().to_string())
                .filter(|n| candidates.contains(n))
                .collect())
        }

        async fn fetch_table(&self, table: &str) -> Result<TableSnapshot> {
            self.tables
                .iter()
                .find(|t| t.name() == table)
                .cloned()
                .ok_or_else(|| EtlError::query(format!("Invalid object name '{}'", table)))
        }
    }

    fn source() -> FakeSource {
        let one = TableSnapshot::with_rows(
            "DimProductCategory",
            vec!["ProductCategoryKey".to_string()],
            vec![vec![Scalar::Integer(1)]],
        )
        .unwrap();
        let two = TableSnapshot::new("DimProduct", vec!["ProductKey".to_string()]);
        let other = TableSnapshot::new("DimCustomer", vec!["CustomerKey".to_string()]);
        FakeSource {
            tables: vec![one, two, other],
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_discover_skips_missing_and_keeps_allow_list_order() {
        let source = source();
        let extractor = TableExtractor::new(
            &source,
            &names(&["DimProduct", "DimProductSubcategory", "DimProductCategory", "DimProduct"]),
        );

        let found = extractor.discover_tables().await.unwrap();
        assert_eq!(found, names(&["DimProduct", "DimProductCategory"]));
    }

    #[tokio::test]
    async fn test_extract_pulls_each_discovered_table() {
        let source = source();
        let extractor =
            TableExtractor::new(&source, &names(&["DimProduct", "DimProductCategory"]));

        let snapshots = extractor.extract().await.unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].name(), "DimProductCategory");
        assert_eq!(snapshots[1].len(), 1);
    }
}
