//! Loading snapshots into the destination database

use crate::client::TableSink;
use crate::error::Result;
use crate::table::TableSnapshot;
use owo_colors::OwoColorize;

/// Prefix of per-table staged output
pub const STAGED_PREFIX: &str = "stg_";

/// Prefix of untransformed raw copies
pub const RAW_PREFIX: &str = "src_";

/// Loader trait for loading data to a destination
///
/// # Example
/// ```no_run
/// use dw_etl::etl::Loader;
/// use dw_etl::error::Result;
///
/// struct Counter;
///
/// impl Loader for Counter {
///     type Item = String;
///
///     async fn load(&self, items: &[Self::Item]) -> Result<usize> {
///         Ok(items.len())
///     }
/// }
/// ```
pub trait Loader: Send + Sync {
    /// The type of items to load
    type Item: Send + Sync;

    /// Load items to the destination
    ///
    /// Returns the number of rows successfully written
    ///
    /// # Errors
    /// Returns an error if writing fails
    fn load(&self, items: &[Self::Item]) -> impl std::future::Future<Output = Result<usize>> + Send;
}

/// Writes snapshots as destructive full-table replacements
///
/// Each snapshot lands in `<prefix><table name>`.
pub struct TableLoader<'a, D> {
    sink: &'a D,
    prefix: String,
}

impl<'a, D: TableSink> TableLoader<'a, D> {
    /// Loader writing `stg_<Name>` tables
    pub fn staged(sink: &'a D) -> Self {
        Self::with_prefix(sink, STAGED_PREFIX)
    }

    /// Loader writing `src_<Name>` tables
    pub fn raw(sink: &'a D) -> Self {
        Self::with_prefix(sink, RAW_PREFIX)
    }

    pub fn with_prefix(sink: &'a D, prefix: impl Into<String>) -> Self {
        Self {
            sink,
            prefix: prefix.into(),
        }
    }

    pub fn target_name(&self, table: &str) -> String {
        format!("{}{}", self.prefix, table)
    }

    /// Replace `target` with the contents of `snapshot`
    ///
    /// Writing zero rows is a success.
    pub async fn load_as(&self, snapshot: &TableSnapshot, target: &str) -> Result<usize> {
        log::info!(
            "Importing rows 0 to {} for table {}",
            snapshot.len().cyan(),
            target.bright_black()
        );
        let written = self.sink.replace_table(target, snapshot).await?;
        log::info!("Done. Imported {} row(s) into {}", written.cyan(), target);
        Ok(written)
    }
}

impl<D: TableSink> Loader for TableLoader<'_, D> {
    type Item = TableSnapshot;

    async fn load(&self, items: &[Self::Item]) -> Result<usize> {
        let mut total = 0;
        for snapshot in items {
            let target = self.target_name(snapshot.name());
            total += self.load_as(snapshot, &target).await?;
        }
        Ok(total)
    }
}
