//! Database connectors
//!
//! A [`Connector`] opens a handle to a [`ConnectionTarget`]; it never retries,
//! that is the pipeline's job. Source handles implement [`SourceCatalog`],
//! destination handles implement [`TableSink`]. Handles are released when
//! dropped.

mod mssql;
mod postgres;
mod target;

pub use mssql::{MssqlConnector, MssqlSource};
pub use postgres::{PostgresConnector, PostgresSink};
pub use target::{ConnectionTarget, Engine};

use crate::error::Result;
use crate::table::TableSnapshot;
use std::future::Future;

/// Opens connection handles to one configured target
pub trait Connector: Send + Sync {
    /// Live connection owned by the caller
    type Handle: Send + Sync;

    /// Human-readable target description, without credentials
    fn describe(&self) -> String;

    /// Establish a connection
    ///
    /// # Errors
    /// Returns [`crate::EtlError::Connection`] on refusal, DNS or auth failure
    fn connect(&self) -> impl Future<Output = Result<Self::Handle>> + Send;
}

/// Read access to a source database
pub trait SourceCatalog: Send + Sync {
    /// Names from `candidates` that exist in the source catalog
    fn list_tables(&self, candidates: &[String]) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Full, unordered contents of `table`
    fn fetch_table(&self, table: &str) -> impl Future<Output = Result<TableSnapshot>> + Send;
}

/// Write access to a destination database
pub trait TableSink: Send + Sync {
    /// Drop `table` if it exists and recreate it with `snapshot`'s contents
    ///
    /// Returns the number of rows written.
    fn replace_table(
        &self,
        table: &str,
        snapshot: &TableSnapshot,
    ) -> impl Future<Output = Result<usize>> + Send;
}
