//! Warehouse ETL
//!
//! A staged ETL tool that moves AdventureWorks dimension tables from SQL
//! Server into PostgreSQL, reshaping them with per-table rules and
//! denormalizing the product hierarchy.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod etl;
pub mod schema;
pub mod table;
pub mod transform;

// Re-exports for convenience
pub use client::{ConnectionTarget, Connector, Engine, SourceCatalog, TableSink};
pub use error::{ErrorKind, EtlError};
pub use etl::{
    Extractor, Loader, Pipeline, PipelineOptions, RetryPolicy, RunVerdict, Transformer,
};
pub use schema::{SchemaRules, TransformRule};
pub use table::{Scalar, ScalarKind, TableSnapshot};
