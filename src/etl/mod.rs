//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the trait definitions for each step, their table
//! implementations, the retry envelope and the [`Pipeline`] that runs the
//! six phases in order.

mod extract;
mod load;
mod merge;
mod pipeline;
mod retry;
mod transform;

pub use extract::{Extractor, TableExtractor};
pub use load::{Loader, RAW_PREFIX, STAGED_PREFIX, TableLoader};
pub use merge::{Merger, inner_join, merge};
pub use pipeline::{
    LoadedTable, Phase, PhaseFailure, PhaseReport, Pipeline, PipelineOptions, RunVerdict,
};
pub use retry::{RetryOutcome, RetryPolicy, with_retry};
pub use transform::{SchemaTransformer, Transformer};
