//! Tabular data model
//!
//! [`TableSnapshot`] holds an extracted or transformed table in memory;
//! [`Scalar`] is the cell type.

mod scalar;
mod snapshot;

pub use scalar::{Scalar, ScalarKind};
pub use snapshot::TableSnapshot;
