//! Table transformation steps
//!
//! Each step is a [`crate::etl::Transformer`] over [`crate::table::TableSnapshot`].
//! [`crate::schema::TransformRule::apply`] chains them in the fixed order
//! projection → null fill → rename → coercion.

mod coercion;
mod null_fill;
mod projection;
mod rename;

pub use coercion::Coercion;
pub use null_fill::NullFill;
pub use projection::Projection;
pub use rename::Rename;
