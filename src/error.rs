//! Classified pipeline errors
//!
//! Every phase of the pipeline fails with an [`EtlError`]. The retry envelope
//! inspects [`EtlError::kind`] to decide whether another attempt is worthwhile.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result alias used by the library
pub type Result<T> = std::result::Result<T, EtlError>;

/// Error taxonomy shared by all phases
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EtlError {
    /// Network, DNS or authentication failure while opening a handle
    #[error("connection error ({target}): {message}")]
    Connection { target: String, message: String },

    /// Catalog lookup or table read failure
    #[error("query error: {message}")]
    Query { message: String },

    /// Projection, coercion or join violated the expected table shape
    #[error("schema error in {table}: {message}")]
    Schema { table: String, message: String },

    /// Destination write failure
    #[error("write error for {table}: {message}")]
    Write { table: String, message: String },

    /// A single attempt did not finish within the configured timeout
    #[error("{phase} attempt timed out after {}s", .after.as_secs_f64())]
    Timeout { phase: String, after: Duration },
}

/// Error classification without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Connection,
    Query,
    Schema,
    Write,
    Timeout,
}

impl EtlError {
    pub fn connection(target: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Connection {
            target: target.to_string(),
            message: err.to_string(),
        }
    }

    pub fn query(err: impl std::fmt::Display) -> Self {
        Self::Query {
            message: err.to_string(),
        }
    }

    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn write(table: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Write {
            table: table.into(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Query { .. } => ErrorKind::Query,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Write { .. } => ErrorKind::Write,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            EtlError::connection("postgres", "refused").kind(),
            ErrorKind::Connection
        );
        assert_eq!(EtlError::query("bad sql").kind(), ErrorKind::Query);
        assert_eq!(
            EtlError::schema("DimProduct", "missing column").kind(),
            ErrorKind::Schema
        );
        assert_eq!(
            EtlError::write("stg_DimProduct", "disk full").kind(),
            ErrorKind::Write
        );
    }

    #[test]
    fn test_display_includes_context() {
        let err = EtlError::schema("DimProduct", "column 'Color' not found");
        assert_eq!(
            err.to_string(),
            "schema error in DimProduct: column 'Color' not found"
        );

        let err = EtlError::Timeout {
            phase: "extract".to_string(),
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "extract attempt timed out after 1.5s");
    }
}
