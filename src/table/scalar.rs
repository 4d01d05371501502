//! Loosely typed cell values
//!
//! Source rows arrive with per-cell dynamic types. [`Scalar`] is the tagged
//! variant carried through every phase; coercions between variants are
//! explicit and fallible.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

/// Target kind for a coercion
///
/// Written as `integer` or `decimal(<scale>)` in rule files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScalarKind {
    /// Whole number, stored as [`Scalar::Integer`]
    Integer,
    /// Decimal text with a fixed number of fractional digits, e.g. `"12.50"`
    FixedPoint { scale: u8 },
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::FixedPoint { scale } => write!(f, "decimal({})", scale),
        }
    }
}

impl FromStr for ScalarKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "integer" || s == "int" {
            return Ok(Self::Integer);
        }
        s.strip_prefix("decimal(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|scale| scale.trim().parse::<u8>().ok())
            .map(|scale| Self::FixedPoint { scale })
            .ok_or_else(|| format!("unknown coercion '{}', expected integer or decimal(<scale>)", s))
    }
}

impl TryFrom<String> for ScalarKind {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScalarKind> for String {
    fn from(kind: ScalarKind) -> Self {
        kind.to_string()
    }
}

impl Scalar {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Canonical join-key form; `None` for nulls, which never match
    ///
    /// Integers, decimals and numeric text with the same value share a key,
    /// so `Integer(3)`, `Decimal(3.0)`, `Text("3")` and `Text("3.0")` join
    /// together, as do `Decimal(2.5)` and `Text("2.50")`.
    pub fn join_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Boolean(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Decimal(d) => Some(decimal_key(*d)),
            Self::Text(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Some(i.to_string());
                }
                match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() => Some(decimal_key(f)),
                    _ => Some(trimmed.to_string()),
                }
            }
        }
    }

    /// Convert to the requested kind
    ///
    /// Nulls stay null. The error string describes the offending value and
    /// is wrapped into a schema error by the caller.
    pub fn coerce(&self, kind: ScalarKind) -> std::result::Result<Scalar, String> {
        match kind {
            ScalarKind::Integer => self.to_integer().map(|v| v.map_or(Scalar::Null, Scalar::Integer)),
            ScalarKind::FixedPoint { scale } => self
                .to_float()
                .map(|v| v.map_or(Scalar::Null, |f| Scalar::Text(format!("{:.*}", scale as usize, f)))),
        }
    }

    fn to_integer(&self) -> std::result::Result<Option<i64>, String> {
        match self {
            Self::Null => Ok(None),
            Self::Boolean(b) => Ok(Some(*b as i64)),
            Self::Integer(i) => Ok(Some(*i)),
            Self::Decimal(d) => whole_i64(*d).map(Some),
            Self::Text(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(Some(i));
                }
                match trimmed.parse::<f64>() {
                    Ok(f) => whole_i64(f).map(Some),
                    Err(_) => Err(format!("'{}' is not an integer", s)),
                }
            }
        }
    }

    fn to_float(&self) -> std::result::Result<Option<f64>, String> {
        match self {
            Self::Null => Ok(None),
            Self::Integer(i) => Ok(Some(*i as f64)),
            Self::Decimal(d) if d.is_finite() => Ok(Some(*d)),
            Self::Decimal(d) => Err(format!("{} is not a finite number", d)),
            Self::Text(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Some(f)),
                _ => Err(format!("'{}' is not numeric", s)),
            },
            Self::Boolean(b) => Err(format!("boolean {} is not numeric", b)),
        }
    }
}

/// `f` as an `i64` when it is a whole number inside the `i64` range
fn whole_i64(f: f64) -> std::result::Result<i64, String> {
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    const LIMIT: f64 = i64::MAX as f64;
    if !f.is_finite() || f.fract() != 0.0 {
        return Err(format!("{} is not a whole number", f));
    }
    if f < -LIMIT || f >= LIMIT {
        return Err(format!("{} is outside the 64-bit integer range", f));
    }
    Ok(f as i64)
}

fn decimal_key(d: f64) -> String {
    match whole_i64(d) {
        Ok(i) => i.to_string(),
        Err(_) => d.to_string(),
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}
