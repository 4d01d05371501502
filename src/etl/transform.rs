//! Transformer trait and the rule-driven table transformer

use crate::error::Result;
use crate::schema::SchemaRules;
use crate::table::TableSnapshot;
use owo_colors::OwoColorize;

/// Transformer trait for transforming data items
///
/// Implementors define one step of reshaping a table:
/// - Column projection
/// - Null filling
/// - Renaming
/// - Type coercion
///
/// # Example
/// ```
/// use dw_etl::etl::Transformer;
/// use dw_etl::error::Result;
/// use dw_etl::table::TableSnapshot;
///
/// struct Prefix(&'static str);
///
/// impl Transformer for Prefix {
///     type Input = TableSnapshot;
///     type Output = TableSnapshot;
///
///     fn transform(&self, input: Self::Input) -> Result<Self::Output> {
///         let name = format!("{}{}", self.0, input.name());
///         Ok(input.renamed(name))
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Input item type
    type Input: Send;

    /// Output item type after transformation
    type Output: Send;

    /// Transform a single item
    ///
    /// # Errors
    /// Returns an error if the item does not have the expected shape
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;

    /// Transform multiple items (default batch implementation)
    fn transform_many(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        inputs.into_iter().map(|i| self.transform(i)).collect()
    }
}

/// Applies the matching [`crate::schema::TransformRule`] to each snapshot
///
/// Tables without a rule pass through unchanged.
pub struct SchemaTransformer<'a> {
    rules: &'a SchemaRules,
}

impl<'a> SchemaTransformer<'a> {
    pub fn new(rules: &'a SchemaRules) -> Self {
        Self { rules }
    }
}

impl Transformer for SchemaTransformer<'_> {
    type Input = TableSnapshot;
    type Output = TableSnapshot;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        match self.rules.get(input.name()) {
            Some(rule) => {
                let output = rule.apply(input)?;
                log::info!(
                    "Transformed {} ({} column(s), {} row(s))",
                    output.name().bright_black(),
                    output.columns().len(),
                    output.len().cyan()
                );
                Ok(output)
            }
            None => {
                log::debug!("No rule for {}, passing through", input.name());
                Ok(input)
            }
        }
    }
}
