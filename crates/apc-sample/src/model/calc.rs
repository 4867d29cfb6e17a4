use serde::Deserialize;

use crate::error::DemoError;

/// An operation applied to the calculator's running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcOp {
    Add(i64),
    Sub(i64),
    Mul(i64),
    Div(i64),
    /// Reads the total without changing it.
    Total,
}

/// A list of operations applied in order by the batcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch(pub Vec<CalcOp>);

#[derive(Deserialize)]
struct BatchFile {
    ops: Vec<CalcOp>,
}

impl Batch {
    /// Parses a batch written as
    ///
    /// ```toml
    /// ops = [{ add = 2 }, { mul = 3 }, "total"]
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, DemoError> {
        let file: BatchFile = toml::from_str(content).map_err(|e| DemoError::InvalidInput(e.to_string()))?;
        Ok(Self(file.ops))
    }
}
