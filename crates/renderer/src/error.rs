use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("{portfolio} has {actual} weights for {expected} tickers")]
    SchemaMismatch {
        portfolio: String,
        expected: usize,
        actual: usize,
    },

    #[error("{field} is not a finite number: {value}")]
    NonFiniteValue { field: String, value: f64 },

    #[error("{field} is too large to display as a percentage: {value}")]
    OutOfRange { field: String, value: f64 },
}
