use thiserror::Error;

/// Result type local to colwire-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("row has {found} elements but {expected} columns were expected")]
    ColumnCount { expected: usize, found: usize },

    #[error("duplicate value for column {0} in one row")]
    DuplicateColumn(usize),

    #[error("column index {index} out of range for {columns} columns")]
    ColumnOutOfRange { index: usize, columns: usize },

    #[error("arena error: {0}")]
    Arena(String),
}

impl Error {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match self {
            Error::ColumnCount { expected, found } => Error::Arena(format!(
                "{ctx}: row has {found} elements but {expected} columns were expected"
            )),
            Error::Arena(msg) => Error::Arena(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::ColumnCount { expected, found } => vec![
                format!("Input rows carry {found} values but the sample block has {expected} columns"),
                "Check the delimiter setting and the sample schema".into(),
            ],
            Error::DuplicateColumn(_) => {
                vec!["Each JSON row object must name a column at most once".into()]
            }
            _ => vec![],
        }
    }
}
