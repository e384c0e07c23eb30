use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown type name: {0}")]
    UnknownType(String),

    /// Text that does not parse as the column's semantic type.
    #[error("cannot parse '{text}' as {data_type}: {reason}")]
    Parse {
        text: String,
        data_type: String,
        reason: String,
    },

    /// Native value that cannot be stored in the column's semantic type.
    #[error("cannot store {value} in a column of type {data_type}")]
    TypeMismatch { value: String, data_type: String },

    #[error("Internal invariant failed: {0}")]
    Invariant(String),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub(crate) fn parse(
        text: impl Into<String>,
        data_type: &crate::schema::DataType,
        reason: impl Into<String>,
    ) -> Self {
        Error::Parse {
            text: text.into(),
            data_type: data_type.to_string(),
            reason: reason.into(),
        }
    }

    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use colwire_core::error::Error;
    /// let err = Error::Schema("unknown column".into());
    /// let err = err.with_context("while reading JSON row");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self) as Box<dyn std::error::Error + Send + Sync>,
        }
    }

    /// Get suggestions for common errors (e.g., column name suggestions).
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Schema(msg) => {
                if msg.contains("unknown column") || msg.contains("column") {
                    vec![
                        "Check that the column name is spelled correctly".into(),
                        "Verify the column exists in the sample schema".into(),
                    ]
                } else {
                    vec![]
                }
            }
            Error::Config(msg) => {
                if msg.contains("delimiter") {
                    vec![
                        "Use a single character such as ',' or '|'".into(),
                        "Escape control characters with a backslash, e.g. '\\t'".into(),
                    ]
                } else {
                    vec![]
                }
            }
            Error::UnknownType(_) => {
                vec!["Type names are case-sensitive, e.g. 'Int32' or 'Nullable(String)'".into()]
            }
            _ => vec![],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
