use colwire_core::exception::ServerException;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Malformed input. `row` counts from the start of the stream.
    #[error("parse error at row {row}: {source}")]
    Read {
        row: u64,
        #[source]
        source: colwire_io::Error,
    },

    #[error("cannot convert '{text}' at row {row}, column {column} ({name}): {source}")]
    Convert {
        row: u64,
        column: usize,
        name: String,
        text: String,
        #[source]
        source: colwire_core::error::Error,
    },

    /// A native value rejected by the column type on the typed insert path.
    #[error("invalid value at row {row}, column {column} ({name}): {source}")]
    Value {
        row: u64,
        column: usize,
        name: String,
        #[source]
        source: colwire_core::error::Error,
    },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("row count mismatch: {read} rows in, {emitted} rows out")]
    RowCountMismatch { read: u64, emitted: u64 },

    #[error("canceled: {0}")]
    Canceled(String),

    /// Exception packet received from the server mid-stream.
    #[error("server exception: {0}")]
    Upstream(ServerException),

    #[error("write error: {0}")]
    Write(#[source] colwire_io::Error),

    /// Caught worker panic or broken internal invariant.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("downstream receiver disconnected")]
    Disconnected,

    #[error(transparent)]
    Core(#[from] colwire_core::error::Error),

    #[error(transparent)]
    Format(#[from] colwire_io::Error),

    #[error(transparent)]
    Mem(#[from] colwire_mem::Error),
}

impl ExecError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, ExecError::Canceled(_))
    }

    /// Errors a stage reports because another stage stopped first.
    pub fn is_secondary(&self) -> bool {
        matches!(self, ExecError::Canceled(_) | ExecError::Disconnected)
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ExecError::Read { source, .. } => source.suggestions(),
            ExecError::Convert { .. } => vec![
                "Check that the schema column types match the input data".into(),
            ],
            ExecError::SchemaMismatch(_) => {
                vec!["The input must have one value per schema column".into()]
            }
            ExecError::RowCountMismatch { .. } => {
                vec!["This is an integrity failure; please report it".into()]
            }
            ExecError::Canceled(_) => vec![],
            ExecError::Format(e) => e.suggestions(),
            _ => vec![],
        }
    }
}
