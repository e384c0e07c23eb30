use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] colwire_core::error::Error),

    #[error(transparent)]
    Mem(#[from] colwire_mem::Error),

    #[error("expected {expected}, found {}", describe(.found))]
    UnexpectedByte { expected: String, found: u8 },

    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("column {column}: {source}")]
    Element {
        column: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    #[error("format {0} does not support {1}")]
    Unsupported(&'static str, &'static str),

    #[error("other error: {0}")]
    Other(String),
}

fn describe(b: &u8) -> String {
    let b = *b;
    if b.is_ascii_graphic() {
        format!("'{}'", b as char)
    } else {
        format!("byte 0x{b:02x}")
    }
}

impl Error {
    pub(crate) fn unexpected(expected: impl Into<String>, found: u8) -> Self {
        Error::UnexpectedByte {
            expected: expected.into(),
            found,
        }
    }

    /// Tag with the column the failing element belonged to.
    pub fn at_column(self, column: usize) -> Self {
        Error::Element {
            column,
            source: Box::new(self),
        }
    }

    /// Tag with the row index (within the current read) that failed.
    pub fn at_row(self, row: usize) -> Self {
        Error::Row {
            row,
            source: Box::new(self),
        }
    }

    /// Split off the row tag added by `at_row`.
    pub fn split_row(self) -> (Option<usize>, Error) {
        match self {
            Error::Row { row, source } => (Some(row), *source),
            other => (None, other),
        }
    }

    /// The innermost error, with row/column tags peeled off.
    pub fn root(&self) -> &Error {
        match self {
            Error::Element { source, .. } | Error::Row { source, .. } => source.root(),
            other => other,
        }
    }

    /// Column index recorded on this error, if any.
    pub fn column(&self) -> Option<usize> {
        match self {
            Error::Element { column, .. } => Some(*column),
            Error::Row { source, .. } => source.column(),
            _ => None,
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self.root() {
            Error::UnexpectedByte { .. } => vec![
                "Check that the delimiter setting matches the input".into(),
                "Check for unbalanced quotes in the failing row".into(),
            ],
            Error::UnknownColumn(_) => {
                vec!["JSON keys must match column names of the sample schema".into()]
            }
            Error::UnknownFormat(_) => {
                vec!["Supported formats: CSV, CSVWithNames, Values, JSON, Pretty".into()]
            }
            _ => vec![],
        }
    }
}
