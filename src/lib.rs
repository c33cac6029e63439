//! Line-oriented CSV reading with positional field selection and
//! name mapping on top of the `csv` crate.

pub mod records;
pub mod splitter;

pub use records::{CsvReader, FailureHook, LogAndContinue, ReaderConfig, Record, NULL_FIELD};
pub use splitter::{CsvSplitter, SplitterOptions};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The input file could not be opened or read
    #[error("Failed to read file '{path}': {source}")]
    FileAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Splitter options rejected at construction
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The splitter could not turn a line into fields
    #[error("Failed to parse line {line}: {message}")]
    LineParse {
        line: usize,
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// A wanted field index past the end of the parsed record
    #[error("Field index {index} out of range on line {line} ({len} fields)")]
    FieldIndex { line: usize, index: usize, len: usize },

    /// A failure hook stopped the read
    #[error("Read interrupted: {reason}")]
    Interrupted { reason: String },
}

impl Error {
    pub fn file_access(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn line_parse(line: usize, message: impl Into<String>, source: Option<csv::Error>) -> Self {
        Self::LineParse {
            line,
            message: message.into(),
            source,
        }
    }

    pub fn field_index(line: usize, index: usize, len: usize) -> Self {
        Self::FieldIndex { line, index, len }
    }

    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// Per-line failures are the ones routed through a `FailureHook`.
    pub fn is_line_error(&self) -> bool {
        matches!(self, Self::LineParse { .. } | Self::FieldIndex { .. })
    }
}
