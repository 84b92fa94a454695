use std::{fmt, io};

/// Crate-wide `Result` type using [`MogError`] as the error.
pub type Result<T> = std::result::Result<T, MogError>;

/// Top-level error type for mog operations.
#[derive(Debug)]
pub enum MogError {
    /// A single-record lookup (`find_one`, `find_by_id`) matched nothing.
    NotFound,

    /// Iteration over an open result stream stopped on an error.
    ///
    /// The same error is held by the session and can be polled with
    /// `Session::iter_err` after the loop.
    Iteration(IterError),

    /// A request was rejected before reaching the store.
    Validation(String),

    /// The facade was used out of order (e.g. writing CSV before starting output).
    State(String),

    /// MongoDB driver errors, passed through unchanged.
    MongoDb(mongodb::error::Error),

    /// A caller value could not be converted into a BSON document.
    Serialize(bson::ser::Error),

    /// CSV transfer errors.
    Csv(CsvError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// The session's cancellation token fired while a request was in flight.
    Cancelled,
}

/// Why an open result stream stopped yielding records.
#[derive(Debug, Clone)]
pub enum IterError {
    /// The underlying cursor reported an error while fetching.
    Cursor(mongodb::error::Error),

    /// A fetched record could not be decoded into the caller's type.
    Decode(bson::de::Error),
}

/// CSV-specific errors.
#[derive(Debug)]
pub enum CsvError {
    /// The parent directory of an output path does not exist.
    MissingDirectory(String),

    /// A quoted field was still open at end of input.
    Unterminated { line: usize },

    /// The first record did not match the expected header.
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

impl MogError {
    /// True for the distinguished "no documents" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MogError::NotFound)
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for MogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MogError::NotFound => write!(f, "no documents in result"),
            MogError::Iteration(e) => write!(f, "Iteration error: {e}"),
            MogError::Validation(msg) => write!(f, "Validation error: {msg}"),
            MogError::State(msg) => write!(f, "Invalid state: {msg}"),
            MogError::MongoDb(e) => write!(f, "{e}"),
            MogError::Serialize(e) => write!(f, "Serialization error: {e}"),
            MogError::Csv(e) => write!(f, "CSV error: {e}"),
            MogError::Config(e) => write!(f, "Configuration error: {e}"),
            MogError::Io(e) => write!(f, "I/O error: {e}"),
            MogError::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl fmt::Display for IterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IterError::Cursor(e) => write!(f, "cursor failed: {e}"),
            IterError::Decode(e) => write!(f, "decode failed: {e}"),
        }
    }
}

impl fmt::Display for CsvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvError::MissingDirectory(dir) => write!(f, "Directory does not exist: {dir}"),
            CsvError::Unterminated { line } => {
                write!(f, "Unterminated quoted field starting on line {line}")
            }
            CsvError::HeaderMismatch { expected, found } => write!(
                f,
                "Header mismatch: expected [{}], found [{}]",
                expected.join(","),
                found.join(",")
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for MogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MogError::Iteration(e) => Some(e),
            MogError::MongoDb(e) => Some(e),
            MogError::Serialize(e) => Some(e),
            MogError::Io(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for IterError {}
impl std::error::Error for CsvError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to MogError ========================= */

impl From<io::Error> for MogError {
    fn from(err: io::Error) -> Self {
        MogError::Io(err)
    }
}

impl From<mongodb::error::Error> for MogError {
    fn from(err: mongodb::error::Error) -> Self {
        MogError::MongoDb(err)
    }
}

impl From<bson::ser::Error> for MogError {
    fn from(err: bson::ser::Error) -> Self {
        MogError::Serialize(err)
    }
}

impl From<IterError> for MogError {
    fn from(err: IterError) -> Self {
        MogError::Iteration(err)
    }
}

impl From<CsvError> for MogError {
    fn from(err: CsvError) -> Self {
        MogError::Csv(err)
    }
}

impl From<ConfigError> for MogError {
    fn from(err: ConfigError) -> Self {
        MogError::Config(err)
    }
}
