use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The persistence adapter could not be opened or is closed.
    AdapterUnavailable,
    /// An adapter transaction aborted before completing.
    TransactionFailed,
    /// The tokenize stage received something other than one seed token.
    InvalidPipelineInput,
    /// Varint overflow, truncated buffer, or malformed JSON payload.
    Codec,
    /// Invalid construction argument (e.g. zero cache capacity).
    InputRejected,
    /// Per-document failure captured on the bulk recovery path.
    DocumentProcessing,
    Io,
    Serde,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error {
            kind,
            context: context.into(),
        }
    }

    pub fn codec(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Codec, context)
    }

    pub fn adapter(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::AdapterUnavailable, context)
    }

    pub fn transaction(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::TransactionFailed, context)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Serde,
            context: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
