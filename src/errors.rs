use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for ferrite operations.
///
/// Each kind describes a category of failure surfaced by the document
/// algebra, the catalog, or the engine, enabling precise error handling
/// at call sites.
///
/// # Examples
///
/// ```rust,ignore
/// use ferrite::errors::{FerriteError, ErrorKind, FerriteResult};
///
/// fn example() -> FerriteResult<()> {
///     Err(FerriteError::new("missing index \"a_1\"", ErrorKind::IndexNotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Invalid or empty path segment, or an attempt to traverse a scalar
    InvalidPath,
    /// Operator argument shape wrong, or a numeric operand is non-numeric
    InvalidDataType,
    /// Attempted mutation of the immutable `_id` field
    ImmutableField,
    /// The same document handle was inserted twice
    DuplicateDocument,
    /// A unique index rejected a document
    UniqueConstraintViolation,
    /// Unknown `$` operator or malformed operator document
    OperatorError,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Namespace does not exist
    NamespaceNotFound,
    /// Index does not exist
    IndexNotFound,
    /// Error surfaced from a store backend
    StoreError,
    /// Generic IO error
    IOError,
    /// Error encoding or decoding a snapshot
    EncodingError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidPath => write!(f, "Invalid path"),
            ErrorKind::InvalidDataType => write!(f, "Invalid data type"),
            ErrorKind::ImmutableField => write!(f, "Immutable field"),
            ErrorKind::DuplicateDocument => write!(f, "Duplicate document"),
            ErrorKind::UniqueConstraintViolation => write!(f, "Unique constraint violation"),
            ErrorKind::OperatorError => write!(f, "Operator error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::NamespaceNotFound => write!(f, "Namespace not found"),
            ErrorKind::IndexNotFound => write!(f, "Index not found"),
            ErrorKind::StoreError => write!(f, "Store error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom ferrite error type.
///
/// `FerriteError` encapsulates the error message, kind, and an optional
/// cause. It supports error chaining and backtraces for debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use ferrite::errors::{FerriteError, ErrorKind};
///
/// // Create a simple error
/// let err = FerriteError::new("missing namespace \"db.c\"", ErrorKind::NamespaceNotFound);
///
/// // Create an error with a cause
/// let cause = FerriteError::new("disk failed", ErrorKind::IOError);
/// let err = FerriteError::new_with_cause("cannot persist snapshot", ErrorKind::StoreError, cause);
/// ```
#[derive(Clone)]
pub struct FerriteError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<FerriteError>>,
    backtrace: Arc<Backtrace>,
}

impl FerriteError {
    /// Creates a new `FerriteError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        FerriteError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `FerriteError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: FerriteError) -> Self {
        FerriteError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&FerriteError> {
        self.cause.as_deref()
    }
}

impl Display for FerriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for FerriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for FerriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for ferrite operations.
///
/// `FerriteResult<T>` is shorthand for `Result<T, FerriteError>`. All
/// fallible ferrite operations return this type.
pub type FerriteResult<T> = Result<T, FerriteError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for FerriteError {
    fn from(err: std::io::Error) -> Self {
        FerriteError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<std::num::ParseIntError> for FerriteError {
    fn from(err: std::num::ParseIntError) -> Self {
        FerriteError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}

impl From<String> for FerriteError {
    fn from(msg: String) -> Self {
        FerriteError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for FerriteError {
    fn from(msg: &str) -> Self {
        FerriteError::new(msg, ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ferrite_error_new_creates_error() {
        let error = FerriteError::new("an error occurred", ErrorKind::IOError);
        assert_eq!(error.message(), "an error occurred");
        assert_eq!(error.kind(), &ErrorKind::IOError);
        assert!(error.cause().is_none());
    }

    #[test]
    fn ferrite_error_with_cause_chains() {
        let cause = FerriteError::new("disk failed", ErrorKind::IOError);
        let error =
            FerriteError::new_with_cause("cannot persist snapshot", ErrorKind::StoreError, cause);
        assert_eq!(error.kind(), &ErrorKind::StoreError);
        assert!(error.cause().is_some());
        assert_eq!(error.cause().unwrap().kind(), &ErrorKind::IOError);
        assert!(error.source().is_some());
    }

    #[test]
    fn ferrite_error_display_formats_correctly() {
        let error = FerriteError::new("an error occurred", ErrorKind::IOError);
        assert_eq!(format!("{}", error), "an error occurred");
    }

    #[test]
    fn ferrite_error_debug_formats_with_cause() {
        let cause = FerriteError::new("disk failed", ErrorKind::IOError);
        let error =
            FerriteError::new_with_cause("cannot persist snapshot", ErrorKind::StoreError, cause);
        let formatted = format!("{:?}", error);
        assert!(formatted.contains("cannot persist snapshot"));
        assert!(formatted.contains("Caused by:"));
    }

    #[test]
    fn error_kind_equality() {
        let error1 = FerriteError::new("error 1", ErrorKind::IndexNotFound);
        let error2 = FerriteError::new("error 2", ErrorKind::IndexNotFound);
        let error3 = FerriteError::new("error 3", ErrorKind::NamespaceNotFound);
        assert_eq!(error1.kind(), error2.kind());
        assert_ne!(error1.kind(), error3.kind());
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FerriteError = io_err.into();
        assert_eq!(err.kind(), &ErrorKind::IOError);
        assert!(err.message().contains("IO error"));
    }

    #[test]
    fn from_parse_int_error() {
        let parse_err = "not_a_number".parse::<i64>().unwrap_err();
        let err: FerriteError = parse_err.into();
        assert_eq!(err.kind(), &ErrorKind::InvalidDataType);
    }

    #[test]
    fn question_mark_operator_with_from() {
        fn parse_number() -> FerriteResult<i64> {
            let num: i64 = "12345".parse()?;
            Ok(num)
        }
        assert_eq!(parse_number().unwrap(), 12345);
    }
}
