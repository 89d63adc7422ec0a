// Path: crates/types/src/error/mod.rs
//! Core error types for the Aegis runtime.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// The unified error type shared by the crypto provider and the resource
/// monitor. Variants map one-to-one onto the platform error taxonomy so
/// callers can branch on the kind without parsing message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed input: wrong lengths, bad encodings, non-UTF8 DN content.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The requested algorithm, extension, or mode is not implemented.
    #[error("not supported: {0}")]
    NotSupported(String),
    /// A referenced key, instance, OID, or partition does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The entity being created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// A bounded resource (key slots) is exhausted.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// A fixed-capacity container cannot hold the requested data.
    #[error("no memory: {0}")]
    NoMemory(String),
    /// An object was used outside its valid lifecycle window.
    #[error("wrong state: {0}")]
    WrongState(String),
    /// An upstream call did not complete within its budget.
    #[error("timeout: {0}")]
    Timeout(String),
    /// A generic back-end failure, with the back-end message preserved.
    #[error("failed: {0}")]
    Failed(String),
}

impl ErrorCode for Error {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotSupported(_) => "NOT_SUPPORTED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::OutOfRange(_) => "OUT_OF_RANGE",
            Self::NoMemory(_) => "NO_MEMORY",
            Self::WrongState(_) => "WRONG_STATE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Failed(_) => "FAILED",
        }
    }
}

impl Error {
    /// Returns true when this error carries the given taxonomy code.
    ///
    /// Convenience for call sites that tolerate a specific failure kind,
    /// e.g. treating `NOT_FOUND` from an instance lookup as benign.
    pub fn is_code(&self, code: &str) -> bool {
        self.code() == code
    }

    /// Shorthand constructor for [`Error::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand constructor for [`Error::NotSupported`].
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Shorthand constructor for [`Error::NotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Shorthand constructor for [`Error::AlreadyExists`].
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Shorthand constructor for [`Error::WrongState`].
    pub fn wrong_state(msg: impl Into<String>) -> Self {
        Self::WrongState(msg.into())
    }

    /// Shorthand constructor for [`Error::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(Error::invalid_argument("x").code(), "INVALID_ARGUMENT");
        assert_eq!(Error::not_supported("x").code(), "NOT_SUPPORTED");
        assert_eq!(Error::not_found("x").code(), "NOT_FOUND");
        assert_eq!(Error::already_exists("x").code(), "ALREADY_EXISTS");
        assert_eq!(Error::OutOfRange("x".into()).code(), "OUT_OF_RANGE");
        assert_eq!(Error::NoMemory("x".into()).code(), "NO_MEMORY");
        assert_eq!(Error::wrong_state("x").code(), "WRONG_STATE");
        assert_eq!(Error::Timeout("x".into()).code(), "TIMEOUT");
        assert_eq!(Error::failed("x").code(), "FAILED");
    }

    #[test]
    fn test_failed_preserves_backend_message() {
        let err = Error::failed("The certificate validity has expired");
        assert_eq!(
            err.to_string(),
            "failed: The certificate validity has expired"
        );
    }
}
