//! Error types for repository access.
//!
//! Every backend-native failure (git2, filesystem, RPC) is normalized into
//! one of the four kinds below before it crosses the facade boundary.
//! Callers never observe raw backend errors.

use thiserror::Error;

/// The unified error type for all repository operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A malformed or missing option, rejected before any backend call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The repository path is absent or unreadable, or the remote service
    /// reported not-found.
    #[error("no repository: {0}")]
    NoRepository(String),

    /// Any other backend failure, carrying the original message.
    #[error("command failed: {0}")]
    Command(String),

    /// Archive construction failed. No partial output file remains.
    #[error("archive failed: {0}")]
    Archive(String),
}

impl Error {
    /// check if this error indicates the repository doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoRepository(_))
    }

    /// check if this error was raised before any backend was contacted
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// shorthand constructor for argument validation failures
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Command(err.message().to_string())
    }
}

/// result type alias for repository operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = Error::NoRepository("default/missing.git".into());
        assert!(not_found.is_not_found());
        assert!(!not_found.is_invalid_argument());

        let invalid = Error::invalid("ref must not be empty");
        assert!(invalid.is_invalid_argument());
        assert!(!invalid.is_not_found());
    }

    #[test]
    fn test_git_error_becomes_command() {
        let git = git2::Error::from_str("object not found");
        let err: Error = git.into();
        assert!(matches!(err, Error::Command(msg) if msg.contains("object not found")));
    }
}
