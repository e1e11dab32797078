//! Error taxonomy for document I/O and configuration
//!
//! Broken links are never errors: they are findings carried in the result set.
//! Only the conditions below abort a command.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JumpError {
    #[error("input document not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("cannot read input document {}: {reason}", .path.display())]
    InputUnreadable { path: PathBuf, reason: String },

    #[error("output path {} is the input document; choose a distinct output", .0.display())]
    OutputIsInput(PathBuf),

    #[error("invalid configuration in {}: {reason}", .path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("cannot write output document {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl JumpError {
    /// Stable machine-readable code, used in result items
    pub fn code(&self) -> &'static str {
        match self {
            JumpError::InputNotFound(_) => "INPUT_NOT_FOUND",
            JumpError::InputUnreadable { .. } => "INPUT_UNREADABLE",
            JumpError::OutputIsInput(_) => "OUTPUT_IS_INPUT",
            JumpError::InvalidConfig { .. } => "INVALID_CONFIG",
            JumpError::WriteFailed { .. } => "WRITE_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_path() {
        let err = JumpError::InputNotFound(PathBuf::from("docs/API.md"));
        assert!(err.to_string().contains("docs/API.md"));
        assert_eq!(err.code(), "INPUT_NOT_FOUND");
    }

    #[test]
    fn test_write_failed_keeps_source() {
        let err = JumpError::WriteFailed {
            path: PathBuf::from("out.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.code(), "WRITE_FAILED");
    }
}
