//! Error types for `hodgepodge`

use std::path::PathBuf;

use thiserror::Error;

/// Custom result type for `hodgepodge` operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for `hodgepodge`
#[derive(Debug, Error)]
pub enum Error {
    /// IO operation failed
    #[error("Error: {0}")]
    Io(#[from] std::io::Error),

    /// Search configuration is inconsistent
    #[error("Error: Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Glob pattern could not be compiled
    #[error("Error: Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Hash algorithm name is not known
    #[error("Error: Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Hashing a file failed part way
    #[error("Error: Failed to hash {}: {source}", path.display())]
    Hash {
        /// File being hashed
        path:   PathBuf,
        /// Underlying read failure
        source: std::io::Error,
    },
}

impl Error {
    /// Create a new configuration error
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Get a user-friendly error message with action items
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Io(e) => format!("Error: {e}\nTip: Check file permissions and try again"),
            Self::InvalidConfig(msg) => {
                format!("Error: {msg}\nTip: Check the size, depth and hashing options")
            },
            Self::InvalidPattern(msg) => {
                format!("Error: Invalid pattern {msg}\nTip: Patterns use shell glob syntax (*, ?, [...])")
            },
            Self::UnsupportedAlgorithm(name) => {
                format!("Error: Unsupported hash algorithm '{name}'\nTip: Use md5, sha1, sha256 or sha512")
            },
            Self::Hash { path, source } => format!(
                "Error: Failed to hash {}: {source}\nTip: The file may have been removed or is \
                 not readable",
                path.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_has_tip() {
        let errors = [
            Error::config("minimum size exceeds maximum size"),
            Error::InvalidPattern("[".into()),
            Error::UnsupportedAlgorithm("crc64".into()),
            Error::Hash {
                path:   PathBuf::from("/gone"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
        ];
        for error in errors {
            assert!(error.user_message().contains("Tip:"), "{error}");
        }
    }

    #[test]
    fn test_hash_error_names_path() {
        let error = Error::Hash {
            path:   PathBuf::from("/var/log/syslog"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(error.to_string().contains("/var/log/syslog"));
    }
}
