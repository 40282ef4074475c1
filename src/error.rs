//! Error taxonomy for the credential exchange.
//!
//! Nothing in the core exits the process. Every failure is returned as an
//! [`Error`] and reported once by `main`.

use std::io;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid command-line configuration.
    #[error("{0}")]
    Config(String),

    /// The MFA command could not be launched or exited non-zero.
    #[error("Error obtaining mfa token from `{command}`: {reason}")]
    Execution { command: String, reason: String },

    /// File or terminal I/O failure. The underlying error is the source,
    /// reported by the caller's error chain.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The credentials file exists but is not valid INI.
    #[error("Error parsing credentials file {path}: {reason}")]
    ProfileStore { path: String, reason: String },

    /// Any STS call failure. Auth, network and throttling are not told apart.
    #[error("{operation}: {message}")]
    Provider {
        operation: &'static str,
        message: String,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn provider(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            operation,
            message: message.into(),
        }
    }
}
