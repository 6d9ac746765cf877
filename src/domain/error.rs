//! Error handling types

use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Git configuration provider
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration URL: {message}")]
    InvalidConfig { message: String },

    #[error("configuration file not found: {path}")]
    NotFound { path: String },

    #[error("i/o error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("authentication error: {message}")]
    Auth { message: String },

    #[error("security violation: {message}")]
    Security { message: String },

    #[error("git operation failed: {message}")]
    Git { message: String },

    #[error("failed to parse {format} configuration: {message}")]
    Parse { format: String, message: String },

    #[error("unsupported configuration file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("resource limit exceeded: {message}")]
    ResourceLimit { message: String },

    #[error("provider is closed")]
    ProviderClosed,

    #[error("{operation} failed after {attempts} attempts")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("health check failed: {message}")]
    HealthCheckFailed { message: String },

    #[error("{operation} cancelled")]
    Cancelled { operation: String },
}

/// Metric bucket an error is accounted under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Network,
    Auth,
    Parse,
    Git,
    Other,
}

/// Message substrings that mark a transport error as worth retrying
const RETRYABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timeout",
    "network is unreachable",
    "timeout",
    "temporary failure",
    "service unavailable",
    "bad gateway",
    "gateway timeout",
    "too many requests",
    "rate limit",
    "dns",
    "no such host",
];

/// Message substrings that mark an error as permanent
const NON_RETRYABLE_PATTERNS: &[&str] = &[
    "authentication failed",
    "permission denied",
    "not found",
    "forbidden",
    "unauthorized",
    "invalid credentials",
    "repository not found",
    "access denied",
];

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a missing configuration file error
    pub fn not_found<S: Into<String>>(path: S) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an i/o error, optionally wrapping the underlying cause
    pub fn io<S: Into<String>>(message: S, source: Option<std::io::Error>) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a security violation error
    pub fn security<S: Into<String>>(message: S) -> Self {
        Self::Security {
            message: message.into(),
        }
    }

    /// Create a git operation error
    pub fn git<S: Into<String>>(message: S) -> Self {
        Self::Git {
            message: message.into(),
        }
    }

    /// Create a parse error for the given format
    pub fn parse<F: Into<String>, S: Into<String>>(format: F, message: S) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format<S: Into<String>>(extension: S) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Create a resource limit error
    pub fn resource_limit<S: Into<String>>(message: S) -> Self {
        Self::ResourceLimit {
            message: message.into(),
        }
    }

    /// Create a health check failure
    pub fn health_check<S: Into<String>>(message: S) -> Self {
        Self::HealthCheckFailed {
            message: message.into(),
        }
    }

    /// Create a cancellation error for the named operation
    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Whether the retry controller may attempt this operation again.
    ///
    /// Matches lower-cased message substrings, including wrapped causes.
    /// Unknown errors default to retryable.
    pub fn is_retryable(&self) -> bool {
        let message = self.full_message();

        for pattern in RETRYABLE_PATTERNS {
            if message.contains(pattern) {
                return true;
            }
        }

        for pattern in NON_RETRYABLE_PATTERNS {
            if message.contains(pattern) {
                return false;
            }
        }

        true
    }

    /// Bucket this error for the per-class metric counters
    pub fn class(&self) -> ErrorClass {
        let message = self.full_message();

        if ["network", "connection", "timeout", "dns"]
            .iter()
            .any(|p| message.contains(p))
        {
            ErrorClass::Network
        } else if ["auth", "permission", "credential", "forbidden"]
            .iter()
            .any(|p| message.contains(p))
        {
            ErrorClass::Auth
        } else if ["parse", "marshal", "json", "yaml", "toml"]
            .iter()
            .any(|p| message.contains(p))
        {
            ErrorClass::Parse
        } else if ["git", "clone", "checkout", "repository"]
            .iter()
            .any(|p| message.contains(p))
        {
            ErrorClass::Git
        } else {
            ErrorClass::Other
        }
    }

    /// Lower-cased rendering of the error and its cause chain
    fn full_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message.to_lowercase()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
