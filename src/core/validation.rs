//! Host, repository path and file path policies.
//!
//! All checks are substring screens over lower-cased input, matching the
//! red-team tested behavior of the original provider: coarse, but they fail
//! closed and cost nothing.

use crate::domain::error::{Error, Result};
use crate::core::limits::MAX_PATH_LENGTH;

/// Hosts that must never be dialed: loopback, RFC1918 and link-local ranges
/// plus the cloud metadata services.
const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "::1",
    "10.",
    "172.16.",
    "172.17.",
    "172.18.",
    "172.19.",
    "172.20.",
    "172.21.",
    "172.22.",
    "172.23.",
    "172.24.",
    "172.25.",
    "172.26.",
    "172.27.",
    "172.28.",
    "172.29.",
    "172.30.",
    "172.31.",
    "192.168.",
    "169.254.169.254",
    "metadata.google.internal",
    "100.100.100.200",
];

/// Traversal patterns rejected in repository paths
const REPO_PATH_TRAVERSAL: &[&str] = &[
    "..", "../", "..\\", "./../", ".\\..\\", "/.git/../", "\\.git\\..\\",
];

/// Traversal patterns rejected in configuration file paths
const FILE_PATH_TRAVERSAL: &[&str] = &[
    "..", "/../", "\\..\\", "./", ".\\", "../", "..\\", "./..", ".\\..",
];

/// Extensions the URL parser admits; a missing parser for an admitted
/// extension surfaces later as `UnsupportedFormat`.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &[
    ".json",
    ".yaml",
    ".yml",
    ".toml",
    ".hcl",
    ".ini",
    ".properties",
];

/// File names and fragments that must never be served as configuration
const SENSITIVE_PATHS: &[&str] = &[
    ".git/",
    ".ssh/",
    ".env",
    "passwd",
    "shadow",
    "id_rsa",
    "id_dsa",
    "config.key",
    "private.key",
    "secret",
    "token",
];

/// Reject hosts that would let a crafted URL reach internal services.
pub fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Error::invalid_config("git URL host cannot be empty"));
    }

    let lower = host.to_lowercase();
    for blocked in BLOCKED_HOSTS {
        if lower.contains(blocked) {
            return Err(Error::security(format!(
                "git URL host not allowed for security reasons: {host}"
            )));
        }
    }

    Ok(())
}

/// Reject repository paths carrying traversal patterns.
pub fn validate_repo_path(path: &str) -> Result<()> {
    if path.is_empty() || path == "/" {
        return Err(Error::invalid_config("git repository path cannot be empty"));
    }

    let lower = path.to_lowercase();
    for pattern in REPO_PATH_TRAVERSAL {
        if lower.contains(pattern) {
            return Err(Error::security(format!(
                "dangerous path traversal pattern detected: {pattern}"
            )));
        }
    }

    Ok(())
}

/// Full policy for configuration file paths: length, byte content,
/// traversal, extension and sensitive-name screening.
pub fn validate_file_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_config(
            "configuration file path cannot be empty",
        ));
    }

    if path.len() > MAX_PATH_LENGTH {
        return Err(Error::invalid_config(format!(
            "config file path too long: {} bytes (max {})",
            path.len(),
            MAX_PATH_LENGTH
        )));
    }

    for (position, byte) in path.bytes().enumerate() {
        if byte == 0 {
            return Err(Error::security("null byte in file path not allowed"));
        }
        // Tab, LF and CR are tolerated; every other control byte is hostile.
        if byte < 0x20 && !matches!(byte, 0x09 | 0x0A | 0x0D) {
            return Err(Error::security(format!(
                "control character (0x{byte:02x}) at position {position} not allowed"
            )));
        }
    }

    for pattern in FILE_PATH_TRAVERSAL {
        if path.contains(pattern) {
            return Err(Error::security(format!(
                "path traversal attempt detected: {pattern}"
            )));
        }
    }

    let lower = path.to_lowercase();
    if !RECOGNIZED_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext))
    {
        return Err(Error::invalid_config(format!(
            "unsupported config file extension (allowed: {})",
            RECOGNIZED_EXTENSIONS.join(", ")
        )));
    }

    for sensitive in SENSITIVE_PATHS {
        if lower.contains(sensitive) {
            return Err(Error::security(format!(
                "access to sensitive file not allowed: {sensitive}"
            )));
        }
    }

    Ok(())
}
