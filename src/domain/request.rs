//! Request descriptor produced by URL admission.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Credential descriptor extracted from a configuration URL.
///
/// `Debug` never renders secret material; redaction here keeps tokens and
/// passwords out of logs and surfaced errors.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthSpec {
    None,
    Token(String),
    Basic { username: String, password: String },
    SshKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

impl AuthSpec {
    /// Stable tag used as the auth cache key component
    pub fn kind(&self) -> &'static str {
        match self {
            AuthSpec::None => "none",
            AuthSpec::Token(_) => "token",
            AuthSpec::Basic { .. } => "basic",
            AuthSpec::SshKey { .. } => "ssh-key",
        }
    }
}

impl fmt::Debug for AuthSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSpec::None => f.write_str("AuthSpec::None"),
            AuthSpec::Token(_) => f.write_str("AuthSpec::Token(***)"),
            AuthSpec::Basic { username, .. } => f
                .debug_struct("AuthSpec::Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            AuthSpec::SshKey { path, passphrase } => f
                .debug_struct("AuthSpec::SshKey")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}

/// Immutable descriptor of one configuration target inside a repository.
///
/// Produced only by URL admission ([`crate::core::url::parse_request`]);
/// every field has already passed the host, path and file policies.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoRequest {
    repo_url: String,
    file_path: String,
    reference: String,
    auth: AuthSpec,
    poll_interval: Duration,
}

impl RepoRequest {
    pub(crate) fn new(
        repo_url: String,
        file_path: String,
        reference: String,
        auth: AuthSpec,
        poll_interval: Duration,
    ) -> Self {
        Self {
            repo_url,
            file_path,
            reference,
            auth,
            poll_interval,
        }
    }

    /// Canonical repository URL with a guaranteed `.git` suffix
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// Relative path of the configuration file inside the repository
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Git reference name: branch, tag or commit hex
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn auth(&self) -> &AuthSpec {
        &self.auth
    }

    /// Polling interval used by watches on this request
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_credentials() {
        let token = AuthSpec::Token("ghp_supersecret".to_string());
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("supersecret"));

        let basic = AuthSpec::Basic {
            username: "ci".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{basic:?}");
        assert!(rendered.contains("ci"));
        assert!(!rendered.contains("hunter2"));

        let key = AuthSpec::SshKey {
            path: PathBuf::from("/home/ci/.ssh/deploy"),
            passphrase: Some("opensesame".to_string()),
        };
        let rendered = format!("{key:?}");
        assert!(rendered.contains("deploy"));
        assert!(!rendered.contains("opensesame"));
    }

    #[test]
    fn request_debug_inherits_redaction() {
        let request = RepoRequest::new(
            "https://github.com/acme/configs.git".to_string(),
            "app.json".to_string(),
            "main".to_string(),
            AuthSpec::Token("ghp_supersecret".to_string()),
            Duration::from_secs(30),
        );
        assert!(!format!("{request:?}").contains("supersecret"));
    }
}
