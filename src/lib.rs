//! Git-backed remote configuration provider.
//!
//! Loads structured configuration documents from Git repositories and streams
//! updates when the underlying references advance. The Git transport and the
//! concrete format parsers are abstract collaborators ([`GitClient`] and
//! [`ParserRegistry`]); everything else lives here: URL admission, credential
//! resolution, the cached load pipeline, polling watches and resource
//! governance.
//!
//! URL format:
//!
//! ```text
//! <scheme>://[<user>@]<host>/<repo>[.git][?<query>]#<file-path>[?<fragment-query>]
//! ```
//!
//! Examples:
//!
//! ```text
//! https://github.com/acme/configs.git#app/prod.yaml?ref=main
//! ssh://git@gitlab.com/acme/configs.git#app.json?ref=v1.2.0&auth=key:/home/ci/.ssh/deploy
//! git://config-host.example.com/infra.git#service.toml?poll=60s
//! ```

pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod parsers;
pub mod provider;

pub use domain::error::{Error, ErrorClass, Result};
pub use domain::ports::git::{AuthHandle, CloneRequest, GitClient, RemoteRef, RepoHandle};
pub use domain::ports::parser::{ConfigParser, ParserRegistry};
pub use domain::request::{AuthSpec, RepoRequest};
pub use domain::value::ConfigValue;
pub use infrastructure::cache::CacheStats;
pub use infrastructure::metrics::MetricsSnapshot;
pub use infrastructure::retry::RetryPolicy;
pub use provider::{GitConfigProvider, ProviderConfig, WatchStream};
