//! Configuration format parser port.

use crate::domain::error::{Error, Result};
use crate::domain::value::ConfigValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Parses one configuration format into the document tree.
///
/// Implementations must produce fully owned trees with no substructure
/// shared between invocations; the cache's copy-on-read contract relies on
/// it.
pub trait ConfigParser: Send + Sync {
    /// Format label used in parse error messages
    fn format(&self) -> &'static str;

    fn parse(&self, content: &[u8]) -> Result<ConfigValue>;
}

/// Registry of parsers indexed by lowercase file extension (without the dot).
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn ConfigParser>>,
}

impl ParserRegistry {
    /// Registry with no parsers; see [`ParserRegistry::with_defaults`] for
    /// the built-in formats.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Register a parser for an extension, replacing any previous one.
    pub fn register<S: Into<String>>(&mut self, extension: S, parser: Arc<dyn ConfigParser>) {
        self.parsers
            .insert(normalize_extension(&extension.into()), parser);
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.parsers.contains_key(&normalize_extension(extension))
    }

    /// Dispatch parsing by extension.
    pub fn parse(&self, extension: &str, content: &[u8]) -> Result<ConfigValue> {
        let key = normalize_extension(extension);
        match self.parsers.get(&key) {
            Some(parser) => parser.parse(content),
            None => Err(Error::unsupported_format(key)),
        }
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubParser;

    impl ConfigParser for StubParser {
        fn format(&self) -> &'static str {
            "stub"
        }

        fn parse(&self, _content: &[u8]) -> Result<ConfigValue> {
            Ok(ConfigValue::Null)
        }
    }

    #[test]
    fn lookup_ignores_case_and_leading_dot() {
        let mut registry = ParserRegistry::empty();
        registry.register(".JSON", Arc::new(StubParser));

        assert!(registry.supports("json"));
        assert!(registry.supports(".json"));
        assert!(registry.parse("JSON", b"{}").is_ok());
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let registry = ParserRegistry::empty();
        assert!(matches!(
            registry.parse("ini", b""),
            Err(Error::UnsupportedFormat { .. })
        ));
    }
}
