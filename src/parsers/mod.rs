//! Built-in configuration format parsers.
//!
//! The registry ships with JSON, YAML and TOML. The URL validator admits a
//! wider extension set (`.hcl`, `.ini`, `.properties`); loading those
//! surfaces `UnsupportedFormat` unless the host registers a parser.
//!
//! Every parser requires a mapping at the document root, so all formats
//! produce the same shape of tree.

mod json;
mod toml;
mod yaml;

pub use self::json::JsonParser;
pub use self::toml::TomlParser;
pub use self::yaml::YamlParser;

use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::ParserRegistry;
use crate::domain::value::ConfigValue;
use std::sync::Arc;

impl ParserRegistry {
    /// Registry with the built-in JSON, YAML and TOML parsers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("json", Arc::new(JsonParser));
        registry.register("yaml", Arc::new(YamlParser));
        registry.register("yml", Arc::new(YamlParser));
        registry.register("toml", Arc::new(TomlParser));
        registry
    }
}

fn require_map(value: ConfigValue, format: &str) -> Result<ConfigValue> {
    if matches!(value, ConfigValue::Map(_)) {
        Ok(value)
    } else {
        Err(Error::parse(format, "top-level value must be a mapping"))
    }
}
