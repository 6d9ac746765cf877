//! TOML documents via the toml crate.

use super::require_map;
use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::ConfigParser;
use crate::domain::value::ConfigValue;
use toml::Value as TomlValue;

pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn format(&self) -> &'static str {
        "toml"
    }

    fn parse(&self, content: &[u8]) -> Result<ConfigValue> {
        let text = std::str::from_utf8(content)
            .map_err(|e| Error::parse(self.format(), e.to_string()))?;
        let value: TomlValue = text
            .parse()
            .map_err(|e: toml::de::Error| Error::parse(self.format(), e.to_string()))?;
        require_map(convert(value), self.format())
    }
}

fn convert(value: TomlValue) -> ConfigValue {
    match value {
        TomlValue::String(s) => ConfigValue::Str(s),
        TomlValue::Integer(i) => ConfigValue::Int(i),
        TomlValue::Float(f) => ConfigValue::Float(f),
        TomlValue::Boolean(b) => ConfigValue::Bool(b),
        // No datetime leaf in the document tree; the RFC 3339 rendering is
        // what other formats would carry anyway.
        TomlValue::Datetime(dt) => ConfigValue::Str(dt.to_string()),
        TomlValue::Array(items) => ConfigValue::Seq(items.into_iter().map(convert).collect()),
        TomlValue::Table(table) => table
            .into_iter()
            .map(|(key, value)| (key, convert(value)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tables_and_arrays() {
        let doc = TomlParser
            .parse(b"title = \"app\"\n\n[db]\nhost = \"h\"\nports = [5432, 5433]\n")
            .unwrap();
        assert_eq!(doc.get("title").and_then(ConfigValue::as_str), Some("app"));
        let db = doc.get("db").unwrap();
        assert_eq!(
            db.get("ports").and_then(ConfigValue::as_seq).map(|s| s.len()),
            Some(2)
        );
    }

    #[test]
    fn datetimes_become_strings() {
        let doc = TomlParser.parse(b"deployed = 2024-01-15T10:00:00Z\n").unwrap();
        assert_eq!(
            doc.get("deployed").and_then(ConfigValue::as_str),
            Some("2024-01-15T10:00:00Z")
        );
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert!(matches!(
            TomlParser.parse(b"key = "),
            Err(Error::Parse { .. })
        ));
    }
}
