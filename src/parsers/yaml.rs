//! YAML documents via serde_yaml.

use super::require_map;
use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::ConfigParser;
use crate::domain::value::ConfigValue;

pub struct YamlParser;

impl ConfigParser for YamlParser {
    fn format(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, content: &[u8]) -> Result<ConfigValue> {
        let value: serde_yaml::Value = serde_yaml::from_slice(content)
            .map_err(|e| Error::parse(self.format(), e.to_string()))?;
        require_map(convert(value)?, self.format())
    }
}

fn convert(value: serde_yaml::Value) -> Result<ConfigValue> {
    Ok(match value {
        serde_yaml::Value::Null => ConfigValue::Null,
        serde_yaml::Value::Bool(b) => ConfigValue::Bool(b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigValue::Int(i),
            None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_yaml::Value::String(s) => ConfigValue::Str(s),
        serde_yaml::Value::Sequence(items) => ConfigValue::Seq(
            items
                .into_iter()
                .map(convert)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(map) => {
            let mut entries = std::collections::BTreeMap::new();
            for (key, value) in map {
                entries.insert(map_key(key)?, convert(value)?);
            }
            ConfigValue::Map(entries)
        }
        serde_yaml::Value::Tagged(tagged) => convert(tagged.value)?,
    })
}

/// YAML permits arbitrary mapping keys; configuration documents only get
/// scalar ones, rendered as strings.
fn map_key(key: serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::parse(
            "yaml",
            format!("unsupported mapping key: {other:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_documents() {
        let doc = YamlParser
            .parse(b"server:\n  host: example\n  ports:\n    - 80\n    - 443\nenabled: true\n")
            .unwrap();
        let server = doc.get("server").unwrap();
        assert_eq!(
            server.get("host").and_then(ConfigValue::as_str),
            Some("example")
        );
        assert_eq!(
            server.get("ports").and_then(ConfigValue::as_seq).map(|s| s.len()),
            Some(2)
        );
        assert_eq!(doc.get("enabled").and_then(ConfigValue::as_bool), Some(true));
    }

    #[test]
    fn scalar_keys_are_stringified() {
        let doc = YamlParser.parse(b"80: http\ntrue: yes\n").unwrap();
        assert!(doc.get("80").is_some());
        assert!(doc.get("true").is_some());
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert!(matches!(
            YamlParser.parse(b"key: [unclosed\n"),
            Err(Error::Parse { .. })
        ));
    }
}
