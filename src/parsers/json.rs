//! JSON documents via serde_json.

use super::require_map;
use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::ConfigParser;
use crate::domain::value::ConfigValue;

pub struct JsonParser;

impl ConfigParser for JsonParser {
    fn format(&self) -> &'static str {
        "json"
    }

    fn parse(&self, content: &[u8]) -> Result<ConfigValue> {
        let value: serde_json::Value = serde_json::from_slice(content)
            .map_err(|e| Error::parse(self.format(), e.to_string()))?;
        require_map(convert(value), self.format())
    }
}

fn convert(value: serde_json::Value) -> ConfigValue {
    match value {
        serde_json::Value::Null => ConfigValue::Null,
        serde_json::Value::Bool(b) => ConfigValue::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigValue::Int(i),
            None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => ConfigValue::Str(s),
        serde_json::Value::Array(items) => {
            ConfigValue::Seq(items.into_iter().map(convert).collect())
        }
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| (key, convert(value)))
            .collect(),
    }
}
