//! Text to document codec
//!
//! Layers are stored as text. The resolver only ever sees them as
//! [`Document`] values produced by a [`DocumentCodec`].

use serde_yaml::Value as YamlValue;

use crate::Document;

/// A codec failure, tagged with the format that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{format}: {message}")]
pub struct CodecError {
    pub format: String,
    pub message: String,
}

impl CodecError {
    pub fn new(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            message: message.into(),
        }
    }
}

/// Decodes stored text into documents and encodes them back.
pub trait DocumentCodec: Send {
    /// Short name of the format, used in error messages.
    fn format(&self) -> &'static str;

    /// Decode `text`. Blank text decodes to `Document::Null`.
    fn decode(&self, text: &str) -> Result<Document, CodecError>;

    fn encode(&self, document: &Document) -> Result<String, CodecError>;
}

/// YAML codec backed by serde_yaml.
///
/// Mapping keys are coerced to strings and tags are dropped. Timestamps stay
/// strings since serde_yaml never parses them.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlCodec;

impl YamlCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentCodec for YamlCodec {
    fn format(&self) -> &'static str {
        "YAML"
    }

    fn decode(&self, text: &str) -> Result<Document, CodecError> {
        if text.trim().is_empty() {
            return Ok(Document::Null);
        }
        let value: YamlValue =
            serde_yaml::from_str(text).map_err(|e| CodecError::new("YAML", e.to_string()))?;
        yaml_to_document(value)
    }

    fn encode(&self, document: &Document) -> Result<String, CodecError> {
        serde_yaml::to_string(document).map_err(|e| CodecError::new("YAML", e.to_string()))
    }
}

fn yaml_key(value: YamlValue) -> String {
    match value {
        YamlValue::String(s) => s,
        YamlValue::Null => "null".to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Tagged(tagged) => yaml_key(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn yaml_to_document(value: YamlValue) -> Result<Document, CodecError> {
    Ok(match value {
        YamlValue::Null => Document::Null,
        YamlValue::Bool(b) => Document::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Document::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Document::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Document::Number)
                    .ok_or_else(|| {
                        CodecError::new("YAML", format!("{n} cannot be represented in a document"))
                    })?
            }
        }
        YamlValue::String(s) => Document::String(s),
        YamlValue::Sequence(items) => Document::Array(
            items
                .into_iter()
                .map(yaml_to_document)
                .collect::<Result<_, _>>()?,
        ),
        YamlValue::Mapping(map) => Document::Object(
            map.into_iter()
                .map(|(k, v)| Ok((yaml_key(k), yaml_to_document(v)?)))
                .collect::<Result<_, CodecError>>()?,
        ),
        YamlValue::Tagged(tagged) => yaml_to_document(tagged.value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_mapping() {
        let doc = YamlCodec.decode("db:\n  host: h1\n  port: 5432\n").unwrap();
        assert_eq!(doc, json!({"db": {"host": "h1", "port": 5432}}));
    }

    #[test]
    fn test_decode_blank_is_null() {
        assert_eq!(YamlCodec.decode("").unwrap(), Document::Null);
        assert_eq!(YamlCodec.decode("  \n").unwrap(), Document::Null);
    }

    #[test]
    fn test_decode_scalar_and_non_string_keys() {
        assert_eq!(YamlCodec.decode("\"1\"").unwrap(), json!("1"));
        assert_eq!(YamlCodec.decode("1: one\ntrue: yes").unwrap(), json!({"1": "one", "true": "yes"}));
    }

    #[test]
    fn test_decode_keeps_timestamps_as_strings() {
        let doc = YamlCodec.decode("at: 2024-01-01T00:00:00Z").unwrap();
        assert_eq!(doc, json!({"at": "2024-01-01T00:00:00Z"}));
    }

    #[test]
    fn test_decode_rejects_non_finite_floats() {
        for text in ["a: .nan", "a: .inf", "[1, -.inf]"] {
            let err = YamlCodec.decode(text).unwrap_err();
            assert_eq!(err.format, "YAML");
        }
        assert_eq!(YamlCodec.decode("a: 1.5").unwrap(), json!({"a": 1.5}));
    }

    #[test]
    fn test_decode_error_names_format() {
        let err = YamlCodec.decode("a: [1, 2").unwrap_err();
        assert_eq!(err.format, "YAML");
    }

    #[test]
    fn test_encode_then_decode_preserves_document() {
        let doc = json!({"list": [1, "two"], "nested": {"flag": true}});
        let text = YamlCodec.encode(&doc).unwrap();
        assert_eq!(YamlCodec.decode(&text).unwrap(), doc);
    }
}
