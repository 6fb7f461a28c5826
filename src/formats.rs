/*!
# Input Formats

Decoding of input files into a collection of documents.

Every format is decoded into [`serde_json::Value`] first, then split into
documents:
- a top-level array is a collection, one document per element
- any other value is a collection of one
- NDJSON and multi-document YAML streams yield one document per entry
- a TOML table whose only key is `documents` holding an array of tables is
  unwrapped to that array, since TOML has no top-level arrays

Formats other than JSON and NDJSON are behind cargo features; selecting one
that was not built in is an error.
*/
use anyhow::{Context as _, Result};
use serde_json::Value;
use std::path::Path;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InputFormat {
    /// A JSON array of documents, or a single JSON document
    #[default]
    Json,
    /// Newline-delimited JSON, one document per line
    Ndjson,
    /// YAML, with `---` separating documents
    Yaml,
    /// TOML, using a `[[documents]]` array for collections
    Toml,
    /// CBOR
    Cbor,
    /// MessagePack
    Msgpack,
}

impl InputFormat {
    /// Guess the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "cbor" => Some(Self::Cbor),
            "msgpack" | "mpk" => Some(Self::Msgpack),
            _ => None,
        }
    }

    /// Cargo feature that enables decoding this format.
    const fn feature(self) -> &'static str {
        match self {
            Self::Json | Self::Ndjson => "default",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Cbor => "cbor",
            Self::Msgpack => "msgpack",
        }
    }
}

/// Decode `bytes` in `format` into a collection of documents.
///
/// # Errors
///
/// Returns an error if `bytes` is not valid in `format`.
pub fn parse_documents(bytes: &[u8], format: InputFormat) -> Result<Vec<Value>> {
    let documents = match format {
        InputFormat::Json => {
            let value: Value =
                serde_json::from_slice(bytes).context("Failed to parse JSON")?;
            split_collection(value)
        }
        InputFormat::Ndjson => serde_json::Deserializer::from_slice(bytes)
            .into_iter::<Value>()
            .enumerate()
            .map(|(i, doc)| {
                doc.with_context(|| format!("Failed to parse NDJSON entry #{i}"))
            })
            .collect::<Result<_>>()?,
        #[cfg(feature = "yaml")]
        InputFormat::Yaml => parse_yaml(bytes)?,
        #[cfg(feature = "toml")]
        InputFormat::Toml => {
            let text = std::str::from_utf8(bytes).context("TOML input is not UTF-8")?;
            let value: Value = toml::from_str(text).context("Failed to parse TOML")?;
            unwrap_toml_documents(value)
        }
        #[cfg(feature = "cbor")]
        InputFormat::Cbor => {
            let value: Value =
                ciborium::from_reader(bytes).context("Failed to parse CBOR")?;
            split_collection(value)
        }
        #[cfg(feature = "msgpack")]
        InputFormat::Msgpack => {
            let value: Value =
                rmp_serde::from_slice(bytes).context("Failed to parse MessagePack")?;
            split_collection(value)
        }
        #[allow(unreachable_patterns)]
        disabled => anyhow::bail!(
            "{disabled:?} input requires building with the `{}` feature",
            disabled.feature()
        ),
    };

    log::debug!("Decoded {} document(s) as {format:?}", documents.len());
    Ok(documents)
}

fn split_collection(value: Value) -> Vec<Value> {
    match value {
        Value::Array(documents) => documents,
        document => vec![document],
    }
}

#[cfg(feature = "yaml")]
fn parse_yaml(bytes: &[u8]) -> Result<Vec<Value>> {
    use serde::Deserialize as _;

    let mut streamed = vec![];
    for (i, document) in serde_yaml::Deserializer::from_slice(bytes).enumerate() {
        let value = Value::deserialize(document)
            .with_context(|| format!("Failed to parse YAML document #{i}"))?;
        streamed.push(value);
    }

    // A single YAML document follows the JSON rules.
    if streamed.len() == 1 {
        Ok(streamed.into_iter().flat_map(split_collection).collect())
    } else {
        Ok(streamed)
    }
}

#[cfg(feature = "toml")]
fn unwrap_toml_documents(value: Value) -> Vec<Value> {
    match value {
        Value::Object(mut table)
            if table.len() == 1 && table.get("documents").is_some_and(Value::is_array) =>
        {
            split_collection(table.shift_remove("documents").unwrap_or_default())
        }
        table => vec![table],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_array_is_a_collection() {
        let docs = parse_documents(br#"[{"a": 1}, {"a": 2}]"#, InputFormat::Json).unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn json_object_is_one_document() {
        let docs = parse_documents(br#"{"a": [1, 2]}"#, InputFormat::Json).unwrap();
        assert_eq!(docs, vec![json!({"a": [1, 2]})]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_documents(b"{", InputFormat::Json).is_err());
    }

    #[test]
    fn ndjson_lines() {
        let input = b"{\"a\": 1}\n\n{\"a\": [2]}\n";
        let docs = parse_documents(input, InputFormat::Ndjson).unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!({"a": [2]})]);

        let err = parse_documents(b"{\"a\": 1}\n{oops}\n", InputFormat::Ndjson).unwrap_err();
        assert!(err.to_string().contains("#1"));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("x.JSON")), Some(InputFormat::Json));
        assert_eq!(InputFormat::from_path(Path::new("x.jsonl")), Some(InputFormat::Ndjson));
        assert_eq!(InputFormat::from_path(Path::new("x.txt")), None);
        assert_eq!(InputFormat::from_path(Path::new("noext")), None);
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml_streams_and_sequences() {
        let stream = b"a: 1\n---\na: 2\n";
        assert_eq!(
            parse_documents(stream, InputFormat::Yaml).unwrap(),
            vec![json!({"a": 1}), json!({"a": 2})]
        );

        let sequence = b"- a: 1\n- a: 2\n";
        assert_eq!(
            parse_documents(sequence, InputFormat::Yaml).unwrap(),
            vec![json!({"a": 1}), json!({"a": 2})]
        );
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_documents_table() {
        let input = b"[[documents]]\na = 1\n\n[[documents]]\na = 2\n";
        assert_eq!(
            parse_documents(input, InputFormat::Toml).unwrap(),
            vec![json!({"a": 1}), json!({"a": 2})]
        );

        let single = b"a = 1\ndocuments = 3\n";
        assert_eq!(
            parse_documents(single, InputFormat::Toml).unwrap(),
            vec![json!({"a": 1, "documents": 3})]
        );
    }

    #[cfg(feature = "cbor")]
    #[test]
    fn cbor_collection() {
        let mut bytes = vec![];
        ciborium::into_writer(&json!([{"a": 1}, {"b": "x"}]), &mut bytes).unwrap();
        assert_eq!(
            parse_documents(&bytes, InputFormat::Cbor).unwrap(),
            vec![json!({"a": 1}), json!({"b": "x"})]
        );
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn msgpack_document() {
        let bytes = rmp_serde::to_vec_named(&json!({"a": [1, 2]})).unwrap();
        assert_eq!(
            parse_documents(&bytes, InputFormat::Msgpack).unwrap(),
            vec![json!({"a": [1, 2]})]
        );
    }
}
