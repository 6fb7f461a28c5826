//! Colorized output of matched documents.

use anyhow::Context as _;
use colored::Colorize;
use serde_json::Value;
use std::io::{self, ErrorKind, Write};

/// How matched documents are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputStyle {
    /// Indent nested values over several lines
    pub pretty: bool,
    /// Print a `#<index>:` header with each document's position in the input
    pub show_index: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self { pretty: true, show_index: true }
    }
}

/// Write one matched document (index header + colorized JSON) to `writer`.
/// A broken pipe is treated as success so that piping to tools like `head`
/// exits cleanly.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_match<W: Write>(
    writer: &mut W,
    index: usize,
    document: &Value,
    style: OutputStyle,
) -> anyhow::Result<()> {
    let result = (|| -> io::Result<()> {
        if style.show_index {
            writeln!(writer, "{}", format!("#{index}:").bold().magenta())?;
        }
        Highlighter { writer: &mut *writer, pretty: style.pretty }.value(document, 0)?;
        writeln!(writer)
    })();

    match result {
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other.context("write matched document to stdout"),
    }
}

/// Writes JSON with syntax highlighting.
struct Highlighter<'w, W: Write> {
    writer: &'w mut W,
    pretty: bool,
}

impl<W: Write> Highlighter<'_, W> {
    fn value(&mut self, value: &Value, indent: usize) -> io::Result<()> {
        match value {
            Value::Null => write!(self.writer, "{}", "null".red().dimmed()),
            Value::Bool(b) => write!(self.writer, "{}", b.to_string().yellow().bold()),
            Value::Number(n) => write!(self.writer, "{}", n.to_string().yellow()),
            Value::String(s) => write!(self.writer, "{}", quote(s).green()),
            Value::Array(items) => {
                self.container(('[', ']'), items.iter().map(|v| (None, v)), items.len(), indent)
            }
            Value::Object(map) => self.container(
                ('{', '}'),
                map.iter().map(|(k, v)| (Some(k.as_str()), v)),
                map.len(),
                indent,
            ),
        }
    }

    fn container<'v>(
        &mut self,
        (open, close): (char, char),
        entries: impl Iterator<Item = (Option<&'v str>, &'v Value)>,
        len: usize,
        indent: usize,
    ) -> io::Result<()> {
        let inner = indent + 2;
        write!(self.writer, "{open}")?;
        for (i, (key, value)) in entries.enumerate() {
            if self.pretty {
                write!(self.writer, "\n{:inner$}", "")?;
            }
            if let Some(key) = key {
                let sep = if self.pretty { ": " } else { ":" };
                write!(self.writer, "{}{sep}", quote(key).cyan())?;
            }
            self.value(value, inner)?;
            if i + 1 < len {
                write!(self.writer, ",")?;
            }
        }
        if self.pretty && len > 0 {
            write!(self.writer, "\n{:indent$}", "")?;
        }
        write!(self.writer, "{close}")
    }
}

/// JSON-quote and escape a string.
fn quote(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(document: &Value, style: OutputStyle) -> String {
        colored::control::set_override(false);
        let mut out = vec![];
        write_match(&mut out, 3, document, style).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn pretty_with_index() {
        let doc = json!({"a": [1, null], "b": "x\"y", "c": {}});
        let expected = "#3:\n{\n  \"a\": [\n    1,\n    null\n  ],\n  \"b\": \"x\\\"y\",\n  \"c\": {}\n}\n";
        assert_eq!(render(&doc, OutputStyle::default()), expected);
    }

    #[test]
    fn compact_without_index() {
        let doc = json!({"a": [1, true], "b": {"c": null}});
        let style = OutputStyle { pretty: false, show_index: false };
        let out = render(&doc, style);
        assert_eq!(out, "{\"a\":[1,true],\"b\":{\"c\":null}}\n");
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), doc);
    }
}
