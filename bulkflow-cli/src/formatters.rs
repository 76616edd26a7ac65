//! Record formatters used by `bulkflow decode`

use std::io::{self, Write};
use std::sync::Arc;

use bulkflow_exec::{PluginKind, PluginRegistry, StaticPluginSource};
use bulkflow_format::Value;

/// Writes decoded records as text
pub trait RecordFormatter: Send + Sync {
    /// Write one record, including its trailing newline.
    fn write_record(&self, record: &Value, out: &mut dyn Write) -> io::Result<()>;
}

/// One JSON document per line
pub struct NdjsonFormatter;

impl RecordFormatter for NdjsonFormatter {
    fn write_record(&self, record: &Value, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *out, &record.to_json())?;
        out.write_all(b"\n")
    }
}

/// Indented JSON
pub struct PrettyFormatter;

impl RecordFormatter for PrettyFormatter {
    fn write_record(&self, record: &Value, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, &record.to_json())?;
        out.write_all(b"\n")
    }
}

/// Type outline of each record, e.g. `map{id: integer, tags: array[string]}`
pub struct TypesFormatter;

impl TypesFormatter {
    fn outline(value: &Value, out: &mut String) {
        match value {
            Value::Array(items) => {
                out.push_str("array[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    Self::outline(item, out);
                }
                out.push(']');
            }
            Value::Map(entries) => {
                out.push_str("map{");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    match key {
                        Value::String(s) => out.push_str(s),
                        other => out.push_str(&other.to_string()),
                    }
                    out.push_str(": ");
                    Self::outline(value, out);
                }
                out.push('}');
            }
            other => out.push_str(other.value_type().name()),
        }
    }
}

impl RecordFormatter for TypesFormatter {
    fn write_record(&self, record: &Value, out: &mut dyn Write) -> io::Result<()> {
        let mut line = String::new();
        Self::outline(record, &mut line);
        line.push('\n');
        out.write_all(line.as_bytes())
    }
}

/// Registry holding the built-in formatters.
pub fn builtin_registry() -> PluginRegistry<dyn RecordFormatter> {
    let ndjson: Arc<dyn RecordFormatter> = Arc::new(NdjsonFormatter);
    let pretty: Arc<dyn RecordFormatter> = Arc::new(PrettyFormatter);
    let types: Arc<dyn RecordFormatter> = Arc::new(TypesFormatter);
    let builtins = StaticPluginSource::<dyn RecordFormatter>::new()
        .with(PluginKind::Formatter, "ndjson", ndjson)
        .with(PluginKind::Formatter, "pretty", pretty)
        .with(PluginKind::Formatter, "types", types);
    PluginRegistry::new().with_source(builtins)
}
