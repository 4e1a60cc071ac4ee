use crate::{entry::LogEntry, error::SinkError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use std::fmt::Write;

/// The default timestamp layout, RFC 3339 with milliseconds.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// How entries are rendered into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderStyle {
    /// One JSON object per line.
    Json,
    /// One human-readable `key=value` line per entry.
    Console,
}

/// Turns entries into newline-terminated records.
#[derive(Debug, Clone)]
pub struct Encoder {
    style: EncoderStyle,
    time_format: String,
}

impl Encoder {
    pub fn new(style: EncoderStyle, time_format: impl Into<String>) -> Self {
        Self {
            style,
            time_format: time_format.into(),
        }
    }

    pub fn json() -> Self {
        Self::new(EncoderStyle::Json, DEFAULT_TIME_FORMAT)
    }

    pub fn console() -> Self {
        Self::new(EncoderStyle::Console, DEFAULT_TIME_FORMAT)
    }

    pub fn style(&self) -> EncoderStyle {
        self.style
    }

    /// Appends the encoded entry, newline included, to `out`.
    pub fn encode(&self, entry: &LogEntry, out: &mut Vec<u8>) -> Result<(), SinkError> {
        match self.style {
            EncoderStyle::Json => self.encode_json(entry, out)?,
            EncoderStyle::Console => out.extend_from_slice(self.encode_console(entry).as_bytes()),
        }

        out.push(b'\n');

        Ok(())
    }

    fn encode_json(&self, entry: &LogEntry, out: &mut Vec<u8>) -> Result<(), SinkError> {
        let mut serializer = serde_json::Serializer::new(out);
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("time", &self.format_time(entry.timestamp()))?;
        map.serialize_entry("level", entry.level().as_str())?;
        map.serialize_entry("msg", entry.message())?;
        map.serialize_entry("op", entry.op())?;
        map.serialize_entry("traceId", entry.trace_id())?;

        for field in entry.fields() {
            map.serialize_entry(field.key.as_ref(), &field.value)?;
        }

        map.end()?;

        Ok(())
    }

    fn encode_console(&self, entry: &LogEntry) -> String {
        let mut line = format!(
            "{}\t{:<5}\t{}\top={}\ttraceId={}",
            self.format_time(entry.timestamp()),
            entry.level().as_capital_str(),
            ConsoleText(entry.message(), char::is_control),
            ConsoleText(entry.op(), char::is_whitespace),
            ConsoleText(entry.trace_id(), char::is_whitespace),
        );

        for field in entry.fields() {
            let value = field.value.to_string();

            // write! into a String cannot fail
            let _ = write!(
                line,
                "\t{}={}",
                ConsoleText(&field.key, char::is_whitespace),
                ConsoleText(&value, char::is_whitespace)
            );
        }

        line
    }

    fn format_time(&self, timestamp: DateTime<Utc>) -> String {
        let mut formatted = String::new();

        match write!(formatted, "{}", timestamp.format(&self.time_format)) {
            Ok(()) => formatted,
            Err(_) => timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Quoted and escaped when empty or containing a character matching the
/// predicate, so every entry stays on one line with tab-separated columns.
struct ConsoleText<'a>(&'a str, fn(char) -> bool);

impl std::fmt::Display for ConsoleText<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ConsoleText(text, quote_if) = *self;

        if text.is_empty() || text.contains(quote_if) || text.contains(char::is_control) {
            write!(f, "{text:?}")
        } else {
            f.write_str(text)
        }
    }
}
