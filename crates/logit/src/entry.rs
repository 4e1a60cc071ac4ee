use crate::{level::Level, trace};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{borrow::Cow, fmt, time::Duration};

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Duration(Duration),
    Null,
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::String(value) => serializer.serialize_str(value),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::I64(value) => serializer.serialize_i64(*value),
            Value::U64(value) => serializer.serialize_u64(*value),
            Value::F64(value) => serializer.serialize_f64(*value),
            Value::Duration(value) => serializer.collect_str(&format_args!("{value:?}")),
            Value::Null => serializer.serialize_unit(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(value) => f.write_str(value),
            Value::Bool(value) => write!(f, "{value}"),
            Value::I64(value) => write!(f, "{value}"),
            Value::U64(value) => write!(f, "{value}"),
            Value::F64(value) => write!(f, "{value}"),
            Value::Duration(value) => write!(f, "{value:?}"),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(value) => serde_json::Value::from(value.as_str()),
            Value::Bool(value) => serde_json::Value::from(*value),
            Value::I64(value) => serde_json::Value::from(*value),
            Value::U64(value) => serde_json::Value::from(*value),
            Value::F64(value) => serde_json::Value::from(*value),
            Value::Duration(value) => serde_json::Value::from(format!("{value:?}")),
            Value::Null => serde_json::Value::Null,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value as $target)
                }
            }
        )*
    };
}

impl_from! {
    i8 => I64 as i64,
    i16 => I64 as i64,
    i32 => I64 as i64,
    i64 => I64 as i64,
    isize => I64 as i64,
    u8 => U64 as u64,
    u16 => U64 as u64,
    u32 => U64 as u64,
    u64 => U64 as u64,
    usize => U64 as u64,
    f32 => F64 as f64,
    f64 => F64 as f64,
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Value::Duration(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A key with a typed value. Keys need not be unique within an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: Cow<'static, str>,
    pub value: Value,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One log event. Built once per logging call and never modified afterwards;
/// every sink reads the same entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    level: Level,
    message: String,
    op: String,
    trace_id: String,
    fields: Vec<Field>,
}

impl LogEntry {
    pub fn builder(level: Level, message: impl Into<String>) -> LogEntryBuilder {
        LogEntryBuilder {
            timestamp: None,
            level,
            message: message.into(),
            op: String::new(),
            trace_id: None,
            fields: Vec::new(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The logical operation that produced the entry.
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Never empty.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

#[derive(Debug, Clone)]
pub struct LogEntryBuilder {
    timestamp: Option<DateTime<Utc>>,
    level: Level,
    message: String,
    op: String,
    trace_id: Option<String>,
    fields: Vec<Field>,
}

impl LogEntryBuilder {
    pub fn op(mut self, op: impl Into<String>) -> Self {
        self.op = op.into();
        self
    }

    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn field(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.fields.push(Field::new(key, value));
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// A missing or empty trace id is replaced with a fresh one.
    pub fn build(self) -> LogEntry {
        LogEntry {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            level: self.level,
            message: self.message,
            op: self.op,
            trace_id: trace::resolve(self.trace_id.as_deref()),
            fields: self.fields,
        }
    }
}
