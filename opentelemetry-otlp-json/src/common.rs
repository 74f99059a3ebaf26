use std::{
    borrow::Cow,
    fmt,
    io::{self, Write},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use opentelemetry::{Key, StringValue};
use serde::{
    ser::{Error as _, SerializeMap},
    Serialize, Serializer,
};

use crate::error::{OtlpJsonError, OtlpJsonResult};

/// A single attribute or body value.
///
/// Each variant maps to one OTLP/JSON wire variant. Values whose type has no
/// variant of its own are kept as [`AnyValue::Other`] and written as text.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    /// `stringValue`
    String(StringValue),
    /// `boolValue`
    Bool(bool),
    /// `intValue`
    Int(i64),
    /// `doubleValue`
    Double(f64),
    /// `arrayValue`, encoded element by element.
    ///
    /// Nesting depth is not bounded: deeply nested input recurses as deep as it
    /// is nested.
    Array(Vec<AnyValue>),
    /// Textual form of a value with no wire variant of its own, written as `stringValue`.
    Other(String),
    /// A value shape this encoder has no encoding for, such as key/value lists or
    /// raw bytes. Encoding it fails the whole document.
    Unsupported(&'static str),
}

impl AnyValue {
    /// Coerce any displayable value to its textual form.
    pub fn display(value: impl fmt::Display) -> Self {
        AnyValue::Other(value.to_string())
    }

    /// Returns the string payload for `String` and `Other` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnyValue::String(value) => Some(value.as_str()),
            AnyValue::Other(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&'static str> for AnyValue {
    fn from(value: &'static str) -> Self {
        AnyValue::String(value.into())
    }
}

impl From<String> for AnyValue {
    fn from(value: String) -> Self {
        AnyValue::String(value.into())
    }
}

impl From<Cow<'static, str>> for AnyValue {
    fn from(value: Cow<'static, str>) -> Self {
        AnyValue::String(value.into())
    }
}

impl From<StringValue> for AnyValue {
    fn from(value: StringValue) -> Self {
        AnyValue::String(value)
    }
}

impl From<bool> for AnyValue {
    fn from(value: bool) -> Self {
        AnyValue::Bool(value)
    }
}

impl From<f64> for AnyValue {
    fn from(value: f64) -> Self {
        AnyValue::Double(value)
    }
}

impl From<f32> for AnyValue {
    fn from(value: f32) -> Self {
        AnyValue::Double(f64::from(value))
    }
}

macro_rules! impl_from_lossless_int {
    ($($t:ty),+) => {
        $(
            impl From<$t> for AnyValue {
                fn from(value: $t) -> Self {
                    AnyValue::Int(i64::from(value))
                }
            }
        )+
    };
}

impl_from_lossless_int!(i8, i16, i32, i64, u8, u16, u32);

// Integers that may not fit an int64 keep their digits as text instead.
macro_rules! impl_from_wide_int {
    ($($t:ty),+) => {
        $(
            impl From<$t> for AnyValue {
                fn from(value: $t) -> Self {
                    i64::try_from(value)
                        .map(AnyValue::Int)
                        .unwrap_or_else(|_| AnyValue::Other(value.to_string()))
                }
            }
        )+
    };
}

impl_from_wide_int!(u64, usize, isize, i128, u128);

impl<T: Into<AnyValue>> From<Vec<T>> for AnyValue {
    fn from(values: Vec<T>) -> Self {
        AnyValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl From<opentelemetry::Value> for AnyValue {
    fn from(value: opentelemetry::Value) -> Self {
        use opentelemetry::{Array, Value};

        match value {
            Value::Bool(b) => AnyValue::Bool(b),
            Value::I64(i) => AnyValue::Int(i),
            Value::F64(f) => AnyValue::Double(f),
            Value::String(s) => AnyValue::String(s),
            Value::Array(Array::Bool(values)) => {
                AnyValue::Array(values.into_iter().map(AnyValue::Bool).collect())
            }
            Value::Array(Array::I64(values)) => {
                AnyValue::Array(values.into_iter().map(AnyValue::Int).collect())
            }
            Value::Array(Array::F64(values)) => {
                AnyValue::Array(values.into_iter().map(AnyValue::Double).collect())
            }
            Value::Array(Array::String(values)) => {
                AnyValue::Array(values.into_iter().map(AnyValue::String).collect())
            }
            #[allow(unreachable_patterns)]
            other => AnyValue::display(other),
        }
    }
}

#[cfg(feature = "logs")]
impl From<opentelemetry::logs::AnyValue> for AnyValue {
    fn from(value: opentelemetry::logs::AnyValue) -> Self {
        use opentelemetry::logs::AnyValue as LogsAnyValue;

        match value {
            LogsAnyValue::Int(i) => AnyValue::Int(i),
            LogsAnyValue::Double(d) => AnyValue::Double(d),
            LogsAnyValue::String(s) => AnyValue::String(s),
            LogsAnyValue::Boolean(b) => AnyValue::Bool(b),
            LogsAnyValue::ListAny(values) => {
                AnyValue::Array((*values).into_iter().map(Into::into).collect())
            }
            LogsAnyValue::Bytes(_) => AnyValue::Unsupported("bytes"),
            LogsAnyValue::Map(_) => AnyValue::Unsupported("kvlist"),
            #[allow(unreachable_patterns)]
            _ => AnyValue::Unsupported("unknown"),
        }
    }
}

/// A key and its value. A `None` value is a null: the pair is left out of the output.
///
/// Keys are not required to be unique, duplicates are written as given.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    /// The attribute name.
    pub key: Key,
    /// The attribute value, `None` for null.
    pub value: Option<AnyValue>,
}

impl KeyValue {
    /// Create a key/value pair.
    pub fn new(key: impl Into<Key>, value: impl Into<AnyValue>) -> Self {
        KeyValue {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Create a pair carrying a null value.
    pub fn null(key: impl Into<Key>) -> Self {
        KeyValue {
            key: key.into(),
            value: None,
        }
    }
}

impl From<opentelemetry::KeyValue> for KeyValue {
    fn from(kv: opentelemetry::KeyValue) -> Self {
        KeyValue {
            key: kv.key,
            value: Some(kv.value.into()),
        }
    }
}

impl From<&opentelemetry::KeyValue> for KeyValue {
    fn from(kv: &opentelemetry::KeyValue) -> Self {
        KeyValue::from(kv.clone())
    }
}

/// The entity producing telemetry, as an ordered attribute list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    attributes: Vec<KeyValue>,
}

impl Resource {
    /// Create a resource from attributes, keeping their order.
    pub fn new<T: IntoIterator<Item = KeyValue>>(attributes: T) -> Self {
        Resource {
            attributes: attributes.into_iter().collect(),
        }
    }

    /// A resource without attributes.
    pub fn empty() -> Self {
        Resource::default()
    }

    /// Iterate the attributes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, KeyValue> {
        self.attributes.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the resource has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub(crate) fn attributes(&self) -> &[KeyValue] {
        &self.attributes
    }
}

/// Attributes are ordered by key, the SDK resource keeps no insertion order.
impl From<&opentelemetry_sdk::Resource> for Resource {
    fn from(resource: &opentelemetry_sdk::Resource) -> Self {
        let mut attributes: Vec<KeyValue> = resource
            .iter()
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect();
        attributes.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        Resource { attributes }
    }
}

/// An immutable snapshot of items handed to one encode call.
///
/// The batch only borrows its items and can be iterated any number of times.
#[derive(Debug)]
pub struct Batch<'a, T> {
    items: &'a [T],
}

impl<T> Clone for Batch<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Batch<'_, T> {}

impl<'a, T> Batch<'a, T> {
    /// Create a batch over a slice of items.
    pub fn new(items: &'a [T]) -> Self {
        Batch { items }
    }

    /// Iterate the items in order.
    pub fn iter(&self) -> std::slice::Iter<'a, T> {
        self.items.iter()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn as_slice(&self) -> &'a [T] {
        self.items
    }
}

impl<'a, T> From<&'a [T]> for Batch<'a, T> {
    fn from(items: &'a [T]) -> Self {
        Batch::new(items)
    }
}

impl<'a, T> From<&'a Vec<T>> for Batch<'a, T> {
    fn from(items: &'a Vec<T>) -> Self {
        Batch::new(items.as_slice())
    }
}

impl<'a, T> IntoIterator for Batch<'a, T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

pub(crate) fn to_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Keeps at most `max_length` characters of `value`.
pub(crate) fn truncate(value: &str, max_length: Option<usize>) -> &str {
    match max_length.and_then(|max| value.char_indices().nth(max)) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

fn serialize_single_entry<S, V>(serializer: S, key: &str, value: &V) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

/// Writes one value as `{"<typeTag>": <payload>}`.
///
/// `max_length` truncates string payloads, including strings nested in arrays.
pub(crate) struct AnyValueWriter<'a> {
    value: &'a AnyValue,
    max_length: Option<usize>,
}

impl<'a> AnyValueWriter<'a> {
    pub(crate) fn new(value: &'a AnyValue, max_length: Option<usize>) -> Self {
        AnyValueWriter { value, max_length }
    }
}

impl Serialize for AnyValueWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.value {
            AnyValue::String(value) => serialize_single_entry(
                serializer,
                "stringValue",
                truncate(value.as_str(), self.max_length),
            ),
            AnyValue::Other(value) => serialize_single_entry(
                serializer,
                "stringValue",
                truncate(value, self.max_length),
            ),
            AnyValue::Bool(value) => serialize_single_entry(serializer, "boolValue", value),
            AnyValue::Int(value) => serialize_single_entry(serializer, "intValue", value),
            AnyValue::Double(value) => serialize_single_entry(serializer, "doubleValue", value),
            AnyValue::Array(values) => serialize_single_entry(
                serializer,
                "arrayValue",
                &ArrayValueWriter {
                    values,
                    max_length: self.max_length,
                },
            ),
            AnyValue::Unsupported(kind) => Err(S::Error::custom(format_args!(
                "{kind} values have no OTLP/JSON encoding"
            ))),
        }
    }
}

struct ArrayValueWriter<'a> {
    values: &'a [AnyValue],
    max_length: Option<usize>,
}

impl Serialize for ArrayValueWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            "values",
            &ValuesWriter {
                values: self.values,
                max_length: self.max_length,
            },
        )?;
        map.end()
    }
}

struct ValuesWriter<'a> {
    values: &'a [AnyValue],
    max_length: Option<usize>,
}

impl Serialize for ValuesWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(
            self.values
                .iter()
                .map(|value| AnyValueWriter::new(value, self.max_length)),
        )
    }
}

struct KeyValueWriter<'a> {
    key: &'a str,
    value: &'a AnyValue,
    max_length: Option<usize>,
}

impl Serialize for KeyValueWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("key", self.key)?;
        map.serialize_entry("value", &AnyValueWriter::new(self.value, self.max_length))?;
        map.end()
    }
}

/// Writes attributes as `[{"key": .., "value": ..}, ..]`, skipping null values.
pub(crate) struct AttributeListWriter<'a> {
    attributes: &'a [KeyValue],
    max_length: Option<usize>,
    excluded: Option<usize>,
}

impl<'a> AttributeListWriter<'a> {
    pub(crate) fn new(attributes: &'a [KeyValue]) -> Self {
        AttributeListWriter {
            attributes,
            max_length: None,
            excluded: None,
        }
    }

    pub(crate) fn with_max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    /// Leaves the attribute at `index` out of the list.
    pub(crate) fn excluding(mut self, index: Option<usize>) -> Self {
        self.excluded = index;
        self
    }

    fn entries(&self) -> impl Iterator<Item = KeyValueWriter<'a>> + '_ {
        self.attributes
            .iter()
            .enumerate()
            .filter(move |(index, _)| Some(*index) != self.excluded)
            .filter_map(move |(_, kv)| {
                kv.value.as_ref().map(|value| KeyValueWriter {
                    key: kv.key.as_str(),
                    value,
                    max_length: self.max_length,
                })
            })
    }

    /// Returns true when nothing would be written inside the array.
    pub(crate) fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

impl Serialize for AttributeListWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.entries())
    }
}

/// Writes `{"attributes": [..]}` for a resource. Resource values are never truncated.
pub(crate) struct ResourceWriter<'a> {
    resource: &'a Resource,
}

impl<'a> ResourceWriter<'a> {
    pub(crate) fn new(resource: &'a Resource) -> Self {
        ResourceWriter { resource }
    }
}

impl Serialize for ResourceWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_single_entry(
            serializer,
            "attributes",
            &AttributeListWriter::new(self.resource.attributes()),
        )
    }
}

/// Streams `document` into `writer` as compact JSON, then flushes.
pub(crate) fn write_document<W, T>(
    writer: W,
    document: &T,
    trailing_newline: bool,
) -> OtlpJsonResult<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let mut writer = io::BufWriter::new(writer);
    serde_json::to_writer(&mut writer, document)?;
    if trailing_newline {
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Destination shared by an exporter. The lock keeps one encode in flight per sink.
pub(crate) struct Sink {
    writer: Mutex<Option<Box<dyn Write + Send>>>,
}

impl Sink {
    pub(crate) fn new(writer: Box<dyn Write + Send>) -> Self {
        Sink {
            writer: Mutex::new(Some(writer)),
        }
    }

    pub(crate) fn write_with<F>(&self, encode: F) -> OtlpJsonResult<()>
    where
        F: FnOnce(&mut dyn Write) -> OtlpJsonResult<()>,
    {
        match self.writer.lock()?.as_mut() {
            Some(writer) => encode(writer),
            None => Err(OtlpJsonError::AlreadyShutdown),
        }
    }

    /// Flushes and drops the writer.
    pub(crate) fn close(&self) -> OtlpJsonResult<()> {
        match self.writer.lock()?.take() {
            Some(mut writer) => Ok(writer.flush()?),
            None => Err(OtlpJsonError::AlreadyShutdown),
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sink")
    }
}
