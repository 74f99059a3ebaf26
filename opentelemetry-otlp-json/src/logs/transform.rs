use std::io::Write;

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    common::{
        to_nanos, write_document, AnyValue, AnyValueWriter, AttributeListWriter, Batch, Resource,
        ResourceWriter,
    },
    config::AttributeLimits,
    error::OtlpJsonResult,
    logs::LogRecord,
    scope::ScopeWriter,
};

/// Attribute holding the unformatted message template.
pub(crate) const ORIGINAL_FORMAT_KEY: &str = "{OriginalFormat}";

/// One batch of log records encoded as an OTLP/JSON `resourceLogs` document.
#[derive(Debug)]
pub struct LogsDocument<'a> {
    resource: &'a Resource,
    batch: Batch<'a, LogRecord>,
    limits: AttributeLimits,
}

impl<'a> LogsDocument<'a> {
    /// Encode `batch` as produced by `resource`, without attribute limits.
    pub fn new(resource: &'a Resource, batch: Batch<'a, LogRecord>) -> Self {
        LogsDocument {
            resource,
            batch,
            limits: AttributeLimits::unlimited(),
        }
    }

    /// Apply log record attribute limits.
    pub fn with_limits(mut self, limits: AttributeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Stream the document into `writer` and flush it. No newline follows the document.
    ///
    /// On error `writer` holds a truncated document that must be discarded.
    pub fn write_to<W: Write>(&self, writer: W) -> OtlpJsonResult<()> {
        write_document(writer, self, false)
    }
}

impl Serialize for LogsDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("resourceLogs", &[ResourceLogsWriter { document: self }])?;
        map.end()
    }
}

struct ResourceLogsWriter<'a> {
    document: &'a LogsDocument<'a>,
}

impl Serialize for ResourceLogsWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("resource", &ResourceWriter::new(self.document.resource))?;
        map.serialize_entry("scopeLogs", &[ScopeLogsWriter { document: self.document }])?;
        map.end()
    }
}

// Every record lands in one scope without a name.
struct ScopeLogsWriter<'a> {
    document: &'a LogsDocument<'a>,
}

impl Serialize for ScopeLogsWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let max_length = self.document.limits.value_length_limit;
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("scope", &ScopeWriter::empty())?;
        map.serialize_entry(
            "logRecords",
            &LogRecordsWriter {
                batch: self.document.batch,
                max_length,
            },
        )?;
        map.end()
    }
}

struct LogRecordsWriter<'a> {
    batch: Batch<'a, LogRecord>,
    max_length: Option<usize>,
}

impl Serialize for LogRecordsWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.batch.iter().map(|record| LogRecordWriter {
            record,
            max_length: self.max_length,
        }))
    }
}

/// Where the body of a record comes from.
#[derive(Debug, PartialEq)]
enum Body<'a> {
    /// Written as a plain `stringValue`.
    Text(&'a str),
    /// Written with its own type.
    Value(&'a AnyValue),
}

/// The resolved body and, when the body came from an attribute, that attribute's index.
///
/// A record with no message, no textual template and no body gets an empty text body.
fn resolve_body(record: &LogRecord) -> (Body<'_>, Option<usize>) {
    if let Some(message) = record.formatted_message.as_deref() {
        return (Body::Text(message), None);
    }

    let original_format = record
        .attributes
        .iter()
        .position(|kv| kv.key.as_str() == ORIGINAL_FORMAT_KEY);
    if let Some(index) = original_format {
        let template = record.attributes[index]
            .value
            .as_ref()
            .and_then(AnyValue::as_str);
        if let Some(template) = template {
            return (Body::Text(template), Some(index));
        }
    }

    match &record.body {
        Some(body) => (Body::Value(body), None),
        None => (Body::Text(""), None),
    }
}

/// Explicit text unless blank, else the short name of the severity number.
fn severity_text(record: &LogRecord) -> Option<&str> {
    match record.severity_text.as_deref() {
        Some(text) if !text.trim().is_empty() => Some(text),
        _ => record.severity_number.map(|severity| severity.name()),
    }
}

struct TextValue<'a>(&'a str);

impl Serialize for TextValue<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("stringValue", self.0)?;
        map.end()
    }
}

struct LogRecordWriter<'a> {
    record: &'a LogRecord,
    max_length: Option<usize>,
}

impl Serialize for LogRecordWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let record = self.record;
        let (body, body_attribute) = resolve_body(record);

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("timeUnixNano", &to_nanos(record.timestamp).to_string())?;
        if let Some(text) = severity_text(record) {
            map.serialize_entry("severityText", text)?;
        }
        map.serialize_entry(
            "severityNumber",
            &record.severity_number.map_or(0, |severity| severity as i32),
        )?;

        if !record.attributes.is_empty() {
            map.serialize_entry(
                "attributes",
                &AttributeListWriter::new(&record.attributes)
                    .with_max_length(self.max_length)
                    .excluding(body_attribute),
            )?;
        }

        match body {
            Body::Text(text) => map.serialize_entry("body", &TextValue(text))?,
            Body::Value(value) => map.serialize_entry("body", &AnyValueWriter::new(value, None))?,
        }

        if record.trace_id != opentelemetry::trace::TraceId::INVALID
            && record.span_id != opentelemetry::trace::SpanId::INVALID
        {
            map.serialize_entry("traceId", &record.trace_id.to_string())?;
            map.serialize_entry("spanId", &record.span_id.to_string())?;
        }

        map.end()
    }
}
