//! # OTLP/JSON Log Encoding
//!
//! [`LogsDocument`] encodes a [`Batch`] of [`LogRecord`]s as one
//! `{"resourceLogs": [...]}` document, and [`LogExporter`] writes one such document
//! per export call into the sink it was built with.
//!
//! All records of a batch are written under a single scope with no name. The
//! record's own instrumentation scope is not carried.
//!
//! ```
//! use opentelemetry::logs::Severity;
//! use opentelemetry_otlp_json::{Batch, KeyValue, LogRecord, LogsDocument, Resource};
//!
//! let resource = Resource::new([KeyValue::new("service.name", "checkout")]);
//! let records = vec![LogRecord::new(std::time::SystemTime::now())
//!     .with_severity_number(Severity::Info)
//!     .with_attribute("{OriginalFormat}", "order {id} placed")
//!     .with_attribute("id", 42)];
//!
//! let mut out = Vec::new();
//! LogsDocument::new(&resource, Batch::new(&records))
//!     .write_to(&mut out)
//!     .unwrap();
//! ```
//!
//! [`Batch`]: crate::Batch
use std::{borrow::Cow, time::SystemTime};

use opentelemetry::{
    logs::Severity,
    trace::{SpanId, TraceId},
    Key,
};

use crate::common::{AnyValue, KeyValue};

mod exporter;
mod transform;

pub use exporter::{LogExporter, LogExporterBuilder};
pub use transform::LogsDocument;

/// A log record ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// When the event occurred.
    pub timestamp: SystemTime,
    /// Severity text as given by the source. Blank text counts as absent.
    pub severity_text: Option<Cow<'static, str>>,
    /// Normalized severity.
    pub severity_number: Option<Severity>,
    /// Message with its template already rendered.
    pub formatted_message: Option<String>,
    /// Attributes in the order they were recorded.
    pub attributes: Vec<KeyValue>,
    /// Body set directly on the record.
    pub body: Option<AnyValue>,
    /// Trace the record was emitted in, [`TraceId::INVALID`] when none.
    pub trace_id: TraceId,
    /// Span the record was emitted in, [`SpanId::INVALID`] when none.
    pub span_id: SpanId,
}

impl LogRecord {
    /// Create an empty record at `timestamp`.
    pub fn new(timestamp: SystemTime) -> Self {
        LogRecord {
            timestamp,
            severity_text: None,
            severity_number: None,
            formatted_message: None,
            attributes: Vec::new(),
            body: None,
            trace_id: TraceId::INVALID,
            span_id: SpanId::INVALID,
        }
    }

    /// Set the severity text.
    pub fn with_severity_text(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.severity_text = Some(text.into());
        self
    }

    /// Set the severity number.
    pub fn with_severity_number(mut self, severity: Severity) -> Self {
        self.severity_number = Some(severity);
        self
    }

    /// Set the rendered message.
    pub fn with_formatted_message(mut self, message: impl Into<String>) -> Self {
        self.formatted_message = Some(message.into());
        self
    }

    /// Append one attribute.
    pub fn with_attribute(mut self, key: impl Into<Key>, value: impl Into<AnyValue>) -> Self {
        self.attributes.push(KeyValue::new(key, value));
        self
    }

    /// Append attributes, keeping their order.
    pub fn with_attributes<I>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        self.attributes.extend(attributes);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<AnyValue>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Correlate the record with a span.
    pub fn with_trace_context(mut self, trace_id: TraceId, span_id: SpanId) -> Self {
        self.trace_id = trace_id;
        self.span_id = span_id;
        self
    }
}

/// Records without a timestamp fall back to their observed timestamp, then to the epoch.
impl From<&opentelemetry_sdk::logs::SdkLogRecord> for LogRecord {
    fn from(record: &opentelemetry_sdk::logs::SdkLogRecord) -> Self {
        let timestamp = record
            .timestamp()
            .or_else(|| record.observed_timestamp())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let (trace_id, span_id) = record
            .trace_context()
            .map(|context| (context.trace_id, context.span_id))
            .unwrap_or((TraceId::INVALID, SpanId::INVALID));

        LogRecord {
            timestamp,
            severity_text: record
                .severity_text()
                .map(|text| Cow::Owned(text.to_string())),
            severity_number: record.severity_number(),
            formatted_message: None,
            attributes: record
                .attributes_iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
                .collect(),
            body: record.body().cloned().map(Into::into),
            trace_id,
            span_id,
        }
    }
}
