//! # OTLP/JSON Trace Encoding
//!
//! [`TracesDocument`] encodes a [`Batch`](crate::Batch) of [`Span`]s as one
//! `{"resourceSpans": [...]}` document followed by a newline. Adjacent spans of the
//! same instrumentation scope share one `scopeSpans` entry.
//!
//! Optional parts of a span are left out entirely when they hold nothing: there is no
//! `parentSpanId` for root spans, no `status` while it is unset, and no `attributes`,
//! `events` or `links` key for empty lists.
use std::{
    borrow::Cow,
    time::{Duration, SystemTime},
};

use opentelemetry::{
    trace::{SpanId, Status, TraceId},
    InstrumentationScope, Key,
};

use crate::{
    common::{AnyValue, KeyValue},
    scope::Scoped,
};

mod exporter;
mod transform;

pub use exporter::{SpanExporter, SpanExporterBuilder};
pub use transform::TracesDocument;

/// The role of a span in a trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// No kind recorded.
    #[default]
    Unspecified,
    /// Internal operation.
    Internal,
    /// Server side of a synchronous request.
    Server,
    /// Client side of a synchronous request.
    Client,
    /// Sender of an asynchronous message.
    Producer,
    /// Receiver of an asynchronous message.
    Consumer,
}

impl SpanKind {
    /// Symbolic OTLP/JSON name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Unspecified => "SPAN_KIND_UNSPECIFIED",
            SpanKind::Internal => "SPAN_KIND_INTERNAL",
            SpanKind::Server => "SPAN_KIND_SERVER",
            SpanKind::Client => "SPAN_KIND_CLIENT",
            SpanKind::Producer => "SPAN_KIND_PRODUCER",
            SpanKind::Consumer => "SPAN_KIND_CONSUMER",
        }
    }
}

impl From<opentelemetry::trace::SpanKind> for SpanKind {
    fn from(kind: opentelemetry::trace::SpanKind) -> Self {
        use opentelemetry::trace::SpanKind as ApiSpanKind;

        match kind {
            ApiSpanKind::Client => SpanKind::Client,
            ApiSpanKind::Server => SpanKind::Server,
            ApiSpanKind::Producer => SpanKind::Producer,
            ApiSpanKind::Consumer => SpanKind::Consumer,
            ApiSpanKind::Internal => SpanKind::Internal,
            #[allow(unreachable_patterns)]
            _ => SpanKind::Unspecified,
        }
    }
}

/// A timestamped annotation on a span.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name.
    pub name: Cow<'static, str>,
    /// When the event occurred.
    pub timestamp: SystemTime,
    /// Event attributes.
    pub attributes: Vec<KeyValue>,
}

impl Event {
    /// Create an event.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Event {
            name: name.into(),
            timestamp,
            attributes,
        }
    }
}

impl From<&opentelemetry::trace::Event> for Event {
    fn from(event: &opentelemetry::trace::Event) -> Self {
        Event {
            name: event.name.clone(),
            timestamp: event.timestamp,
            attributes: event.attributes.iter().map(Into::into).collect(),
        }
    }
}

/// A reference from a span to another span.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Trace of the linked span.
    pub trace_id: TraceId,
    /// The linked span.
    pub span_id: SpanId,
    /// Link attributes.
    pub attributes: Vec<KeyValue>,
}

impl Link {
    /// Create a link.
    pub fn new(trace_id: TraceId, span_id: SpanId, attributes: Vec<KeyValue>) -> Self {
        Link {
            trace_id,
            span_id,
            attributes,
        }
    }
}

impl From<&opentelemetry::trace::Link> for Link {
    fn from(link: &opentelemetry::trace::Link) -> Self {
        Link {
            trace_id: link.span_context.trace_id(),
            span_id: link.span_context.span_id(),
            attributes: link.attributes.iter().map(Into::into).collect(),
        }
    }
}

/// A finished span ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Trace the span belongs to.
    pub trace_id: TraceId,
    /// Id of the span.
    pub span_id: SpanId,
    /// Parent of the span, [`SpanId::INVALID`] for root spans.
    pub parent_span_id: SpanId,
    /// Operation name.
    pub name: Cow<'static, str>,
    /// Span kind.
    pub kind: SpanKind,
    /// When the span started.
    pub start_time: SystemTime,
    /// How long the span lasted. The end time is `start_time + duration`.
    pub duration: Duration,
    /// Final status.
    pub status: Status,
    /// Span attributes.
    pub attributes: Vec<KeyValue>,
    /// Events in the order they were added.
    pub events: Vec<Event>,
    /// Links in the order they were added.
    pub links: Vec<Link>,
    /// Scope of the tracer that created the span.
    pub scope: InstrumentationScope,
}

impl Span {
    /// Create a root span of zero duration and unspecified kind.
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        name: impl Into<Cow<'static, str>>,
        scope: InstrumentationScope,
        start_time: SystemTime,
    ) -> Self {
        Span {
            trace_id,
            span_id,
            parent_span_id: SpanId::INVALID,
            name: name.into(),
            kind: SpanKind::Unspecified,
            start_time,
            duration: Duration::ZERO,
            status: Status::Unset,
            attributes: Vec::new(),
            events: Vec::new(),
            links: Vec::new(),
            scope,
        }
    }

    /// Set the parent span.
    pub fn with_parent_span_id(mut self, parent_span_id: SpanId) -> Self {
        self.parent_span_id = parent_span_id;
        self
    }

    /// Set the kind.
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Append one attribute.
    pub fn with_attribute(mut self, key: impl Into<Key>, value: impl Into<AnyValue>) -> Self {
        self.attributes.push(KeyValue::new(key, value));
        self
    }

    /// Append an event.
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Append a link.
    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// When the span ended. A duration that overflows the clock yields the start time.
    pub fn end_time(&self) -> SystemTime {
        self.start_time
            .checked_add(self.duration)
            .unwrap_or(self.start_time)
    }
}

impl Scoped for Span {
    fn scope(&self) -> &InstrumentationScope {
        &self.scope
    }
}

/// An end time before the start time yields a zero duration.
impl From<&opentelemetry_sdk::trace::SpanData> for Span {
    fn from(data: &opentelemetry_sdk::trace::SpanData) -> Self {
        Span {
            trace_id: data.span_context.trace_id(),
            span_id: data.span_context.span_id(),
            parent_span_id: data.parent_span_id,
            name: data.name.clone(),
            kind: data.span_kind.clone().into(),
            start_time: data.start_time,
            duration: data
                .end_time
                .duration_since(data.start_time)
                .unwrap_or_default(),
            status: data.status.clone(),
            attributes: data.attributes.iter().map(Into::into).collect(),
            events: data.events.events.iter().map(Into::into).collect(),
            links: data.links.links.iter().map(Into::into).collect(),
            scope: data.instrumentation_scope.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::SpanKind as ApiSpanKind;

    #[test]
    fn kind_names() {
        assert_eq!(SpanKind::default().as_str(), "SPAN_KIND_UNSPECIFIED");
        assert_eq!(SpanKind::from(ApiSpanKind::Server).as_str(), "SPAN_KIND_SERVER");
        assert_eq!(SpanKind::from(ApiSpanKind::Client).as_str(), "SPAN_KIND_CLIENT");
        assert_eq!(SpanKind::from(ApiSpanKind::Producer).as_str(), "SPAN_KIND_PRODUCER");
        assert_eq!(SpanKind::from(ApiSpanKind::Consumer).as_str(), "SPAN_KIND_CONSUMER");
        assert_eq!(SpanKind::from(ApiSpanKind::Internal).as_str(), "SPAN_KIND_INTERNAL");
    }

    #[test]
    fn end_time_is_start_plus_duration() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let span = Span::new(
            TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap(),
            SpanId::from_hex("b7ad6b7169203331").unwrap(),
            "op",
            InstrumentationScope::builder("t").build(),
            start,
        )
        .with_duration(Duration::from_millis(250));

        assert_eq!(span.end_time(), start + Duration::from_millis(250));
    }

    #[test]
    fn overflowing_duration_ends_at_start() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let span = Span::new(
            TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap(),
            SpanId::from_hex("b7ad6b7169203331").unwrap(),
            "op",
            InstrumentationScope::builder("t").build(),
            start,
        )
        .with_duration(Duration::MAX);

        assert_eq!(span.end_time(), start);
    }

    #[test]
    fn api_events_and_links_convert() {
        let at = SystemTime::UNIX_EPOCH;
        let event = opentelemetry::trace::Event::new(
            "retry",
            at,
            vec![opentelemetry::KeyValue::new("attempt", 2)],
            0,
        );
        assert_eq!(
            Event::from(&event),
            Event::new("retry", at, vec![KeyValue::new("attempt", 2)])
        );

        let trace_id = TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap();
        let span_id = SpanId::from_hex("00f067aa0ba902b7").unwrap();
        let context = opentelemetry::trace::SpanContext::new(
            trace_id,
            span_id,
            opentelemetry::trace::TraceFlags::SAMPLED,
            false,
            Default::default(),
        );
        let link = opentelemetry::trace::Link::with_context(context);
        let converted = Link::from(&link);
        assert_eq!(converted.trace_id, trace_id);
        assert_eq!(converted.span_id, span_id);
        assert!(converted.attributes.is_empty());
    }
}
