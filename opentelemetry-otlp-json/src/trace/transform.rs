use std::io::Write;

use opentelemetry::trace::{SpanId, Status};
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    common::{to_nanos, write_document, AttributeListWriter, Batch, KeyValue, Resource, ResourceWriter},
    config::AttributeLimits,
    error::OtlpJsonResult,
    scope::{group_by_scope, ScopeGroup, ScopeWriter},
    trace::{Event, Link, Span},
};

/// One batch of spans encoded as an OTLP/JSON `resourceSpans` document.
#[derive(Debug)]
pub struct TracesDocument<'a> {
    resource: &'a Resource,
    batch: Batch<'a, Span>,
    limits: AttributeLimits,
}

impl<'a> TracesDocument<'a> {
    /// Encode `batch` as produced by `resource`, without attribute limits.
    pub fn new(resource: &'a Resource, batch: Batch<'a, Span>) -> Self {
        TracesDocument {
            resource,
            batch,
            limits: AttributeLimits::unlimited(),
        }
    }

    /// Apply span attribute limits. They also cover event and link attributes.
    pub fn with_limits(mut self, limits: AttributeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Stream the document and a trailing newline into `writer`, then flush it.
    ///
    /// On error `writer` holds a truncated document that must be discarded.
    pub fn write_to<W: Write>(&self, writer: W) -> OtlpJsonResult<()> {
        write_document(writer, self, true)
    }
}

impl Serialize for TracesDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("resourceSpans", &[ResourceSpansWriter { document: self }])?;
        map.end()
    }
}

struct ResourceSpansWriter<'a> {
    document: &'a TracesDocument<'a>,
}

impl Serialize for ResourceSpansWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let max_length = self.document.limits.value_length_limit;
        let spans = self.document.batch.as_slice();

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("resource", &ResourceWriter::new(self.document.resource))?;
        map.serialize_entry(
            "scopeSpans",
            &ScopeSpansListWriter { spans, max_length },
        )?;
        map.end()
    }
}

struct ScopeSpansListWriter<'a> {
    spans: &'a [Span],
    max_length: Option<usize>,
}

impl Serialize for ScopeSpansListWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(group_by_scope(self.spans).map(|group| ScopeSpansWriter {
            group,
            max_length: self.max_length,
        }))
    }
}

struct ScopeSpansWriter<'a> {
    group: ScopeGroup<'a, Span>,
    max_length: Option<usize>,
}

impl Serialize for ScopeSpansWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("scope", &ScopeWriter::new(self.group.scope))?;
        map.serialize_entry(
            "spans",
            &SpanListWriter {
                spans: self.group.items,
                max_length: self.max_length,
            },
        )?;
        map.end()
    }
}

struct SpanListWriter<'a> {
    spans: &'a [Span],
    max_length: Option<usize>,
}

impl Serialize for SpanListWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.spans.iter().map(|span| SpanWriter {
            span,
            max_length: self.max_length,
        }))
    }
}

/// Writes `"attributes"` unless no attribute would be written.
fn serialize_attributes<M>(
    map: &mut M,
    attributes: &[KeyValue],
    max_length: Option<usize>,
) -> Result<(), M::Error>
where
    M: SerializeMap,
{
    let writer = AttributeListWriter::new(attributes).with_max_length(max_length);
    if writer.is_empty() {
        return Ok(());
    }
    map.serialize_entry("attributes", &writer)
}

struct SpanWriter<'a> {
    span: &'a Span,
    max_length: Option<usize>,
}

impl Serialize for SpanWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let span = self.span;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("traceId", &span.trace_id.to_string())?;
        map.serialize_entry("spanId", &span.span_id.to_string())?;
        if span.parent_span_id != SpanId::INVALID {
            map.serialize_entry("parentSpanId", &span.parent_span_id.to_string())?;
        }
        map.serialize_entry("name", &span.name)?;
        map.serialize_entry("kind", span.kind.as_str())?;
        map.serialize_entry("startTimeUnixNano", &to_nanos(span.start_time))?;
        map.serialize_entry("endTimeUnixNano", &to_nanos(span.end_time()))?;

        if span.status != Status::Unset {
            map.serialize_entry("status", &StatusWriter(&span.status))?;
        }

        serialize_attributes(&mut map, &span.attributes, self.max_length)?;

        if !span.events.is_empty() {
            map.serialize_entry(
                "events",
                &EventListWriter {
                    events: &span.events,
                    max_length: self.max_length,
                },
            )?;
        }
        if !span.links.is_empty() {
            map.serialize_entry(
                "links",
                &LinkListWriter {
                    links: &span.links,
                    max_length: self.max_length,
                },
            )?;
        }

        map.end()
    }
}

struct StatusWriter<'a>(&'a Status);

impl Serialize for StatusWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        match self.0 {
            Status::Error { description } => {
                map.serialize_entry("code", "STATUS_CODE_ERROR")?;
                if !description.is_empty() {
                    map.serialize_entry("message", description)?;
                }
            }
            Status::Ok => map.serialize_entry("code", "STATUS_CODE_OK")?,
            Status::Unset => map.serialize_entry("code", "STATUS_CODE_UNSET")?,
        }
        map.end()
    }
}

struct EventListWriter<'a> {
    events: &'a [Event],
    max_length: Option<usize>,
}

impl Serialize for EventListWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.events.iter().map(|event| EventWriter {
            event,
            max_length: self.max_length,
        }))
    }
}

struct EventWriter<'a> {
    event: &'a Event,
    max_length: Option<usize>,
}

impl Serialize for EventWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.event.name)?;
        map.serialize_entry("timeUnixNano", &to_nanos(self.event.timestamp))?;
        serialize_attributes(&mut map, &self.event.attributes, self.max_length)?;
        map.end()
    }
}

struct LinkListWriter<'a> {
    links: &'a [Link],
    max_length: Option<usize>,
}

impl Serialize for LinkListWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.links.iter().map(|link| LinkWriter {
            link,
            max_length: self.max_length,
        }))
    }
}

struct LinkWriter<'a> {
    link: &'a Link,
    max_length: Option<usize>,
}

impl Serialize for LinkWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("traceId", &self.link.trace_id.to_string())?;
        map.serialize_entry("spanId", &self.link.span_id.to_string())?;
        serialize_attributes(&mut map, &self.link.attributes, self.max_length)?;
        map.end()
    }
}
