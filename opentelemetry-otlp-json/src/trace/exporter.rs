use core::fmt;
use std::{io::Write, time::Duration};

use opentelemetry::otel_debug;
use opentelemetry_sdk::{error::OTelSdkResult, trace::SpanData};

use crate::{
    common::{Batch, Resource, Sink},
    config::{AttributeLimits, SdkLimits},
    error::OtlpJsonResult,
    trace::{Span, TracesDocument},
};

/// Writes one newline-terminated OTLP/JSON traces document per export into its sink.
pub struct SpanExporter {
    sink: Sink,
    resource: Resource,
    limits: AttributeLimits,
}

impl fmt::Debug for SpanExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpanExporter")
    }
}

impl SpanExporter {
    /// Start building an exporter that writes into `writer`.
    pub fn builder(writer: impl Write + Send + 'static) -> SpanExporterBuilder {
        SpanExporterBuilder {
            writer: Box::new(writer),
            resource: Resource::empty(),
            limits: None,
        }
    }

    /// Encode `batch` as one document and write it to the sink.
    pub fn export(&self, batch: Batch<'_, Span>) -> OtlpJsonResult<()> {
        otel_debug!(name: "OtlpJsonSpanExporter.ExportStarted", span_count = batch.len());

        let result = self.sink.write_with(|writer| {
            TracesDocument::new(&self.resource, batch)
                .with_limits(self.limits)
                .write_to(writer)
        });

        match &result {
            Ok(()) => {
                otel_debug!(name: "OtlpJsonSpanExporter.ExportSucceeded");
            }
            Err(err) => {
                otel_debug!(name: "OtlpJsonSpanExporter.ExportFailed", error = format!("{err}"));
            }
        }
        result
    }

    /// Flush and release the sink.
    pub fn shutdown(&self) -> OtlpJsonResult<()> {
        otel_debug!(name: "OtlpJsonSpanExporter.Shutdown");
        self.sink.close()
    }

    /// Replace the resource written with every document.
    pub fn set_resource(&mut self, resource: Resource) {
        self.resource = resource;
    }
}

impl opentelemetry_sdk::trace::SpanExporter for SpanExporter {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        let spans: Vec<Span> = batch.iter().map(Span::from).collect();
        SpanExporter::export(self, Batch::new(&spans)).map_err(Into::into)
    }

    fn shutdown_with_timeout(&mut self, _timeout: Duration) -> OTelSdkResult {
        SpanExporter::shutdown(self).map_err(Into::into)
    }

    fn set_resource(&mut self, resource: &opentelemetry_sdk::Resource) {
        self.resource = resource.into();
    }
}

/// Builder for [`SpanExporter`].
pub struct SpanExporterBuilder {
    writer: Box<dyn Write + Send>,
    resource: Resource,
    limits: Option<AttributeLimits>,
}

impl fmt::Debug for SpanExporterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanExporterBuilder")
            .field("resource", &self.resource)
            .field("limits", &self.limits)
            .finish()
    }
}

impl SpanExporterBuilder {
    /// Resource written with every document. Defaults to an empty resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    /// Attribute limits for spans, span events and span links. Defaults to the span
    /// limits found in the environment.
    pub fn with_limits(mut self, limits: AttributeLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Build the exporter.
    pub fn build(self) -> SpanExporter {
        SpanExporter {
            sink: Sink::new(self.writer),
            resource: self.resource,
            limits: self.limits.unwrap_or_else(|| SdkLimits::default().span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{tests::SharedBuffer, KeyValue};
    use crate::config::OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT;
    use crate::error::OtlpJsonError;
    use opentelemetry::{
        trace::{Span as _, SpanId, TraceId, Tracer as _, TracerProvider as _},
        InstrumentationScope,
    };
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use serde_json::{json, Value};
    use std::time::SystemTime;

    fn spans() -> Vec<Span> {
        vec![Span::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            "checkout",
            InstrumentationScope::builder("shop").build(),
            SystemTime::UNIX_EPOCH,
        )
        .with_attribute("cart.id", "abcdef")]
    }

    #[test]
    fn limits_default_to_environment() {
        let buffer = SharedBuffer::default();
        let exporter = temp_env::with_var(OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT, Some("3"), || {
            SpanExporter::builder(buffer.clone())
                .with_resource(Resource::new([KeyValue::new("service.name", "shop")]))
                .build()
        });

        let spans = spans();
        exporter.export(Batch::new(&spans)).unwrap();

        let contents = buffer.contents();
        assert_eq!(contents.last(), Some(&b'\n'));
        let document: Value = serde_json::from_slice(&contents).unwrap();
        assert_eq!(
            document["resourceSpans"][0]["scopeSpans"][0]["spans"][0]["attributes"][0]["value"]
                ["stringValue"],
            "abc"
        );
    }

    #[test]
    fn exports_through_tracer_provider() {
        let buffer = SharedBuffer::default();
        let exporter = SpanExporter::builder(buffer.clone())
            .with_limits(AttributeLimits::unlimited())
            .build();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter)
            .with_resource(
                opentelemetry_sdk::Resource::builder_empty()
                    .with_attribute(opentelemetry::KeyValue::new("service.name", "shop"))
                    .build(),
            )
            .build();

        let tracer = provider.tracer("checkout-service");
        let mut span = tracer.start("checkout");
        span.set_attribute(opentelemetry::KeyValue::new("cart.id", "abcdef"));
        span.end();

        let contents = String::from_utf8(buffer.contents()).unwrap();
        let document: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        let resource_spans = &document["resourceSpans"][0];
        assert!(resource_spans["resource"]["attributes"]
            .as_array()
            .unwrap()
            .contains(&json!({"key": "service.name", "value": {"stringValue": "shop"}})));

        let scope_spans = &resource_spans["scopeSpans"][0];
        assert_eq!(scope_spans["scope"]["name"], "checkout-service");
        let span = &scope_spans["spans"][0];
        assert_eq!(span["name"], "checkout");
        assert_eq!(span["kind"], "SPAN_KIND_INTERNAL");
        assert_eq!(span["traceId"].as_str().unwrap().len(), 32);
        assert_eq!(
            span["attributes"],
            json!([{"key": "cart.id", "value": {"stringValue": "abcdef"}}])
        );
    }

    #[test]
    fn export_after_shutdown_fails() {
        let exporter = SpanExporter::builder(SharedBuffer::default())
            .with_limits(AttributeLimits::unlimited())
            .build();
        exporter.shutdown().unwrap();

        let spans = spans();
        let err = exporter.export(Batch::new(&spans)).unwrap_err();
        assert!(matches!(err, OtlpJsonError::AlreadyShutdown));
        assert!(matches!(
            opentelemetry_sdk::error::OTelSdkError::from(err),
            opentelemetry_sdk::error::OTelSdkError::AlreadyShutdown
        ));
    }
}
