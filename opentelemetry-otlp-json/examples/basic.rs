//! run with `$ cargo run --example basic`

use std::time::{Duration, SystemTime};

use opentelemetry::logs::Severity;
use opentelemetry::trace::{SpanId, Status, TraceId};
use opentelemetry::InstrumentationScope;
use opentelemetry_otlp_json::{
    Batch, DataPoint, Event, HistogramDataPoint, KeyValue, LogExporter, LogRecord, Metric,
    MetricData, MetricExporter, Resource, Span, SpanExporter, SpanKind,
};

fn resource() -> Resource {
    Resource::new([
        KeyValue::new("service.name", "basic-example"),
        KeyValue::new("service.version", "0.1.0"),
    ])
}

fn emit_spans(trace_id: TraceId, span_id: SpanId) -> Result<(), Box<dyn std::error::Error>> {
    let exporter = SpanExporter::builder(std::io::stdout())
        .with_resource(resource())
        .build();

    let start = SystemTime::now();
    let spans = vec![Span::new(
        trace_id,
        span_id,
        "test_span",
        InstrumentationScope::builder("stdout-example").build(),
        start,
    )
    .with_kind(SpanKind::Internal)
    .with_duration(Duration::from_millis(5))
    .with_status(Status::Ok)
    .with_attribute("test_key", "test_value")
    .with_event(Event::new(
        "test_event",
        start,
        vec![KeyValue::new("test_event_key", "test_event_value")],
    ))];

    exporter.export(Batch::new(&spans))?;
    exporter.shutdown()?;
    Ok(())
}

fn emit_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let exporter = MetricExporter::builder(std::io::stdout())
        .with_resource(resource())
        .build();

    let scope = InstrumentationScope::builder("stdout-example")
        .with_version("0.1.0")
        .build();
    let start = SystemTime::now();
    let now = start + Duration::from_secs(1);
    let metrics = vec![
        Metric::new(
            "test_counter",
            scope.clone(),
            MetricData::LongSum(vec![DataPoint::new(start, now, 1)
                .with_attributes([KeyValue::new("test_key", "test_value")])]),
        ),
        Metric::new(
            "test_histogram",
            scope,
            MetricData::Histogram(vec![HistogramDataPoint::new(
                start,
                now,
                3,
                17.0,
                vec![1, 1, 1],
                vec![5.0, 10.0],
            )?]),
        )
        .with_unit("ms"),
    ];

    exporter.export(Batch::new(&metrics))?;
    exporter.shutdown()?;
    Ok(())
}

fn emit_logs(trace_id: TraceId, span_id: SpanId) -> Result<(), Box<dyn std::error::Error>> {
    let exporter = LogExporter::builder(std::io::stdout())
        .with_resource(resource())
        .build();

    let records = vec![LogRecord::new(SystemTime::now())
        .with_severity_number(Severity::Info)
        .with_attribute("{OriginalFormat}", "hello from {name}")
        .with_attribute("name", "basic-example")
        .with_trace_context(trace_id, span_id)];

    exporter.export(Batch::new(&records))?;
    exporter.shutdown()?;
    println!();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let trace_id = TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736")?;
    let span_id = SpanId::from_hex("00f067aa0ba902b7")?;

    emit_spans(trace_id, span_id)?;
    emit_metrics()?;
    emit_logs(trace_id, span_id)?;

    Ok(())
}
