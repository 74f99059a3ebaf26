//! Reads the encoded documents back through a typed OTLP/JSON model.
use opentelemetry::{
    trace::{SpanId, Status, TraceId},
    InstrumentationScope,
};
use opentelemetry_otlp_json::{Batch, KeyValue, Resource};
use serde::Deserialize;
use std::time::{Duration, SystemTime};

#[derive(Debug, Deserialize)]
struct OtlpKeyValue {
    key: String,
    value: OtlpAnyValue,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
enum OtlpAnyValue {
    StringValue(String),
    BoolValue(bool),
    IntValue(i64),
    DoubleValue(f64),
    ArrayValue { values: Vec<OtlpAnyValue> },
}

#[derive(Debug, Deserialize)]
struct OtlpResource {
    attributes: Vec<OtlpKeyValue>,
}

#[derive(Debug, Default, Deserialize)]
struct OtlpScope {
    name: Option<String>,
    version: Option<String>,
}

fn resource() -> Resource {
    Resource::new([
        KeyValue::new("service.name", "inventory"),
        KeyValue::new("service.instance.id", 3),
    ])
}

fn scope(name: &'static str) -> InstrumentationScope {
    InstrumentationScope::builder(name).with_version("1.2.0").build()
}

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(feature = "logs")]
mod logs {
    use super::*;
    use opentelemetry::logs::Severity;
    use opentelemetry_otlp_json::{LogRecord, LogsDocument};

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct LogsData {
        resource_logs: Vec<ResourceLogs>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ResourceLogs {
        resource: OtlpResource,
        scope_logs: Vec<ScopeLogs>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ScopeLogs {
        scope: OtlpScope,
        log_records: Vec<OtlpLogRecord>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct OtlpLogRecord {
        time_unix_nano: String,
        severity_text: Option<String>,
        severity_number: i32,
        #[serde(default)]
        attributes: Vec<OtlpKeyValue>,
        body: Option<OtlpAnyValue>,
        trace_id: Option<String>,
        span_id: Option<String>,
    }

    #[test]
    fn logs_read_back() {
        let trace_id = TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap();
        let span_id = SpanId::from_hex("00f067aa0ba902b7").unwrap();
        let records = vec![
            LogRecord::new(at(1))
                .with_severity_number(Severity::Warn)
                .with_attribute("{OriginalFormat}", "low stock for {sku}")
                .with_attribute("sku", "A-17")
                .with_trace_context(trace_id, span_id),
            LogRecord::new(at(2))
                .with_severity_text("fatal")
                .with_formatted_message("shutting down"),
        ];

        let resource = resource();
        let mut out = Vec::new();
        LogsDocument::new(&resource, Batch::new(&records))
            .write_to(&mut out)
            .unwrap();

        let data: LogsData = serde_json::from_slice(&out).unwrap();
        assert_eq!(data.resource_logs.len(), 1);
        let resource_logs = &data.resource_logs[0];
        assert_eq!(resource_logs.resource.attributes.len(), 2);
        assert_eq!(resource_logs.scope_logs.len(), 1);

        let scope_logs = &resource_logs.scope_logs[0];
        assert!(scope_logs.scope.name.is_none());
        assert_eq!(scope_logs.log_records.len(), 2);

        let first = &scope_logs.log_records[0];
        assert_eq!(first.time_unix_nano, "1000000000");
        assert_eq!(first.severity_text.as_deref(), Some("WARN"));
        assert_eq!(first.severity_number, Severity::Warn as i32);
        assert_eq!(
            first.body,
            Some(OtlpAnyValue::StringValue("low stock for {sku}".into()))
        );
        assert_eq!(first.attributes.len(), 1);
        assert_eq!(first.attributes[0].key, "sku");
        assert_eq!(first.trace_id.as_deref(), Some("4bf92f3577b34da6a3ce929d0e0e4736"));
        assert_eq!(first.span_id.as_deref(), Some("00f067aa0ba902b7"));

        let second = &scope_logs.log_records[1];
        assert_eq!(second.severity_text.as_deref(), Some("fatal"));
        assert_eq!(second.severity_number, 0);
        assert_eq!(second.body, Some(OtlpAnyValue::StringValue("shutting down".into())));
        assert!(second.attributes.is_empty());
        assert!(second.trace_id.is_none());
    }
}

#[cfg(feature = "metrics")]
mod metrics {
    use super::*;
    use opentelemetry_otlp_json::{DataPoint, HistogramDataPoint, Metric, MetricData, MetricsDocument};

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct MetricsData {
        resource_metrics: Vec<ResourceMetrics>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ResourceMetrics {
        resource: OtlpResource,
        scope_metrics: Vec<ScopeMetrics>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ScopeMetrics {
        scope: OtlpScope,
        metrics: Vec<OtlpMetric>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct OtlpMetric {
        name: String,
        description: String,
        unit: String,
        #[serde(rename = "type")]
        kind: String,
        sum: Option<Sum>,
        gauge: Option<Gauge>,
        histogram: Option<Histogram>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Sum {
        monotonic: bool,
        aggregation_temporality: String,
        data_points: Vec<NumberDataPoint>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Gauge {
        data_points: Vec<NumberDataPoint>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct NumberDataPoint {
        start_time_unix_nano: u64,
        time_unix_nano: u64,
        as_int: Option<i64>,
        as_double: Option<f64>,
        attributes: Vec<OtlpKeyValue>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Histogram {
        aggregation_temporality: String,
        data_points: Vec<HistogramPoint>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct HistogramPoint {
        count: u64,
        sum: f64,
        bucket_counts: Vec<u64>,
        explicit_bounds: Vec<f64>,
        attributes: Vec<OtlpKeyValue>,
    }

    #[test]
    fn metrics_read_back() {
        let metrics = vec![
            Metric::new(
                "orders.placed",
                scope("orders"),
                MetricData::LongSum(vec![DataPoint::new(at(10), at(20), 42)
                    .with_attributes([KeyValue::new("region", "eu")])]),
            )
            .with_unit("{order}"),
            Metric::new(
                "orders.latency",
                scope("orders"),
                MetricData::Histogram(vec![HistogramDataPoint::new(
                    at(10),
                    at(20),
                    5,
                    37.5,
                    vec![1, 3, 1],
                    vec![5.0, 10.0],
                )
                .unwrap()]),
            )
            .with_description("Order latency")
            .with_unit("ms"),
            Metric::new(
                "stock.level",
                scope("stock"),
                MetricData::DoubleGauge(vec![DataPoint::new(at(10), at(20), 0.75)]),
            ),
        ];

        let resource = resource();
        let mut out = Vec::new();
        MetricsDocument::new(&resource, Batch::new(&metrics))
            .write_to(&mut out)
            .unwrap();
        assert_eq!(out.last(), Some(&b'\n'));

        let data: MetricsData = serde_json::from_slice(&out).unwrap();
        let resource_metrics = &data.resource_metrics[0];
        assert_eq!(resource_metrics.resource.attributes.len(), 2);
        assert_eq!(resource_metrics.scope_metrics.len(), 2);

        let orders = &resource_metrics.scope_metrics[0];
        assert_eq!(orders.scope.name.as_deref(), Some("orders"));
        assert_eq!(orders.scope.version.as_deref(), Some("1.2.0"));
        assert_eq!(orders.metrics.len(), 2);

        let placed = &orders.metrics[0];
        assert_eq!(placed.name, "orders.placed");
        assert_eq!(placed.unit, "{order}");
        assert_eq!(placed.kind, "sum");
        let sum = placed.sum.as_ref().unwrap();
        assert!(sum.monotonic);
        assert_eq!(sum.aggregation_temporality, "CUMULATIVE");
        assert_eq!(sum.data_points[0].start_time_unix_nano, 10_000_000_000);
        assert_eq!(sum.data_points[0].time_unix_nano, 20_000_000_000);
        assert_eq!(sum.data_points[0].as_int, Some(42));
        assert_eq!(sum.data_points[0].attributes[0].key, "region");

        let latency = &orders.metrics[1];
        assert_eq!(latency.description, "Order latency");
        assert_eq!(latency.kind, "histogram");
        let histogram = latency.histogram.as_ref().unwrap();
        assert_eq!(histogram.aggregation_temporality, "CUMULATIVE");
        let point = &histogram.data_points[0];
        assert_eq!(point.count, 5);
        assert_eq!(point.sum, 37.5);
        assert_eq!(point.bucket_counts, vec![1, 3, 1]);
        assert_eq!(point.explicit_bounds, vec![5.0, 10.0]);
        assert!(point.attributes.is_empty());

        let stock = &resource_metrics.scope_metrics[1];
        assert_eq!(stock.scope.name.as_deref(), Some("stock"));
        let gauge = stock.metrics[0].gauge.as_ref().unwrap();
        assert_eq!(stock.metrics[0].kind, "gauge");
        assert_eq!(gauge.data_points[0].as_double, Some(0.75));
        assert!(gauge.data_points[0].as_int.is_none());
    }
}

#[cfg(feature = "trace")]
mod trace {
    use super::*;
    use opentelemetry_otlp_json::{Event, Link, Span, SpanKind, TracesDocument};

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct TracesData {
        resource_spans: Vec<ResourceSpans>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ResourceSpans {
        resource: OtlpResource,
        scope_spans: Vec<ScopeSpans>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ScopeSpans {
        scope: OtlpScope,
        spans: Vec<OtlpSpan>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct OtlpSpan {
        trace_id: String,
        span_id: String,
        parent_span_id: Option<String>,
        name: String,
        kind: String,
        start_time_unix_nano: u64,
        end_time_unix_nano: u64,
        status: Option<OtlpStatus>,
        #[serde(default)]
        attributes: Vec<OtlpKeyValue>,
        #[serde(default)]
        events: Vec<OtlpEvent>,
        #[serde(default)]
        links: Vec<OtlpLink>,
    }

    #[derive(Debug, Deserialize)]
    struct OtlpStatus {
        code: String,
        message: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct OtlpEvent {
        name: String,
        time_unix_nano: u64,
        #[serde(default)]
        attributes: Vec<OtlpKeyValue>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct OtlpLink {
        trace_id: String,
        span_id: String,
        #[serde(default)]
        attributes: Vec<OtlpKeyValue>,
    }

    #[test]
    fn traces_read_back() {
        let trace_id = TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap();
        let root_id = SpanId::from_hex("b7ad6b7169203331").unwrap();
        let child_id = SpanId::from_hex("00f067aa0ba902b7").unwrap();
        let linked_trace = TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap();

        let spans = vec![
            Span::new(trace_id, child_id, "reserve", scope("stock"), at(5))
                .with_parent_span_id(root_id)
                .with_kind(SpanKind::Client)
                .with_duration(Duration::from_millis(3))
                .with_status(Status::error("out of stock"))
                .with_attribute("sku", "A-17")
                .with_event(Event::new(
                    "retry",
                    at(5),
                    vec![KeyValue::new("attempt", 2)],
                ))
                .with_link(Link::new(linked_trace, root_id, Vec::new())),
            Span::new(trace_id, root_id, "POST /orders", scope("http"), at(4))
                .with_kind(SpanKind::Server)
                .with_duration(Duration::from_secs(2))
                .with_status(Status::Ok),
        ];

        let resource = resource();
        let mut out = Vec::new();
        TracesDocument::new(&resource, Batch::new(&spans))
            .write_to(&mut out)
            .unwrap();

        let data: TracesData = serde_json::from_slice(&out).unwrap();
        let resource_spans = &data.resource_spans[0];
        assert_eq!(resource_spans.resource.attributes.len(), 2);
        assert_eq!(
            resource_spans.resource.attributes[1].value,
            OtlpAnyValue::IntValue(3)
        );
        assert_eq!(resource_spans.scope_spans.len(), 2);

        let child = &resource_spans.scope_spans[0].spans[0];
        assert_eq!(resource_spans.scope_spans[0].scope.name.as_deref(), Some("stock"));
        assert_eq!(child.trace_id, "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(child.span_id, "00f067aa0ba902b7");
        assert_eq!(child.parent_span_id.as_deref(), Some("b7ad6b7169203331"));
        assert_eq!(child.name, "reserve");
        assert_eq!(child.kind, "SPAN_KIND_CLIENT");
        assert_eq!(child.start_time_unix_nano, 5_000_000_000);
        assert_eq!(child.end_time_unix_nano, 5_003_000_000);
        let status = child.status.as_ref().unwrap();
        assert_eq!(status.code, "STATUS_CODE_ERROR");
        assert_eq!(status.message.as_deref(), Some("out of stock"));
        assert_eq!(child.attributes.len(), 1);
        assert_eq!(child.events.len(), 1);
        assert_eq!(child.events[0].name, "retry");
        assert_eq!(child.events[0].time_unix_nano, 5_000_000_000);
        assert_eq!(child.events[0].attributes[0].value, OtlpAnyValue::IntValue(2));
        assert_eq!(child.links.len(), 1);
        assert_eq!(child.links[0].trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(child.links[0].span_id, "b7ad6b7169203331");
        assert!(child.links[0].attributes.is_empty());

        let root = &resource_spans.scope_spans[1].spans[0];
        assert_eq!(resource_spans.scope_spans[1].scope.name.as_deref(), Some("http"));
        assert!(root.parent_span_id.is_none());
        assert_eq!(root.kind, "SPAN_KIND_SERVER");
        assert_eq!(root.status.as_ref().unwrap().code, "STATUS_CODE_OK");
        assert!(root.status.as_ref().unwrap().message.is_none());
        assert!(root.attributes.is_empty());
        assert!(root.events.is_empty());
    }
}
