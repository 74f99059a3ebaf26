use std::io::Write;

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    common::{to_nanos, write_document, AttributeListWriter, Batch, Resource, ResourceWriter},
    error::OtlpJsonResult,
    metrics::{DataPoint, HistogramDataPoint, Metric, MetricData},
    scope::{group_by_scope, ScopeGroup, ScopeWriter},
};

const CUMULATIVE: &str = "CUMULATIVE";

/// One batch of metrics encoded as an OTLP/JSON `resourceMetrics` document.
///
/// Metric attributes are written without truncation.
#[derive(Debug)]
pub struct MetricsDocument<'a> {
    resource: &'a Resource,
    batch: Batch<'a, Metric>,
}

impl<'a> MetricsDocument<'a> {
    /// Encode `batch` as produced by `resource`.
    pub fn new(resource: &'a Resource, batch: Batch<'a, Metric>) -> Self {
        MetricsDocument { resource, batch }
    }

    /// Stream the document and a trailing newline into `writer`, then flush it.
    ///
    /// On error `writer` holds a truncated document that must be discarded.
    pub fn write_to<W: Write>(&self, writer: W) -> OtlpJsonResult<()> {
        write_document(writer, self, true)
    }
}

impl Serialize for MetricsDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("resourceMetrics", &[ResourceMetricsWriter { document: self }])?;
        map.end()
    }
}

struct ResourceMetricsWriter<'a> {
    document: &'a MetricsDocument<'a>,
}

impl Serialize for ResourceMetricsWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("resource", &ResourceWriter::new(self.document.resource))?;
        map.serialize_entry(
            "scopeMetrics",
            &ScopeMetricsListWriter {
                metrics: self.document.batch.as_slice(),
            },
        )?;
        map.end()
    }
}

struct ScopeMetricsListWriter<'a> {
    metrics: &'a [Metric],
}

impl Serialize for ScopeMetricsListWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(group_by_scope(self.metrics).map(|group| ScopeMetricsWriter { group }))
    }
}

struct ScopeMetricsWriter<'a> {
    group: ScopeGroup<'a, Metric>,
}

impl Serialize for ScopeMetricsWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("scope", &ScopeWriter::new(self.group.scope))?;
        map.serialize_entry("metrics", &MetricListWriter(self.group.items))?;
        map.end()
    }
}

struct MetricListWriter<'a>(&'a [Metric]);

impl Serialize for MetricListWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter().map(MetricWriter))
    }
}

struct MetricWriter<'a>(&'a Metric);

impl Serialize for MetricWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let metric = self.0;
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("name", &metric.name)?;
        map.serialize_entry("description", &metric.description)?;
        map.serialize_entry("unit", &metric.unit)?;

        match &metric.data {
            MetricData::LongSum(points) => {
                map.serialize_entry("type", "sum")?;
                map.serialize_entry("sum", &SumWriter(points))?;
            }
            MetricData::DoubleSum(points) => {
                map.serialize_entry("type", "sum")?;
                map.serialize_entry("sum", &SumWriter(points))?;
            }
            MetricData::LongGauge(points) => {
                map.serialize_entry("type", "gauge")?;
                map.serialize_entry("gauge", &GaugeWriter(points))?;
            }
            MetricData::DoubleGauge(points) => {
                map.serialize_entry("type", "gauge")?;
                map.serialize_entry("gauge", &GaugeWriter(points))?;
            }
            MetricData::Histogram(points) => {
                map.serialize_entry("type", "histogram")?;
                map.serialize_entry("histogram", &HistogramWriter(points))?;
            }
        }

        map.end()
    }
}

/// Scalar point values and the field they are written under.
trait NumberValue: Serialize {
    const FIELD: &'static str;
}

impl NumberValue for i64 {
    const FIELD: &'static str = "asInt";
}

impl NumberValue for f64 {
    const FIELD: &'static str = "asDouble";
}

struct SumWriter<'a, T>(&'a [DataPoint<T>]);

impl<T: NumberValue> Serialize for SumWriter<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("monotonic", &true)?;
        map.serialize_entry("aggregationTemporality", CUMULATIVE)?;
        map.serialize_entry("dataPoints", &DataPointsWriter(self.0))?;
        map.end()
    }
}

struct GaugeWriter<'a, T>(&'a [DataPoint<T>]);

impl<T: NumberValue> Serialize for GaugeWriter<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("dataPoints", &DataPointsWriter(self.0))?;
        map.end()
    }
}

struct DataPointsWriter<'a, T>(&'a [DataPoint<T>]);

impl<T: NumberValue> Serialize for DataPointsWriter<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter().map(DataPointWriter))
    }
}

struct DataPointWriter<'a, T>(&'a DataPoint<T>);

impl<T: NumberValue> Serialize for DataPointWriter<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let point = self.0;
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("startTimeUnixNano", &to_nanos(point.start_time))?;
        map.serialize_entry("timeUnixNano", &to_nanos(point.time))?;
        map.serialize_entry(T::FIELD, &point.value)?;
        map.serialize_entry("attributes", &AttributeListWriter::new(&point.attributes))?;
        map.end()
    }
}

struct HistogramWriter<'a>(&'a [HistogramDataPoint]);

impl Serialize for HistogramWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("aggregationTemporality", CUMULATIVE)?;
        map.serialize_entry("dataPoints", &HistogramPointsWriter(self.0))?;
        map.end()
    }
}

struct HistogramPointsWriter<'a>(&'a [HistogramDataPoint]);

impl Serialize for HistogramPointsWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter().map(HistogramPointWriter))
    }
}

struct HistogramPointWriter<'a>(&'a HistogramDataPoint);

impl Serialize for HistogramPointWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let point = self.0;
        let mut map = serializer.serialize_map(Some(7))?;
        map.serialize_entry("startTimeUnixNano", &to_nanos(point.start_time()))?;
        map.serialize_entry("timeUnixNano", &to_nanos(point.time()))?;
        map.serialize_entry("count", &point.count())?;
        map.serialize_entry("sum", &point.sum())?;
        map.serialize_entry("bucketCounts", point.bucket_counts())?;
        map.serialize_entry("explicitBounds", point.explicit_bounds())?;
        map.serialize_entry("attributes", &AttributeListWriter::new(point.attributes()))?;
        map.end()
    }
}
