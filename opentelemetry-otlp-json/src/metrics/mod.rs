//! # OTLP/JSON Metric Encoding
//!
//! [`MetricsDocument`] encodes a [`Batch`](crate::Batch) of [`Metric`]s as one
//! `{"resourceMetrics": [...]}` document followed by a newline. Adjacent metrics of the
//! same instrumentation scope share one `scopeMetrics` entry.
//!
//! Only cumulative temporality is written. Sums are always monotonic.
use std::{borrow::Cow, time::SystemTime};

use opentelemetry::{otel_debug, InstrumentationScope};
use opentelemetry_sdk::metrics::data::{self, AggregatedMetrics, ResourceMetrics};

use crate::{
    common::KeyValue,
    error::{OtlpJsonError, OtlpJsonResult},
    scope::Scoped,
};

mod exporter;
mod transform;

pub use exporter::{MetricExporter, MetricExporterBuilder};
pub use transform::MetricsDocument;

/// The shape of a metric's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonic sum of integers.
    LongSum,
    /// Monotonic sum of floating point numbers.
    DoubleSum,
    /// Last integer value.
    LongGauge,
    /// Last floating point value.
    DoubleGauge,
    /// Explicit bucket histogram.
    Histogram,
}

/// A metric stream with its data points.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Instrument name.
    pub name: Cow<'static, str>,
    /// Instrument description, may be empty.
    pub description: Cow<'static, str>,
    /// Unit of the values, may be empty.
    pub unit: Cow<'static, str>,
    /// Scope of the meter that recorded the metric.
    pub scope: InstrumentationScope,
    /// Data points of the metric.
    pub data: MetricData,
}

impl Metric {
    /// Create a metric with an empty description and unit.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        scope: InstrumentationScope,
        data: MetricData,
    ) -> Self {
        Metric {
            name: name.into(),
            description: Cow::Borrowed(""),
            unit: Cow::Borrowed(""),
            scope,
            data,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: impl Into<Cow<'static, str>>) -> Self {
        self.unit = unit.into();
        self
    }

    /// The kind of data this metric carries.
    pub fn kind(&self) -> MetricKind {
        match self.data {
            MetricData::LongSum(_) => MetricKind::LongSum,
            MetricData::DoubleSum(_) => MetricKind::DoubleSum,
            MetricData::LongGauge(_) => MetricKind::LongGauge,
            MetricData::DoubleGauge(_) => MetricKind::DoubleGauge,
            MetricData::Histogram(_) => MetricKind::Histogram,
        }
    }
}

impl Scoped for Metric {
    fn scope(&self) -> &InstrumentationScope {
        &self.scope
    }
}

/// Data points of a metric, typed by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricData {
    /// See [`MetricKind::LongSum`].
    LongSum(Vec<DataPoint<i64>>),
    /// See [`MetricKind::DoubleSum`].
    DoubleSum(Vec<DataPoint<f64>>),
    /// See [`MetricKind::LongGauge`].
    LongGauge(Vec<DataPoint<i64>>),
    /// See [`MetricKind::DoubleGauge`].
    DoubleGauge(Vec<DataPoint<f64>>),
    /// See [`MetricKind::Histogram`].
    Histogram(Vec<HistogramDataPoint>),
}

/// A single sum or gauge value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint<T> {
    /// Start of the aggregation interval.
    pub start_time: SystemTime,
    /// When the value was observed.
    pub time: SystemTime,
    /// Attributes identifying the point's series.
    pub attributes: Vec<KeyValue>,
    /// The value.
    pub value: T,
}

impl<T> DataPoint<T> {
    /// Create a point without attributes.
    pub fn new(start_time: SystemTime, time: SystemTime, value: T) -> Self {
        DataPoint {
            start_time,
            time,
            attributes: Vec::new(),
            value,
        }
    }

    /// Append attributes.
    pub fn with_attributes<I: IntoIterator<Item = KeyValue>>(mut self, attributes: I) -> Self {
        self.attributes.extend(attributes);
        self
    }
}

/// An explicit bucket histogram point.
///
/// There is always exactly one more bucket count than explicit bounds: the last bucket
/// counts values above the highest bound.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramDataPoint {
    start_time: SystemTime,
    time: SystemTime,
    attributes: Vec<KeyValue>,
    count: u64,
    sum: f64,
    bucket_counts: Vec<u64>,
    explicit_bounds: Vec<f64>,
}

impl HistogramDataPoint {
    /// Create a histogram point.
    ///
    /// Fails with [`OtlpJsonError::InvalidHistogram`] unless `bucket_counts` has one
    /// more element than `explicit_bounds`.
    pub fn new(
        start_time: SystemTime,
        time: SystemTime,
        count: u64,
        sum: f64,
        bucket_counts: Vec<u64>,
        explicit_bounds: Vec<f64>,
    ) -> OtlpJsonResult<Self> {
        if bucket_counts.len() != explicit_bounds.len() + 1 {
            return Err(OtlpJsonError::InvalidHistogram {
                bounds: explicit_bounds.len(),
                buckets: bucket_counts.len(),
            });
        }

        Ok(HistogramDataPoint {
            start_time,
            time,
            attributes: Vec::new(),
            count,
            sum,
            bucket_counts,
            explicit_bounds,
        })
    }

    /// Append attributes.
    pub fn with_attributes<I: IntoIterator<Item = KeyValue>>(mut self, attributes: I) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Start of the aggregation interval.
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// When the histogram was collected.
    pub fn time(&self) -> SystemTime {
        self.time
    }

    /// Attributes identifying the point's series.
    pub fn attributes(&self) -> &[KeyValue] {
        &self.attributes
    }

    /// Number of recorded values.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of recorded values.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Count per bucket.
    pub fn bucket_counts(&self) -> &[u64] {
        &self.bucket_counts
    }

    /// Upper bounds of every bucket but the last.
    pub fn explicit_bounds(&self) -> &[f64] {
        &self.explicit_bounds
    }
}

impl Metric {
    /// Convert everything an SDK reader collected.
    ///
    /// Exponential histograms have no encoding here and are left out. Unsigned values
    /// above `i64::MAX` saturate.
    pub fn from_resource_metrics(metrics: &ResourceMetrics) -> Vec<Metric> {
        metrics
            .scope_metrics()
            .flat_map(|scope_metrics| {
                scope_metrics.metrics().filter_map(move |metric| {
                    let data = match metric.data() {
                        AggregatedMetrics::F64(data) => MetricData::from_sdk(data),
                        AggregatedMetrics::U64(data) => MetricData::from_sdk(data),
                        AggregatedMetrics::I64(data) => MetricData::from_sdk(data),
                    };
                    let Some(data) = data else {
                        otel_debug!(
                            name: "OtlpJsonMetricExporter.MetricSkipped",
                            metric_name = metric.name().to_owned()
                        );
                        return None;
                    };
                    Some(
                        Metric::new(metric.name().to_owned(), scope_metrics.scope().clone(), data)
                            .with_description(metric.description().to_owned())
                            .with_unit(metric.unit().to_owned()),
                    )
                })
            })
            .collect()
    }
}

/// Number types an SDK instrument can record.
trait Numeric: Copy {
    fn into_data(points: Vec<DataPoint<Self>>, kind: PointKind) -> MetricData;

    // lossy for large integers, histogram sums are always doubles
    fn into_f64(self) -> f64;
}

enum PointKind {
    Sum,
    Gauge,
}

impl Numeric for f64 {
    fn into_data(points: Vec<DataPoint<f64>>, kind: PointKind) -> MetricData {
        match kind {
            PointKind::Sum => MetricData::DoubleSum(points),
            PointKind::Gauge => MetricData::DoubleGauge(points),
        }
    }

    fn into_f64(self) -> f64 {
        self
    }
}

impl Numeric for i64 {
    fn into_data(points: Vec<DataPoint<i64>>, kind: PointKind) -> MetricData {
        match kind {
            PointKind::Sum => MetricData::LongSum(points),
            PointKind::Gauge => MetricData::LongGauge(points),
        }
    }

    fn into_f64(self) -> f64 {
        self as f64
    }
}

impl Numeric for u64 {
    fn into_data(points: Vec<DataPoint<u64>>, kind: PointKind) -> MetricData {
        let points = points
            .into_iter()
            .map(|point| DataPoint {
                start_time: point.start_time,
                time: point.time,
                attributes: point.attributes,
                value: i64::try_from(point.value).unwrap_or(i64::MAX),
            })
            .collect();
        i64::into_data(points, kind)
    }

    fn into_f64(self) -> f64 {
        self as f64
    }
}

impl MetricData {
    fn from_sdk<T: Numeric>(data: &data::MetricData<T>) -> Option<MetricData> {
        match data {
            data::MetricData::Sum(sum) => {
                let points = sum
                    .data_points()
                    .map(|point| {
                        DataPoint::new(sum.start_time(), sum.time(), point.value())
                            .with_attributes(point.attributes().map(Into::into))
                    })
                    .collect();
                Some(T::into_data(points, PointKind::Sum))
            }
            data::MetricData::Gauge(gauge) => {
                let start_time = gauge.start_time().unwrap_or_else(|| gauge.time());
                let points = gauge
                    .data_points()
                    .map(|point| {
                        DataPoint::new(start_time, gauge.time(), point.value())
                            .with_attributes(point.attributes().map(Into::into))
                    })
                    .collect();
                Some(T::into_data(points, PointKind::Gauge))
            }
            data::MetricData::Histogram(histogram) => Some(MetricData::Histogram(
                histogram
                    .data_points()
                    .filter_map(|point| {
                        HistogramDataPoint::new(
                            histogram.start_time(),
                            histogram.time(),
                            point.count(),
                            point.sum().into_f64(),
                            point.bucket_counts().collect(),
                            point.bounds().collect(),
                        )
                        .map(|converted| {
                            converted.with_attributes(point.attributes().map(Into::into))
                        })
                        .ok()
                    })
                    .collect(),
            )),
            _ => None,
        }
    }
}
