use core::fmt;
use std::{io::Write, time::Duration};

use opentelemetry::otel_debug;
use opentelemetry_sdk::{
    error::OTelSdkResult,
    metrics::{data::ResourceMetrics, exporter::PushMetricExporter, Temporality},
};

use crate::{
    common::{Batch, Resource, Sink},
    error::OtlpJsonResult,
    metrics::{Metric, MetricsDocument},
};

/// Writes one newline-terminated OTLP/JSON metrics document per export into its sink.
pub struct MetricExporter {
    sink: Sink,
    resource: Resource,
}

impl fmt::Debug for MetricExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MetricExporter")
    }
}

impl MetricExporter {
    /// Start building an exporter that writes into `writer`.
    pub fn builder(writer: impl Write + Send + 'static) -> MetricExporterBuilder {
        MetricExporterBuilder {
            writer: Box::new(writer),
            resource: Resource::empty(),
        }
    }

    /// Encode `batch` as one document and write it to the sink.
    pub fn export(&self, batch: Batch<'_, Metric>) -> OtlpJsonResult<()> {
        self.write(&self.resource, batch)
    }

    fn write(&self, resource: &Resource, batch: Batch<'_, Metric>) -> OtlpJsonResult<()> {
        otel_debug!(name: "OtlpJsonMetricExporter.ExportStarted", metric_count = batch.len());

        let result = self
            .sink
            .write_with(|writer| MetricsDocument::new(resource, batch).write_to(writer));

        match &result {
            Ok(()) => {
                otel_debug!(name: "OtlpJsonMetricExporter.ExportSucceeded");
            }
            Err(err) => {
                otel_debug!(name: "OtlpJsonMetricExporter.ExportFailed", error = format!("{err}"));
            }
        }
        result
    }

    /// Flush and release the sink.
    pub fn shutdown(&self) -> OtlpJsonResult<()> {
        otel_debug!(name: "OtlpJsonMetricExporter.Shutdown");
        self.sink.close()
    }

    /// Replace the resource written with every document.
    pub fn set_resource(&mut self, resource: Resource) {
        self.resource = resource;
    }
}

/// Documents exported by a reader carry the resource of the collected metrics, not the
/// one the exporter was built with.
impl PushMetricExporter for MetricExporter {
    async fn export(&self, metrics: &ResourceMetrics) -> OTelSdkResult {
        let resource = Resource::from(metrics.resource());
        let batch = Metric::from_resource_metrics(metrics);
        self.write(&resource, Batch::new(&batch))
            .map_err(Into::into)
    }

    fn force_flush(&self) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
        MetricExporter::shutdown(self).map_err(Into::into)
    }

    fn temporality(&self) -> Temporality {
        Temporality::Cumulative
    }
}

/// Builder for [`MetricExporter`].
pub struct MetricExporterBuilder {
    writer: Box<dyn Write + Send>,
    resource: Resource,
}

impl fmt::Debug for MetricExporterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricExporterBuilder")
            .field("resource", &self.resource)
            .finish()
    }
}

impl MetricExporterBuilder {
    /// Resource written with every document. Defaults to an empty resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    /// Build the exporter.
    pub fn build(self) -> MetricExporter {
        MetricExporter {
            sink: Sink::new(self.writer),
            resource: self.resource,
        }
    }
}
