use core::fmt;
use std::{io::Write, time::Duration};

use opentelemetry::otel_debug;
use opentelemetry_sdk::{error::OTelSdkResult, logs::LogBatch};

use crate::{
    common::{Batch, Resource, Sink},
    config::{AttributeLimits, SdkLimits},
    error::OtlpJsonResult,
    logs::{LogRecord, LogsDocument},
};

/// Writes one OTLP/JSON logs document per export into its sink.
pub struct LogExporter {
    sink: Sink,
    resource: Resource,
    limits: AttributeLimits,
}

impl fmt::Debug for LogExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogExporter")
    }
}

impl LogExporter {
    /// Start building an exporter that writes into `writer`.
    pub fn builder(writer: impl Write + Send + 'static) -> LogExporterBuilder {
        LogExporterBuilder {
            writer: Box::new(writer),
            resource: Resource::empty(),
            limits: None,
        }
    }

    /// Encode `batch` as one document and write it to the sink.
    ///
    /// Sink errors are returned as is. The batch is failed as a whole and whatever
    /// was written for it must be discarded.
    pub fn export(&self, batch: Batch<'_, LogRecord>) -> OtlpJsonResult<()> {
        otel_debug!(name: "OtlpJsonLogExporter.ExportStarted", record_count = batch.len());

        let result = self.sink.write_with(|writer| {
            LogsDocument::new(&self.resource, batch)
                .with_limits(self.limits)
                .write_to(writer)
        });

        match &result {
            Ok(()) => {
                otel_debug!(name: "OtlpJsonLogExporter.ExportSucceeded");
            }
            Err(err) => {
                otel_debug!(name: "OtlpJsonLogExporter.ExportFailed", error = format!("{err}"));
            }
        }
        result
    }

    /// Flush and release the sink. Later exports fail with
    /// [`OtlpJsonError::AlreadyShutdown`](crate::OtlpJsonError::AlreadyShutdown).
    pub fn shutdown(&self) -> OtlpJsonResult<()> {
        otel_debug!(name: "OtlpJsonLogExporter.Shutdown");
        self.sink.close()
    }

    /// Replace the resource written with every document.
    pub fn set_resource(&mut self, resource: Resource) {
        self.resource = resource;
    }
}

/// The instrumentation scope of SDK records is dropped, as for every logs document.
impl opentelemetry_sdk::logs::LogExporter for LogExporter {
    async fn export(&self, batch: LogBatch<'_>) -> OTelSdkResult {
        let records: Vec<LogRecord> = batch.iter().map(|(record, _)| record.into()).collect();
        LogExporter::export(self, Batch::new(&records)).map_err(Into::into)
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
        LogExporter::shutdown(self).map_err(Into::into)
    }

    fn set_resource(&mut self, resource: &opentelemetry_sdk::Resource) {
        self.resource = resource.into();
    }
}

/// Builder for [`LogExporter`].
pub struct LogExporterBuilder {
    writer: Box<dyn Write + Send>,
    resource: Resource,
    limits: Option<AttributeLimits>,
}

impl fmt::Debug for LogExporterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogExporterBuilder")
            .field("resource", &self.resource)
            .field("limits", &self.limits)
            .finish()
    }
}

impl LogExporterBuilder {
    /// Resource written with every document. Defaults to an empty resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    /// Attribute limits for log records. Defaults to the log record limits found
    /// in the environment.
    pub fn with_limits(mut self, limits: AttributeLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Build the exporter.
    pub fn build(self) -> LogExporter {
        LogExporter {
            sink: Sink::new(self.writer),
            resource: self.resource,
            limits: self
                .limits
                .unwrap_or_else(|| SdkLimits::default().log_record),
        }
    }
}
