//! Encode telemetry as OTLP/JSON.
//!
//! This crate writes logs, metrics and traces in the JSON mapping of the
//! OpenTelemetry Protocol. Each call encodes one [`Batch`] produced by one
//! [`Resource`] into a single document and streams it straight into an
//! [`std::io::Write`] sink, without building an intermediate tree.
//!
//! The documents are shaped as
//! `{"resource<Signal>s": [{"resource": {..}, "scope<Signal>s": [{"scope": {..}, "<items>": [..]}]}]}`.
//! Metrics and traces documents are followed by a newline, logs documents are not.
//!
//! Use the `*Document` types to encode into a sink you manage yourself, or an
//! exporter to keep a sink, a resource and attribute limits together.
//!
//! # Examples
//!
//! ```
//! # #[cfg(feature = "trace")]
//! # {
//! use opentelemetry::trace::{SpanId, Status, TraceId};
//! use opentelemetry::InstrumentationScope;
//! use opentelemetry_otlp_json::{Batch, KeyValue, Resource, Span, SpanExporter, SpanKind};
//! use std::time::{Duration, SystemTime};
//!
//! let exporter = SpanExporter::builder(std::io::stdout())
//!     .with_resource(Resource::new([KeyValue::new("service.name", "checkout")]))
//!     .build();
//!
//! let spans = vec![Span::new(
//!     TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
//!     SpanId::from_hex("00f067aa0ba902b7").unwrap(),
//!     "POST /orders",
//!     InstrumentationScope::builder("http").build(),
//!     SystemTime::now(),
//! )
//! .with_kind(SpanKind::Server)
//! .with_duration(Duration::from_millis(12))
//! .with_status(Status::Ok)];
//!
//! exporter.export(Batch::new(&spans)).unwrap();
//! // {"resourceSpans":[{"resource":{"attributes":[{"key":"service.name","value":{"str..
//! # }
//! ```
//!
//! # Attribute limits
//!
//! Log record attributes and span, event and link attributes can have their string
//! values truncated, see [`config::SdkLimits`]. Resource and metric attributes are
//! always written in full.
#![warn(missing_debug_implementations, missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub(crate) mod common;
pub mod config;
mod error;
pub(crate) mod scope;

pub use common::{AnyValue, Batch, KeyValue, Resource};
pub use error::{OtlpJsonError, OtlpJsonResult};

#[cfg(feature = "metrics")]
mod metrics;
#[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
#[cfg(feature = "metrics")]
pub use metrics::*;

#[cfg(feature = "trace")]
mod trace;
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
#[cfg(feature = "trace")]
pub use trace::*;

#[cfg(feature = "logs")]
mod logs;
#[cfg_attr(docsrs, doc(cfg(feature = "logs")))]
#[cfg(feature = "logs")]
pub use logs::*;
