//! Attribute limits applied while encoding.
//!
//! Limits default to the values found in the standard `OTEL_*` environment
//! variables and can be overridden with [`SdkLimits::builder`].
use opentelemetry::otel_warn;
use std::env;
use std::str::FromStr;

/// Maximum length of any attribute value.
pub const OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT: &str = "OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT";
/// Maximum number of attributes.
pub const OTEL_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_ATTRIBUTE_COUNT_LIMIT";
/// Maximum length of a log record attribute value. Overrides [`OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT`].
pub const OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT: &str =
    "OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT";
/// Maximum number of log record attributes. Overrides [`OTEL_ATTRIBUTE_COUNT_LIMIT`].
pub const OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT";
/// Maximum length of a span attribute value. Overrides [`OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT`].
pub const OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT: &str = "OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT";
/// Maximum number of span attributes. Overrides [`OTEL_ATTRIBUTE_COUNT_LIMIT`].
pub const OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT";

/// Default attribute count limit when no environment variable is set.
pub const DEFAULT_ATTRIBUTE_COUNT_LIMIT: usize = 128;

/// Limits for one family of attributes.
///
/// `value_length_limit` truncates string values (in characters). `count_limit` is
/// carried for completeness but the encoders never drop attributes because of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLimits {
    /// Maximum number of characters kept from a string value. `None` is unlimited.
    pub value_length_limit: Option<usize>,
    /// Configured attribute count limit. Not enforced.
    pub count_limit: Option<usize>,
}

impl AttributeLimits {
    /// Limits that never truncate anything.
    pub const fn unlimited() -> Self {
        AttributeLimits {
            value_length_limit: None,
            count_limit: None,
        }
    }

    /// Sets the value length limit.
    pub fn with_value_length_limit(mut self, limit: usize) -> Self {
        self.value_length_limit = Some(limit);
        self
    }

    /// Sets the count limit.
    pub fn with_count_limit(mut self, limit: usize) -> Self {
        self.count_limit = Some(limit);
        self
    }
}

impl Default for AttributeLimits {
    fn default() -> Self {
        AttributeLimits {
            value_length_limit: None,
            count_limit: Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT),
        }
    }
}

/// Limits for every attribute family the encoders truncate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct SdkLimits {
    /// Limits applied to log record attributes.
    pub log_record: AttributeLimits,
    /// Limits applied to span, span event and span link attributes.
    pub span: AttributeLimits,
}

impl Default for SdkLimits {
    /// Limits read from the environment.
    fn default() -> Self {
        let value_length = read_limit(OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT);
        let count = read_limit(OTEL_ATTRIBUTE_COUNT_LIMIT).or(Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT));

        SdkLimits {
            log_record: AttributeLimits {
                value_length_limit: read_limit(OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT)
                    .or(value_length),
                count_limit: read_limit(OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT).or(count),
            },
            span: AttributeLimits {
                value_length_limit: read_limit(OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT)
                    .or(value_length),
                count_limit: read_limit(OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT).or(count),
            },
        }
    }
}

impl SdkLimits {
    /// Start from the environment defaults and override individual limits.
    pub fn builder() -> SdkLimitsBuilder {
        SdkLimitsBuilder {
            limits: SdkLimits::default(),
        }
    }

    /// Limits that never truncate anything, ignoring the environment.
    pub const fn unlimited() -> Self {
        SdkLimits {
            log_record: AttributeLimits::unlimited(),
            span: AttributeLimits::unlimited(),
        }
    }
}

/// Builder for [`SdkLimits`].
#[derive(Debug, Clone)]
pub struct SdkLimitsBuilder {
    limits: SdkLimits,
}

impl SdkLimitsBuilder {
    /// Maximum characters kept from a log record attribute string value.
    pub fn with_log_record_attribute_value_length_limit(mut self, limit: usize) -> Self {
        self.limits.log_record.value_length_limit = Some(limit);
        self
    }

    /// Log record attribute count limit. Carried, not enforced.
    pub fn with_log_record_attribute_count_limit(mut self, limit: usize) -> Self {
        self.limits.log_record.count_limit = Some(limit);
        self
    }

    /// Maximum characters kept from a span attribute string value.
    pub fn with_span_attribute_value_length_limit(mut self, limit: usize) -> Self {
        self.limits.span.value_length_limit = Some(limit);
        self
    }

    /// Span attribute count limit. Carried, not enforced.
    pub fn with_span_attribute_count_limit(mut self, limit: usize) -> Self {
        self.limits.span.count_limit = Some(limit);
        self
    }

    /// Build the limits.
    pub fn build(self) -> SdkLimits {
        self.limits
    }
}

fn read_limit(var: &str) -> Option<usize> {
    let raw = env::var(var).ok()?;
    match usize::from_str(raw.trim()) {
        Ok(limit) => Some(limit),
        Err(_) => {
            otel_warn!(
                name: "OtlpJson.Config.InvalidLimit",
                message = "Ignoring attribute limit that is not a non-negative integer",
                variable = var,
                value = raw.as_str()
            );
            None
        }
    }
}
