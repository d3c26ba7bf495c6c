use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::render::{METRIC_RENDER_MS, METRIC_RENDER_TOTAL},
    config::{LogFormat, LoggingSettings},
    infra::images::{
        METRIC_IMAGE_PUBLISHED_TOTAL, METRIC_IMAGE_RETIRE_MISSING_TOTAL,
        METRIC_IMAGE_RETIRED_TOTAL,
    },
};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    // Logs go to stderr; stdout carries command results.
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric metadata with whichever recorder the host installed.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_RENDER_TOTAL,
            Unit::Count,
            "Total number of render jobs by precision tier and outcome."
        );
        describe_histogram!(
            METRIC_RENDER_MS,
            Unit::Milliseconds,
            "Render job latency in milliseconds, including process startup."
        );
        describe_counter!(
            METRIC_IMAGE_PUBLISHED_TOTAL,
            Unit::Count,
            "Total number of images published to the store."
        );
        describe_counter!(
            METRIC_IMAGE_RETIRED_TOTAL,
            Unit::Count,
            "Total number of images removed from the store."
        );
        describe_counter!(
            METRIC_IMAGE_RETIRE_MISSING_TOTAL,
            Unit::Count,
            "Total number of retirements that found the image already absent."
        );
    });
}
