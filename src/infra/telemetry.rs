use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::contact::{METRIC_CONTACT_SEND_MS, METRIC_CONTACT_SENT_TOTAL},
    config::{LogFormat, LoggingSettings},
};

use super::{
    error::InfraError,
    store::{METRIC_STORE_REQUEST_MS, METRIC_STORE_REQUESTS_TOTAL},
};

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_STORE_REQUESTS_TOTAL,
            Unit::Count,
            "Document store round trips, labelled by method and outcome."
        );
        describe_histogram!(
            METRIC_STORE_REQUEST_MS,
            Unit::Milliseconds,
            "Document store round-trip latency in milliseconds."
        );
        describe_counter!(
            METRIC_CONTACT_SENT_TOTAL,
            Unit::Count,
            "Contact notifications handed to the mail relay, labelled by result."
        );
        describe_histogram!(
            METRIC_CONTACT_SEND_MS,
            Unit::Milliseconds,
            "Mail relay latency in milliseconds."
        );
    });
}
