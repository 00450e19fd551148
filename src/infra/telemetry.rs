use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

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
            "storefront_ssr_cache_hit_total",
            Unit::Count,
            "Total number of pages served from the SSR response cache."
        );
        describe_counter!(
            "storefront_ssr_cache_miss_total",
            Unit::Count,
            "Total number of cacheable requests that required a render."
        );
        describe_counter!(
            "storefront_ssr_cache_bypass_total",
            Unit::Count,
            "Total number of requests rendered without consulting the cache."
        );
        describe_counter!(
            "storefront_ssr_render_failure_total",
            Unit::Count,
            "Total number of renders that failed."
        );
        describe_gauge!(
            "storefront_ssr_cache_entries",
            Unit::Count,
            "Number of entries held by the response cache, stale ones included."
        );
        describe_histogram!(
            "storefront_ssr_render_ms",
            Unit::Milliseconds,
            "Renderer latency in milliseconds."
        );
    });
}
