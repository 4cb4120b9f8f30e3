//! Process-wide tracing subscriber and metric descriptions.

use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::describe_metrics;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Statement logging from sqlx is only useful when asked for explicitly.
const QUIET_SQLX: &str = "sqlx::query=warn";

/// Event targets of the console commands.
pub mod targets {
    pub const HTTP: &str = "wger::http";
    pub const MIGRATE: &str = "wger::migrate";
    pub const FIXTURE: &str = "wger::fixture";
    pub const API_KEYS: &str = "wger::api_keys";
}

/// Install the global subscriber. `RUST_LOG` adds directives on top of the
/// configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let env_filter = build_filter(logging.level, &directives)?;

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InfraError::telemetry(err.to_string()))
}

/// `level` applies to every target without a more specific directive.
fn build_filter(level: LevelFilter, directives: &str) -> Result<EnvFilter, InfraError> {
    let quiet_sqlx: Directive = QUIET_SQLX
        .parse()
        .map_err(|err| InfraError::telemetry(format!("bad default directive: {err}")))?;
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives)
        .add_directive(quiet_sqlx))
}
