use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global subscriber: one output layer behind an `EnvFilter`.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    if tracing::dispatcher::has_been_set() {
        return Err(LoggerError::AlreadyInitialized);
    }
    let filter = mk_filter(cfg)?;
    let output = output_layer(cfg)?;

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| LoggerError::InitializationFailed(e.to_string()))
}

fn output_layer(cfg: &LoggerConfig) -> Result<OutputLayer, LoggerError> {
    let layer = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(local_timer())
            .boxed(),
        // One flat object per event; the reconciler's task_id/job_name span
        // fields ride along as `span`.
        LoggerFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(cfg.with_targets)
            .with_timer(local_timer())
            .boxed(),
        LoggerFormat::Journald => journald_layer(cfg)?,
    };
    Ok(layer)
}

fn mk_filter(cfg: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(cfg.directive()).map_err(|_| LoggerError::InvalidLogLevel(cfg.level.clone()))
}

fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer(cfg: &LoggerConfig) -> Result<OutputLayer, LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier(cfg.identifier.clone());
    Ok(layer.boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer(_cfg: &LoggerConfig) -> Result<OutputLayer, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_level_is_rejected() {
        let cfg = LoggerConfig::new(LoggerFormat::Text, "lora_core=loud");
        assert!(matches!(
            mk_filter(&cfg),
            Err(LoggerError::InvalidLogLevel(ref l)) if l == "lora_core=loud"
        ));
    }

    #[test]
    fn text_and_json_layers_build() {
        assert!(output_layer(&LoggerConfig::new(LoggerFormat::Text, "info")).is_ok());
        assert!(output_layer(&LoggerConfig::new(LoggerFormat::Json, "info")).is_ok());
    }

    #[cfg(not(feature = "journald"))]
    #[test]
    fn journald_layer_needs_feature() {
        let cfg = LoggerConfig::new(LoggerFormat::Journald, "info");
        assert!(matches!(
            output_layer(&cfg),
            Err(LoggerError::JournaldNotSupported)
        ));
    }

    #[test]
    fn second_init_reports_already_initialized() {
        let cfg = LoggerConfig::new(LoggerFormat::Text, "warn");
        let _ = install(&cfg);
        assert!(matches!(install(&cfg), Err(LoggerError::AlreadyInitialized)));
    }
}
