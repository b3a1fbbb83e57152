use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Every crate in the workspace logs under a target with this prefix.
const WORKSPACE_TARGET: &str = "ardubridge";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `level` applies to the bridge crates. Dependencies never log below
/// warn, so `--log-level trace` shows the exchanges and not serial
/// driver noise.
pub fn target_filter(level: LogLevel) -> Targets {
    let level = level.as_filter();
    Targets::new()
        .with_target(WORKSPACE_TARGET, level)
        .with_default(level.min(LevelFilter::WARN))
}

/// Logs go to stderr so stdout stays clean for command output.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = target_filter(level);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);

    let registry = tracing_subscriber::registry();
    let _ = match format {
        LogFormat::Text => registry.with(layer.with_filter(filter)).try_init(),
        LogFormat::Json => registry.with(layer.json().with_filter(filter)).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn level_applies_to_workspace_crates() {
        let filter = target_filter(LogLevel::Debug);

        assert!(filter.would_enable("ardubridge_channel::channel", &Level::DEBUG));
        assert!(filter.would_enable("ardubridge_frame::link", &Level::DEBUG));
        assert!(!filter.would_enable("ardubridge_frame::link", &Level::TRACE));
    }

    #[test]
    fn dependencies_stay_at_warn() {
        let filter = target_filter(LogLevel::Trace);
        assert!(filter.would_enable("serialport::posix", &Level::WARN));
        assert!(!filter.would_enable("serialport::posix", &Level::INFO));

        let quiet = target_filter(LogLevel::Error);
        assert!(!quiet.would_enable("serialport::posix", &Level::WARN));
    }
}
