use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Log targets of the roboframe crates; `--log-level` applies to these.
const ROBOFRAME_TARGETS: [&str; 4] = [
    "roboframe",
    "roboframe_schema",
    "roboframe_frame",
    "roboframe_envelope",
];

/// Ceiling for events from every other target.
const DEPENDENCY_CEILING: LevelFilter = LevelFilter::WARN;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Stderr logging for the inspector; stdout carries envelopes and records.
#[derive(Copy, Clone, Debug)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LoggingConfig {
    /// Codec and envelope events at the requested level, anything else at
    /// most at warn.
    fn targets(&self) -> Targets {
        let level = LevelFilter::from(self.level);
        ROBOFRAME_TARGETS
            .iter()
            .fold(Targets::new(), |targets, target| {
                targets.with_target(*target, level)
            })
            .with_default(level.min(DEPENDENCY_CEILING))
    }

    pub fn init(&self) {
        let targets = self.targets();
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false);

        // A second init (tests, embedding) keeps the first subscriber.
        let _ = match self.format {
            LogFormat::Text => tracing_subscriber::registry()
                .with(layer.with_filter(targets))
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(layer.json().with_filter(targets))
                .try_init(),
        };
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    fn targets(level: LogLevel) -> Targets {
        LoggingConfig {
            format: LogFormat::Text,
            level,
        }
        .targets()
    }

    #[test]
    fn roboframe_crates_follow_requested_level() {
        let targets = targets(LogLevel::Debug);
        for target in [
            "roboframe_frame::codec",
            "roboframe_envelope::pipeline",
            "roboframe::cmd",
        ] {
            assert!(targets.would_enable(target, &Level::DEBUG), "{target}");
            assert!(!targets.would_enable(target, &Level::TRACE), "{target}");
        }
    }

    #[test]
    fn dependencies_are_capped_at_warn() {
        let targets = targets(LogLevel::Trace);
        assert!(targets.would_enable("jsonschema::compiler", &Level::WARN));
        assert!(!targets.would_enable("jsonschema::compiler", &Level::INFO));
        assert!(targets.would_enable("roboframe_schema::record", &Level::TRACE));
    }

    #[test]
    fn quiet_level_applies_to_dependencies_too() {
        let targets = targets(LogLevel::Error);
        assert!(!targets.would_enable("roboframe_frame::decoder", &Level::WARN));
        assert!(!targets.would_enable("arrow_ipc::reader", &Level::WARN));
        assert!(targets.would_enable("arrow_ipc::reader", &Level::ERROR));
    }
}
