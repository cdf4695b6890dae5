//! Logging utilities and configuration.
//!
//! Profiling touches every cell of a dataset, so per-column and per-method
//! events are gated behind [`LogConfig`] flags and the macros below rather
//! than emitted unconditionally.

use tracing::Level;

/// Controls how chatty the profiler, detectors and coordinator are.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for engine components
    pub base_level: Level,
    /// Whether to log each method assessment made by a detector
    pub log_detector_details: bool,
    /// Whether to log per-column profiling events
    pub log_profiling: bool,
    /// Longest rationale or error text logged before truncation
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_detector_details: false,
            log_profiling: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Logs every profiled column and every method decision.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_detector_details: true,
            log_profiling: true,
            max_field_length: 1024,
        }
    }

    /// Warnings only, with no per-column or per-method events.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_detector_details: false,
            log_profiling: false,
            max_field_length: 128,
        }
    }

    /// Same as [`LogConfig::default`].
    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Debug logging that skips formatting entirely when the configured level
/// is above DEBUG.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Per-method detector logging.
#[macro_export]
macro_rules! log_detector {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_detector_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Per-column profiling logging.
#[macro_export]
macro_rules! log_profiling {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_profiling {
            tracing::debug!($($arg)*);
        }
    };
}

/// Cuts `value` to at most `max_length` bytes, respecting UTF-8 boundaries.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut cut = max_length;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...(truncated)", &value[..cut])
}

/// Subscriber installation.
pub mod setup {
    use tracing::Level;

    /// Configuration for the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for every other target
        pub level: Level,
        /// Level for `survey_autodetect` targets
        pub crate_level: Level,
        /// Emit one JSON object per event
        pub json_format: bool,
        /// Full directive string; replaces the two levels when set
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON output, WARN globally and INFO for this crate.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                crate_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Human-readable output at DEBUG everywhere.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_crate_level(mut self, level: Level) -> Self {
            self.crate_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// The `EnvFilter` directives this configuration stands for.
        pub fn env_filter(&self) -> String {
            match &self.env_filter {
                Some(directives) => directives.clone(),
                None => format!(
                    "{},survey_autodetect={}",
                    self.level.as_str().to_lowercase(),
                    self.crate_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global `tracing` subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// ```rust,no_run
    /// use survey_autodetect::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
