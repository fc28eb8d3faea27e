use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Logging arguments shared by all subcommands.
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// The log verbosity. Can be one of trace|debug|info|warn|error|off.
    /// Directives of RUST_LOG, if set, take precedence.
    #[clap(
        long = "log.level",
        value_enum,
        default_value_t = LogLevel::Warn,
        env = "RULECTL_LOG_LEVEL",
        global = true
    )]
    pub level: LogLevel,

    /// The format for logs. Logs are always written to stderr.
    #[clap(
        long = "log.format",
        value_enum,
        default_value_t = LogFormat::Text,
        env = "RULECTL_LOG_FORMAT",
        global = true
    )]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text lines.
    Text,
    /// Newline-delimited JSON objects.
    Json,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

/// Initialize the global tracing subscriber. Must be called only once.
pub fn init_logging(args: &LogArgs) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(args.level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match args.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder
            .json()
            // Without this, the message and fields would be nested within a `"fields"` object.
            .flatten_event(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .with_current_span(true)
            .with_span_list(false)
            .with_target(false)
            .init(),
    }
}
