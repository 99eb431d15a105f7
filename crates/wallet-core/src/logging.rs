//! Process-wide log output for hosts embedding the wallet.

use tracing_subscriber::{fmt, EnvFilter};

/// Log line format: `pretty` (default), `compact` or `json`.
pub const ENV_LOG_FORMAT: &str = "WALLET_LOG_FORMAT";

/// Used when `RUST_LOG` is unset or does not parse. Wallet crates log at
/// `info`; dependencies only surface warnings.
pub const DEFAULT_DIRECTIVES: &str = "warn,wallet_core=info,chain_btc=info,chain_eth=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// Unknown values fall back to [`LogFormat::Pretty`].
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Filter from a `RUST_LOG`-style string, or [`DEFAULT_DIRECTIVES`].
pub fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs a global `fmt` subscriber writing to stderr, configured from
/// `RUST_LOG` and [`ENV_LOG_FORMAT`]. A second call is a no-op.
pub fn init_logging() {
    let filter = filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    let format = LogFormat::from_env_value(std::env::var(ENV_LOG_FORMAT).ok().as_deref());
    init_with(format, filter);
}

/// Installs a subscriber with an explicit format and filter. Returns false
/// when one was already installed.
pub fn init_with(format: LogFormat, filter: EnvFilter) -> bool {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Compact => builder.compact().try_init().is_ok(),
        LogFormat::Pretty => builder.pretty().try_init().is_ok(),
    }
}
