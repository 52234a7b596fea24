use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::FmtSubscriber;

use crate::config::LogLevel;

/// Installs the global `tracing` subscriber.
///
/// The filter is built from `log_level`, unless `RUST_LOG` is set, in
/// which case it takes precedence. Returns `false` if a global subscriber
/// was already installed.
pub fn init(log_level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_level)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

/// Only the relayer crates log at the configured level; everything else
/// stays at `warn`.
pub fn default_directive(log_level: LogLevel) -> String {
    format!("warn,ibc_relay={log_level},ibc_relay_types={log_level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_uses_log_level() {
        assert_eq!(
            default_directive(LogLevel::Debug),
            "warn,ibc_relay=debug,ibc_relay_types=debug"
        );
    }
}
