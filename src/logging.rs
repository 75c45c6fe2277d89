use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Sets up the global tracing subscriber with a fmt formatter and env filter.
///
/// `RUST_LOG` wins when set; otherwise the filter is derived from the
/// configured numeric log level, with sqlx kept at warn.
pub fn init_tracing(cfg: &Config) {
    let default = format!("{lvl},sqlx=warn", lvl = cfg.log_level_str());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
