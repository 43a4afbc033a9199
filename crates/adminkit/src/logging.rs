//! Tracing setup and per-view spans.

use tracing_subscriber::EnvFilter;

use crate::config::AdminConfig;

/// Installs the global subscriber from `config`.
///
/// `log_level` is an [`EnvFilter`] directive such as
/// `"info,adminkit=debug"`; an invalid directive falls back to `info`. Debug
/// mode logs compact human-readable lines, otherwise one JSON object per
/// event. Returns `false` when a subscriber was already installed.
pub fn setup_logging(config: &AdminConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.debug {
        builder.compact().try_init()
    } else {
        builder.json().try_init()
    };
    installed.is_ok()
}

/// The span every admin view runs in.
pub fn admin_span(mount: &str, view: &str, method: &str) -> tracing::Span {
    tracing::info_span!("admin_view", mount, view, method)
}
