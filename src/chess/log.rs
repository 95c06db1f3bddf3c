use std::env;

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CHESS_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs a stderr subscriber filtered by `CHESS_LOG` (e.g. `debug`,
/// `chess_corpus::chess::prep=debug`). Defaults to warnings.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn filter_from_env() -> EnvFilter {
    let directive = env::var(LOG_ENV).unwrap_or_default();
    build_filter(&directive)
}

fn build_filter(directive: &str) -> EnvFilter {
    let directive = match directive.trim().to_lowercase().as_str() {
        "" => DEFAULT_DIRECTIVE.to_string(),
        "err" => "error".to_string(),
        "warning" => "warn".to_string(),
        other => other.to_string(),
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}
