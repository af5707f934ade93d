use tracing_subscriber::EnvFilter;

use crate::model::config::Config;

/// Environment variable that overrides the configured log filter
pub const LOG_ENV: &str = "TASKTREE_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Pick the filter directive: environment first, then `[log] filter`, then
/// `warn`. Blank values are skipped.
pub fn resolve_filter(env: Option<&str>, config: &Config) -> String {
    env.filter(|s| !s.trim().is_empty())
        .or(config.log.filter.as_deref().filter(|s| !s.trim().is_empty()))
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Install the stderr subscriber. Only the binary calls this; a second call
/// is ignored.
pub fn init_logging(config: &Config) {
    let env = std::env::var(LOG_ENV).ok();
    let directive = resolve_filter(env.as_deref(), config);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_wins_over_config() {
        let mut config = Config::default();
        config.log.filter = Some("tasktree=debug".into());
        assert_eq!(resolve_filter(Some("trace"), &config), "trace");
        assert_eq!(resolve_filter(None, &config), "tasktree=debug");
        assert_eq!(resolve_filter(Some("  "), &config), "tasktree=debug");
    }

    #[test]
    fn falls_back_to_warn() {
        assert_eq!(resolve_filter(None, &Config::default()), "warn");
    }
}
