//! Tracing subscriber setup for host applications.

use tracing_subscriber::EnvFilter;

use crate::config::DEFAULT_LOG_FILTER;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `filter`, which wins over the crate default.
/// Returns false if a subscriber was already installed, so calling this
/// more than once is harmless.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(env_directives.as_deref(), filter.as_deref()))
        .try_init()
        .is_ok()
}

/// First parseable of `env`, `configured`, then [`DEFAULT_LOG_FILTER`].
fn build_filter(env: Option<&str>, configured: Option<&str>) -> EnvFilter {
    [env, configured]
        .into_iter()
        .flatten()
        .filter(|directives| !directives.trim().is_empty())
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
