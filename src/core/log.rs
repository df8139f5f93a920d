use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber, logging to stderr.
///
/// `RUST_LOG` takes over completely when set. Otherwise only this crate logs, at
/// `debug` when `verbose` and at `warn` (failed feeds, unreadable state) when not.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::try_from_default_env().ok();
    let app_filter = env_filter
        .is_none()
        .then(|| Targets::new().with_target("strato", level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .with(app_filter)
        .init();
}
