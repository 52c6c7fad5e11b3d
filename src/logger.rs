use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Events go to stderr so they never mix with command output.
pub fn init_logger() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "newsdesk=warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
