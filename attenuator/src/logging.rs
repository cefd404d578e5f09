use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt as _,
};

pub const CONSOLE_DEFAULT_FILTER: &str = "warn";
pub const SERVER_DEFAULT_FILTER: &str = "info";

/// Logs go to stderr so the interactive prompt owns stdout. `RUST_LOG`
/// overrides `default_filter`.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global subscriber");
}
