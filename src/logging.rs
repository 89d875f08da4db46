use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the fmt subscriber and a panic hook that logs before exiting.
/// `RUST_LOG` wins over `default_level` when set.
pub fn setup_log(default_level: &str) {
    std::panic::set_hook(Box::new(|info| {
        error!(target: "cached_bytes", "Panic occurred: {}", info);
        std::process::exit(1);
    }));

    setup_log_no_panic_hook(default_level)
}

pub fn setup_log_no_panic_hook(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = SubscriberBuilder::default()
        .with_line_number(true)
        .with_file(true)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish()
        .try_init();
}
