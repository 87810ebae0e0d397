use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "metadetect=debug";

/// Initialize tracing. Logs go to stderr; stdout carries command output.
///
/// `log_format` of `json` switches to one JSON object per event.
pub fn init_tracing(log_format: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if is_json(log_format) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        let console_fmt = tracing_subscriber::fmt::layer()
            .event_format(
                Format::default()
                    .compact()
                    .with_target(false)
                    .without_time(),
            )
            .with_writer(std::io::stderr);
        registry.with(console_fmt).init();
    }
}

fn is_json(log_format: Option<&str>) -> bool {
    log_format.is_some_and(|format| format.trim().eq_ignore_ascii_case("json"))
}
