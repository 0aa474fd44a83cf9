use tracing_core::Level;
use tracing_subscriber::{
    filter::Targets,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::Logging;

/// Install the global tracing subscriber writing to stderr.
///
/// HTTP client internals are capped at [`Level::WARN`] regardless of the configured level.
pub fn init(config: &Logging) {
    init_with_writer(config, std::io::stderr)
}

/// Install the global tracing subscriber writing into the provided `writer`.
pub fn init_with_writer<W>(config: &Logging, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let fmt = fmt::format().with_target(false).compact();

    let target_filters = Targets::new()
        .with_target("hyper", Level::WARN)
        .with_target("reqwest", Level::WARN)
        .with_target("rustls", Level::WARN)
        .with_default(config.level);

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(fmt).with_writer(writer))
        .with(target_filters)
        .init();
}
