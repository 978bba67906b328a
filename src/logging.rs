use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the `fmt` subscriber used by the binary.
///
/// Defaults to `warn` unless overridden by `MPEGTS_MXF_LOG`
/// (e.g. `MPEGTS_MXF_LOG=mpegts_mxf::registry=debug`).
pub fn init() {
    let filter = EnvFilter::builder()
        .with_env_var("MPEGTS_MXF_LOG")
        .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init();
}
