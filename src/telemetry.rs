// debugger-proto-gen is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Telemetry helpers set up tracing defaults for build scripts and local regeneration runs.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debugger_proto_gen=info"));

    if tracing::subscriber::set_global_default(
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .compact()
            .finish(),
    )
    .is_err()
    {
        // Default subscriber already installed; this is fine in tests.
    }
}
