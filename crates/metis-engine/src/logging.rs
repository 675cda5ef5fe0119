//! Tracing subscriber setup for binaries and hosts

use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured filter
pub const LOG_ENV: &str = "METIS_LOG";

/// Install a global fmt subscriber
///
/// `METIS_LOG` takes precedence over `default_filter`. Output goes to
/// stderr so stdout stays parseable. Calling this twice is harmless; the
/// second install is ignored.
pub fn init(default_filter: &str, json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
