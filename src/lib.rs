pub mod analysis;
pub mod commands;
pub mod config;
pub mod db;
pub mod deload;
pub mod fallback;
pub mod insight;
pub mod models;
pub mod plateau;
pub mod progression;
pub mod remote;
pub mod store;

#[cfg(test)]
pub mod test_utils;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lift_progression=info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr))
    .init();
}
