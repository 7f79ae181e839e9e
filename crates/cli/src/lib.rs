//! Log Detective command-line front end.
//!
//! Two binaries share this library:
//! - `log-detective <LOG_FILE>` analyses a local log file
//! - `ascii-art-agent` runs the ASCII art demonstration task
//!
//! Both load `.env`, read configuration (file, then environment, then
//! flags), print their result on stdout and log to stderr.

pub mod args;
pub mod commands;

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("{level},reqwest=warn,hyper=warn,hyper_util=warn,rustls=warn")
}
