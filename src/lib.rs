pub mod assembler;
pub mod cli;
pub mod client;
pub mod commands;
pub mod enricher;
pub mod error;
pub mod export;
pub mod model;
pub mod paginator;
pub mod provider;
pub mod resolver;
pub mod settings;
pub mod slack;
pub mod window;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use error::{AppError, ProviderError, Result};

const TOKEN_PREFIXES: [&str; 4] = ["xoxb-", "xoxp-", "xoxa-", "xoxs-"];

pub fn load_token() -> Result<String> {
    std::env::var("SLACK_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::MissingToken)
}

/// Whether `token` looks like a Slack bot, user, app or workspace token.
pub fn check_token_format(token: &str) -> bool {
    TOKEN_PREFIXES.iter().any(|p| token.starts_with(p))
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `verbose`.
///
/// Safe to call more than once; later calls are ignored.
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
