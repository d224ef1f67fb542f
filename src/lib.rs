pub mod core;

use tracing_subscriber::EnvFilter;

use core::commands::{handle_command, Cli};

pub(crate) const DEFAULT_LOG_FILTER: &str =
    "talent_finder_lib=info,talent_finder=info,talent_finder_lib::core::agent=debug";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    handle_command(cli).await
}
