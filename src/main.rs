use clap::Parser;

use talent_finder_lib::core::commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    talent_finder_lib::init_tracing(cli.log_json);
    talent_finder_lib::run(cli).await
}
