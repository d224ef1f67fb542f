use std::path::PathBuf;
use std::sync::Arc;

use talent_finder_lib::core::actions::{LedgerActions, ScoutActions};
use talent_finder_lib::core::models::RunConfiguration;
use talent_finder_lib::core::status::StatusChannel;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: extract_harness <path-to-job-description.pdf|docx|txt>");
        std::process::exit(1);
    }

    let path = PathBuf::from(&args[1]);
    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        std::process::exit(2);
    }

    let scratch = tempfile::tempdir()?;
    let config = RunConfiguration::new(
        path.clone(),
        &[],
        scratch.path(),
        scratch.path().join("Template.xlsx"),
    );
    let actions = LedgerActions::new(config, Arc::new(StatusChannel::new()));

    let outcome = actions.read_document_text(&path);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.is_error() {
        std::process::exit(3);
    }
    Ok(())
}
