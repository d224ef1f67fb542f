use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use super::errors::CoreError;
use super::models::CandidateRecord;
use super::monitor::watch_status;
use super::runner::RunPhase;
use super::secret_store::ModelApiKeyStore;
use super::service::{CoreService, LedgerView};
use super::settings_store::SettingsStore;
use super::status::AgentStatus;
use super::template::write_default_template;

#[derive(Parser)]
#[command(name = "talent-finder")]
#[command(about = "Search for candidates matching a job description and collect them in a spreadsheet")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file to use instead of the per-user one
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a job description (PDF or DOCX)
    Upload { file: PathBuf },
    /// List stored job descriptions
    List,
    /// Run a candidate search for a stored job description
    ///
    /// The search runs inside this process, so the command stays attached
    /// until it ends even after status polling gives up.
    Run {
        job_description: String,
        /// Location filter, repeatable; defaults come from settings
        #[arg(long = "location", short = 'l')]
        locations: Vec<String>,
    },
    /// Show the candidates found for a job description
    Results {
        job_description: String,
        #[arg(long, value_enum, default_value_t = ResultsView::Table)]
        view: ResultsView,
        /// Open the spreadsheet with the default application
        #[arg(long)]
        open: bool,
    },
    /// Copy the results spreadsheet to a file or directory
    Export {
        job_description: String,
        destination: PathBuf,
    },
    /// Write the default ledger template
    Template {
        #[arg(long)]
        force: bool,
    },
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Credentials(CredentialsCommand),
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print the effective settings as JSON
    Show,
    /// Write the default settings file
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum CredentialsCommand {
    /// Store the model API key in the OS keychain (reads stdin when omitted)
    Set { key: Option<String> },
    /// Remove the stored model API key
    Clear,
    /// Report whether a model API key is available
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResultsView {
    Table,
    Cards,
    Json,
}

pub async fn handle_command(cli: Cli) -> anyhow::Result<()> {
    let store = match cli.settings {
        Some(path) => SettingsStore::with_path(path),
        None => SettingsStore::new(),
    };

    match cli.command {
        Command::Settings(SettingsCommand::Show) => {
            let settings = store.load().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Command::Settings(SettingsCommand::Init { force }) => {
            if store.path().exists() && !force {
                return Err(CoreError::InvalidRequest(format!(
                    "{} already exists; pass --force to overwrite",
                    store.path().display()
                ))
                .into());
            }
            store.save(&Default::default()).await?;
            println!("Wrote {}", store.path().display());
        }
        Command::Credentials(command) => handle_credentials(command)?,
        command => {
            let settings = store.load().await?;
            let api_key = match &command {
                Command::Run { .. } => ModelApiKeyStore::new().resolve(),
                _ => None,
            };
            let service = CoreService::new(settings, api_key);
            handle_service_command(&service, command).await?;
        }
    }

    Ok(())
}

async fn handle_service_command(service: &CoreService, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Upload { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let name = file
                .file_name()
                .map(|v| v.to_string_lossy().to_string())
                .unwrap_or_default();
            let stored = service.upload_job_description(&name, &bytes).await?;
            println!("Stored {stored}");
        }
        Command::List => {
            let entries = service.list_job_descriptions().await?;
            if entries.is_empty() {
                println!("No job descriptions uploaded yet.");
            }
            for entry in entries {
                println!("{:<40} {}", entry.file_name, entry.display_name);
            }
        }
        Command::Run {
            job_description,
            locations,
        } => run_search(service, &job_description, &locations).await?,
        Command::Results {
            job_description,
            view,
            open,
        } => {
            let Some(results) = service.load_results(&job_description).await? else {
                println!("No results yet for {job_description}.");
                return Ok(());
            };
            print!("{}", render_results(&results, view)?);
            if open {
                open::that(&results.path)
                    .with_context(|| format!("failed to open {}", results.path.display()))?;
            }
        }
        Command::Export {
            job_description,
            destination,
        } => {
            let target = service.export_results(&job_description, &destination).await?;
            println!("Saved {}", target.display());
        }
        Command::Template { force } => {
            let path = service.settings().template_path.clone();
            write_default_template(&path, force)?;
            println!("Wrote {}", path.display());
        }
        Command::Settings(_) | Command::Credentials(_) => {
            anyhow::bail!("settings and credentials commands do not use the service")
        }
    }

    Ok(())
}

async fn run_search(
    service: &CoreService,
    job_description: &str,
    locations: &[String],
) -> anyhow::Result<()> {
    let settings = service.settings();
    for location in locations {
        if !settings
            .known_locations
            .iter()
            .any(|known| known.eq_ignore_ascii_case(location.trim()))
        {
            warn!(%location, "location is not in the known list, passing it through");
        }
    }

    service.start_run(job_description, locations).await?;

    let interval = Duration::from_secs_f64(settings.poll_interval_seconds);
    let last = watch_status(
        service.status_channel(),
        settings.poll_iterations,
        interval,
        |status| match status {
            AgentStatus::Idle => {}
            AgentStatus::Progress(message) => println!("... {message}"),
            AgentStatus::Succeeded => println!("Search finished."),
            AgentStatus::Failed(message) => println!("Search failed: {message}"),
        },
    )
    .await;

    if !last.is_terminal() {
        info!(checks = settings.poll_iterations, "status polling budget exhausted");
        println!("{}", unfinished_watch_notice(settings.poll_iterations, &last));
    }

    match service.wait_for_run().await? {
        Some(RunPhase::Succeeded) => {
            if !last.is_terminal() {
                println!("Search finished.");
            }
            if let Some(results) = service.load_results(job_description).await? {
                print!("{}", render_results(&results, ResultsView::Table)?);
            }
            Ok(())
        }
        Some(_) => match service.status() {
            AgentStatus::Failed(message) => Err(CoreError::AgentFault(message).into()),
            other => Err(CoreError::AgentFault(other.to_raw()).into()),
        },
        None => Ok(()),
    }
}

fn unfinished_watch_notice(checks: u32, last: &AgentStatus) -> String {
    let last = match last {
        AgentStatus::Idle => "Idle".to_string(),
        AgentStatus::Progress(message) => message.clone(),
        other => other.to_raw(),
    };
    format!(
        "Stopped watching after {checks} status checks (last status: {last}). \
         The search is still running and stops if this command is interrupted."
    )
}

fn handle_credentials(command: CredentialsCommand) -> anyhow::Result<()> {
    let store = ModelApiKeyStore::new();
    match command {
        CredentialsCommand::Set { key } => {
            let key = match key {
                Some(key) => key,
                None => {
                    let mut line = String::new();
                    std::io::stdin()
                        .read_line(&mut line)
                        .context("failed to read API key from stdin")?;
                    line
                }
            };
            if key.trim().is_empty() {
                return Err(CoreError::InvalidRequest("API key is empty".to_string()).into());
            }
            store.save(&key)?;
            println!("Model API key stored.");
        }
        CredentialsCommand::Clear => {
            store.clear()?;
            println!("Model API key removed.");
        }
        CredentialsCommand::Status => {
            if store.resolve().is_some() {
                println!("Model API key: configured");
            } else {
                println!("Model API key: missing");
            }
        }
    }
    Ok(())
}

pub fn render_results(results: &LedgerView, view: ResultsView) -> anyhow::Result<String> {
    if view == ResultsView::Json {
        let mut json = serde_json::to_string_pretty(&serde_json::json!({
            "runDate": results.metadata.run_date,
            "jobTitle": results.metadata.job_title,
            "candidates": results.candidates,
        }))?;
        json.push('\n');
        return Ok(json);
    }

    let mut out = String::new();
    writeln!(
        out,
        "{} | run date {}",
        results.metadata.job_title.as_deref().unwrap_or("(untitled)"),
        results.metadata.run_date.as_deref().unwrap_or("-")
    )?;

    if results.candidates.is_empty() {
        writeln!(out, "No candidates recorded.")?;
        return Ok(out);
    }

    match view {
        ResultsView::Table => render_table(&mut out, &results.candidates)?,
        ResultsView::Cards => render_cards(&mut out, &results.candidates)?,
        ResultsView::Json => {}
    }
    Ok(out)
}

fn render_table(out: &mut String, candidates: &[CandidateRecord]) -> std::fmt::Result {
    let name_width = candidates
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    writeln!(out, "{:<name_width$}  {:>5}  {:<16}  Profile", "Name", "Score", "Location")?;
    for candidate in candidates {
        writeln!(
            out,
            "{:<name_width$}  {:>5}  {:<16}  {}",
            candidate.name,
            candidate.match_score,
            candidate.location,
            candidate.profile_url
        )?;
    }
    Ok(())
}

fn render_cards(out: &mut String, candidates: &[CandidateRecord]) -> std::fmt::Result {
    for candidate in candidates {
        writeln!(out)?;
        writeln!(out, "{} ({}%)", candidate.name, candidate.match_score)?;
        writeln!(out, "  Location: {}", candidate.location)?;
        writeln!(out, "  Matched: {}", candidate.matched_skills.join(", "))?;
        writeln!(out, "  Missing: {}", candidate.non_matched_skills.join(", "))?;
        writeln!(out, "  Profile: {}", candidate.profile_url)?;
    }
    Ok(())
}
