use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::agent::{AgentDriver, CommandAgentDriver};
use super::browser::{BrowserProvider, ChromeLauncher};
use super::errors::CoreError;
use super::jd_store::JobDescriptionStore;
use super::ledger;
use super::models::{CandidateRecord, JobDescriptionEntry, LedgerMetadata, RunConfiguration, RuntimeSettings};
use super::naming;
use super::runner::{JobRunner, RunPhase, RunnerSettings};
use super::status::{AgentStatus, StatusChannel};

pub const INITIALIZING_STATUS: &str = "Initializing agent...";

#[derive(Debug, Clone)]
pub struct LedgerView {
    pub path: PathBuf,
    pub metadata: LedgerMetadata,
    pub candidates: Vec<CandidateRecord>,
}

/// Entry point for the operator surface: job description uploads, starting a
/// search, polling its status, and reading results back.
pub struct CoreService<B = ChromeLauncher, A = CommandAgentDriver> {
    settings: RuntimeSettings,
    jd_store: JobDescriptionStore,
    status: Arc<StatusChannel>,
    runner: Arc<JobRunner<B, A>>,
    active_run: Mutex<Option<JoinHandle<RunPhase>>>,
}

impl CoreService {
    pub fn new(settings: RuntimeSettings, model_api_key: Option<String>) -> Arc<Self> {
        let agent = CommandAgentDriver::new(
            settings.agent_command.clone(),
            settings.agent_args.clone(),
            model_api_key,
        );
        Self::with_drivers(settings, ChromeLauncher::new(), agent)
    }
}

impl<B, A> CoreService<B, A>
where
    B: BrowserProvider + 'static,
    A: AgentDriver + 'static,
{
    pub fn with_drivers(settings: RuntimeSettings, browser: B, agent: A) -> Arc<Self> {
        let status = Arc::new(StatusChannel::new());
        let runner = Arc::new(JobRunner::new(
            browser,
            agent,
            RunnerSettings::from_runtime(&settings),
            Arc::clone(&status),
        ));

        Arc::new(Self {
            jd_store: JobDescriptionStore::new(settings.jd_dir.clone()),
            settings,
            status,
            runner,
            active_run: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn status(&self) -> AgentStatus {
        self.status.status()
    }

    pub fn status_channel(&self) -> &Arc<StatusChannel> {
        &self.status
    }

    pub async fn upload_job_description(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> anyhow::Result<String> {
        self.jd_store.save_upload(original_name, bytes).await
    }

    pub async fn list_job_descriptions(&self) -> anyhow::Result<Vec<JobDescriptionEntry>> {
        self.jd_store.list().await
    }

    /// Starts a search in the background. Refuses while the previous run is
    /// still going; empty `locations` falls back to the configured defaults.
    pub async fn start_run(&self, jd_file_name: &str, locations: &[String]) -> anyhow::Result<()> {
        let mut active = self.active_run.lock().await;
        if active.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(CoreError::RunInProgress.into());
        }

        let jd_path = self.jd_store.resolve(jd_file_name).await?;
        let ledger_path = self.ledger_path(jd_file_name);
        if !ledger_path.exists() && !self.settings.template_path.exists() {
            return Err(CoreError::InvalidRequest(format!(
                "ledger template {} is missing; create it with `talent-finder template`",
                self.settings.template_path.display()
            ))
            .into());
        }

        let locations = if locations.is_empty() {
            self.settings.default_locations.clone()
        } else {
            locations.to_vec()
        };
        if locations.is_empty() {
            warn!("starting search without location filters");
        }

        let config = RunConfiguration::new(
            jd_path,
            &locations,
            &self.settings.output_dir,
            self.settings.template_path.clone(),
        );
        info!(jd = %config.jd_file_name, locations = ?config.locations, "queueing candidate search");

        self.status.set(INITIALIZING_STATUS);
        *active = Some(self.runner.spawn(config));
        Ok(())
    }

    /// Waits for the current run, if any, and returns its terminal phase.
    pub async fn wait_for_run(&self) -> anyhow::Result<Option<RunPhase>> {
        let handle = self.active_run.lock().await.take();
        match handle {
            Some(handle) => Ok(Some(handle.await.context("run task aborted")?)),
            None => Ok(None),
        }
    }

    pub fn ledger_path(&self, jd_file_name: &str) -> PathBuf {
        naming::ledger_path(&self.settings.output_dir, jd_file_name)
    }

    /// `None` when no search has written a ledger for this job description yet.
    pub async fn load_results(&self, jd_file_name: &str) -> anyhow::Result<Option<LedgerView>> {
        let path = self.ledger_path(jd_file_name);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let view = tokio::task::spawn_blocking(move || -> anyhow::Result<LedgerView> {
            Ok(LedgerView {
                metadata: ledger::read_metadata(&path)?,
                candidates: ledger::read_all(&path)?,
                path,
            })
        })
        .await??;

        Ok(Some(view))
    }

    /// Copies the ledger to `destination` (a directory or a file path).
    pub async fn export_results(
        &self,
        jd_file_name: &str,
        destination: &Path,
    ) -> anyhow::Result<PathBuf> {
        let source = self.ledger_path(jd_file_name);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(CoreError::ledger_io(&source, "no results yet for this job description").into());
        }

        let target = if destination.is_dir() {
            destination.join(naming::ledger_file_name(jd_file_name))
        } else {
            destination.to_path_buf()
        };

        tokio::fs::copy(&source, &target)
            .await
            .with_context(|| format!("failed to copy {} to {}", source.display(), target.display()))?;
        Ok(target)
    }
}
