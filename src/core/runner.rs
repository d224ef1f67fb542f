use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::actions::{LedgerActions, ScoutActions};
use super::agent::{build_task, AgentDriver, AgentTask};
use super::browser::{BrowserConfig, BrowserProvider};
use super::models::{RunConfiguration, RuntimeSettings};
use super::status::{AgentStatus, StatusChannel};

const BROWSER_CLOSE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Initializing,
    BrowserLaunching,
    AgentRunning,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub browser: BrowserConfig,
    pub model_id: String,
    pub temperature: f64,
    pub max_steps: u32,
}

impl RunnerSettings {
    pub fn from_runtime(settings: &RuntimeSettings) -> Self {
        Self {
            browser: BrowserConfig {
                // the target site's bot detection needs a visible, real browser
                headless: false,
                binary_path: settings.browser_binary_path.clone(),
                debugging_port: settings.browser_debugging_port,
                profile_dir: settings.browser_profile_dir.clone(),
                startup_timeout: Duration::from_secs(settings.browser_startup_timeout_seconds),
            },
            model_id: settings.model_id.clone(),
            temperature: settings.model_temperature,
            max_steps: settings.max_steps,
        }
    }
}

/// Drives one candidate search from browser launch to a terminal status.
///
/// Every outcome ends as exactly one terminal value on the status channel:
/// `__DONE__` after a normal agent return, `__ERROR__: <message>` after any
/// failure, panics included. The browser is closed in both cases before the
/// terminal value is published. Overlapping runs are the caller's concern.
pub struct JobRunner<B, A> {
    browser: B,
    agent: A,
    settings: RunnerSettings,
    status: Arc<StatusChannel>,
    phase: Mutex<RunPhase>,
}

impl<B: BrowserProvider, A: AgentDriver> JobRunner<B, A> {
    pub fn new(browser: B, agent: A, settings: RunnerSettings, status: Arc<StatusChannel>) -> Self {
        Self {
            browser,
            agent,
            settings,
            status,
            phase: Mutex::new(RunPhase::Idle),
        }
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> &Arc<StatusChannel> {
        &self.status
    }

    /// Runs in the background; the handle resolves to the terminal phase.
    pub fn spawn(self: &Arc<Self>, config: RunConfiguration) -> JoinHandle<RunPhase>
    where
        B: 'static,
        A: 'static,
    {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.run(config).await })
    }

    pub async fn run(&self, config: RunConfiguration) -> RunPhase {
        let span = info_span!("run", run_id = %Uuid::new_v4(), jd = %config.jd_file_name);
        let terminal = self.run_phases(config).instrument(span).await;
        self.enter(RunPhase::Idle);
        terminal
    }

    async fn run_phases(&self, config: RunConfiguration) -> RunPhase {
        self.enter(RunPhase::Initializing);
        info!(
            jd_path = %config.jd_path.display(),
            job_title = %config.job_title,
            locations = ?config.locations,
            ledger = %config.ledger_path.display(),
            max_steps = self.settings.max_steps,
            "starting candidate search"
        );

        self.enter(RunPhase::BrowserLaunching);
        let session = match self.browser.launch(&self.settings.browser).await {
            Ok(session) => session,
            Err(err) => return self.finish(Err(err)),
        };

        self.enter(RunPhase::AgentRunning);
        let task = AgentTask {
            task: build_task(&config.jd_path, &config.locations, self.settings.max_steps),
            model_id: self.settings.model_id.clone(),
            temperature: self.settings.temperature,
            max_steps: self.settings.max_steps,
            browser_url: session.debugging_url.clone(),
        };
        let actions: Arc<dyn ScoutActions> =
            Arc::new(LedgerActions::new(config, Arc::clone(&self.status)));

        let result = AssertUnwindSafe(self.agent.run(task, actions))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(anyhow::anyhow!("agent panicked: {}", panic_message(panic.as_ref())))
            });

        match timeout(BROWSER_CLOSE_TIMEOUT, self.browser.close(session)).await {
            Ok(Ok(())) => info!("browser closed"),
            Ok(Err(err)) => warn!(error = %format!("{err:#}"), "failed to close browser"),
            Err(_) => warn!("timed out closing browser"),
        }

        self.finish(result)
    }

    fn finish(&self, result: anyhow::Result<()>) -> RunPhase {
        match result {
            Ok(()) => {
                info!("candidate search finished");
                self.enter(RunPhase::Succeeded);
                self.status.publish(&AgentStatus::Succeeded);
                RunPhase::Succeeded
            }
            Err(err) => {
                error!(error = ?err, "candidate search failed");
                self.enter(RunPhase::Failed);
                self.status.publish(&AgentStatus::Failed(format!("{err:#}")));
                RunPhase::Failed
            }
        }
    }

    fn enter(&self, phase: RunPhase) {
        let mut current = self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::debug!(from = ?*current, to = ?phase, "run phase");
        *current = phase;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::path::PathBuf;

    use super::*;
    use crate::core::ledger;
    use crate::core::models::CandidateRecord;
    use crate::core::template::write_default_template;
    use crate::core::test_support::FakeBrowser;

    enum Script {
        SaveOne,
        FailMidway(&'static str),
        Panic,
    }

    struct ScriptedAgent {
        script: Script,
    }

    impl AgentDriver for ScriptedAgent {
        fn run(
            &self,
            task: AgentTask,
            actions: Arc<dyn ScoutActions>,
        ) -> impl Future<Output = anyhow::Result<()>> + Send {
            async move {
                assert!(task.task.contains("Costa Rica"));
                actions.publish_status("Analyzing candidates");
                match self.script {
                    Script::SaveOne => {
                        let outcome = actions.persist_candidate(CandidateRecord {
                            name: "Jane Doe".to_string(),
                            match_score: 87.5,
                            matched_skills: vec!["Go".to_string(), "Rust".to_string()],
                            non_matched_skills: vec!["Scala".to_string()],
                            location: "Costa Rica".to_string(),
                            profile_url: "https://linkedin.com/in/janedoe".to_string(),
                        });
                        assert!(!outcome.is_error(), "{outcome:?}");
                        Ok(())
                    }
                    Script::FailMidway(message) => Err(anyhow::anyhow!(message)),
                    Script::Panic => panic!("selector not found"),
                }
            }
        }
    }

    fn settings() -> RunnerSettings {
        RunnerSettings::from_runtime(&RuntimeSettings::default())
    }

    fn config(dir: &std::path::Path) -> RunConfiguration {
        let template = dir.join("Template.xlsx");
        write_default_template(&template, true).unwrap();
        RunConfiguration::new(
            PathBuf::from("JDs/Senior_Engineer.pdf"),
            &["Costa Rica".to_string()],
            &dir.join("output"),
            template,
        )
    }

    fn runner(browser: FakeBrowser, script: Script) -> JobRunner<FakeBrowser, ScriptedAgent> {
        JobRunner::new(
            browser,
            ScriptedAgent { script },
            settings(),
            Arc::new(StatusChannel::new()),
        )
    }

    #[tokio::test]
    async fn successful_run_publishes_done_and_closes_browser() {
        let temp = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::default();
        let runner = runner(browser.clone(), Script::SaveOne);

        let phase = runner.run(config(temp.path())).await;

        assert_eq!(phase, RunPhase::Succeeded);
        assert_eq!(runner.phase(), RunPhase::Idle);
        assert_eq!(runner.status().status(), AgentStatus::Succeeded);
        assert_eq!(browser.closes(), 1);

        let records =
            ledger::read_all(&temp.path().join("output").join("Find_Senior_Engineer.xlsx")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Jane Doe");
    }

    #[tokio::test]
    async fn agent_failure_publishes_error_sentinel_and_still_closes_browser() {
        let temp = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::default();
        let runner = runner(browser.clone(), Script::FailMidway("navigation timed out"));

        let phase = runner.run(config(temp.path())).await;

        assert_eq!(phase, RunPhase::Failed);
        let raw = runner.status().get();
        assert!(raw.starts_with("__ERROR__"), "{raw}");
        assert!(raw.contains("navigation timed out"), "{raw}");
        assert_eq!(browser.closes(), 1);
    }

    #[tokio::test]
    async fn agent_panic_is_reported_as_failure() {
        let temp = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::default();
        let runner = runner(browser.clone(), Script::Panic);

        let phase = runner.run(config(temp.path())).await;

        assert_eq!(phase, RunPhase::Failed);
        assert_eq!(
            runner.status().status(),
            AgentStatus::Failed("agent panicked: selector not found".to_string())
        );
        assert_eq!(browser.closes(), 1);
    }

    #[tokio::test]
    async fn browser_launch_failure_skips_agent_and_close() {
        let temp = tempfile::tempdir().unwrap();
        let browser = FakeBrowser {
            fail_launch: true,
            ..FakeBrowser::default()
        };
        let runner = runner(browser.clone(), Script::SaveOne);

        let phase = runner.run(config(temp.path())).await;

        assert_eq!(phase, RunPhase::Failed);
        assert!(runner.status().get().contains("no display"));
        assert_eq!(browser.launches(), 1);
        assert_eq!(browser.closes(), 0);
    }

    #[tokio::test]
    async fn spawned_run_reaches_terminal_status() {
        let temp = tempfile::tempdir().unwrap();
        let runner = Arc::new(runner(FakeBrowser::default(), Script::FailMidway("boom")));

        let handle = runner.spawn(config(temp.path()));
        assert_eq!(handle.await.unwrap(), RunPhase::Failed);
        assert_eq!(
            runner.status().status(),
            AgentStatus::Failed("boom".to_string())
        );
    }
}
