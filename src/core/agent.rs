use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::actions::{ActionOutcome, ActionRequest, ScoutActions, ACTION_CATALOG};
use super::errors::CoreError;

pub const API_KEY_ENV: &str = "TALENT_FINDER_MODEL_API_KEY";
const STDERR_TAIL_LINES: usize = 20;

const TASK_TEMPLATE: &str = r#"
You are an expert recruiter sourcing candidates on LinkedIn.

The job to staff is described in the document at {jd_path}.

Step 1: Read the job description
- Call `read_document_text` with the path `{jd_path}`
- Then call `publish_status` with "JD loaded - opening LinkedIn"

Step 2: Open LinkedIn Talent Solutions
- Go to https://www.linkedin.com/talent/home and wait for the page to load
- Call `publish_status` with "Starting LinkedIn candidate search"

Step 3: Search
- Start a new search using a job title taken from the document (or its file name)
- Type the title into the search box and run the search

Step 4: Apply location filters
- Call `publish_status` with "Applying location filters"
- Open "+ Candidate geographic locations"
- For each location below, in order:
{filters}
    - Type the location into the input
    - Click the first suggestion; typing alone does not apply the filter
    - Wait for the result list to refresh before the next location

Step 5: Evaluate candidates
- Call `publish_status` with "Analyzing candidates"
- Scroll to load more results when needed
- For each candidate:
    - Open the profile
    - Collect name, profile URL, location and skills
    - Compare the skills against the job description requirements
    - Score the match from 0 to 100
    - Call `publish_status` with "Saving results for [name]"
    - Call `persist_candidate` with all collected fields
    - Return to the result list
- Stop after {max_steps} steps or once enough candidates are saved. The task
  succeeds as long as some qualified candidates were evaluated and saved.

Never skip the location filters and only evaluate candidates after they are applied.
"#;

/// Builds the natural-language task, one bullet per location filter.
pub fn build_task(jd_path: &Path, locations: &[String], max_steps: u32) -> String {
    let filters = locations
        .iter()
        .map(|location| format!("    - {location}"))
        .collect::<Vec<_>>()
        .join("\n");

    TASK_TEMPLATE
        .replace("{jd_path}", &jd_path.display().to_string())
        .replace("{filters}", &filters)
        .replace("{max_steps}", &max_steps.to_string())
}

#[derive(Debug, Clone)]
pub struct AgentTask {
    pub task: String,
    pub model_id: String,
    pub temperature: f64,
    pub max_steps: u32,
    pub browser_url: String,
}

/// The external agent. Returns once the agent stops; `Err` is a fault.
pub trait AgentDriver: Send + Sync {
    fn run(
        &self,
        task: AgentTask,
        actions: Arc<dyn ScoutActions>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Serialize)]
struct ActionSpec {
    name: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HostMessage<'a> {
    Start {
        task: &'a str,
        model_id: &'a str,
        temperature: f64,
        max_steps: u32,
        browser_url: &'a str,
        actions: Vec<ActionSpec>,
    },
    ActionResult {
        id: u64,
        result: &'a ActionOutcome,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AgentMessage {
    Action { id: u64, request: ActionRequest },
    Log { message: String },
    Done {
        #[serde(default)]
        summary: Option<String>,
    },
    Failed { message: String },
}

/// Runs the agent framework as a child process speaking newline-delimited
/// JSON over stdin/stdout.
///
/// The host sends one `start` message, answers every `action` message with an
/// `action_result`, and waits for `done` or `failed`. Anything on stdout that
/// is not a protocol message is ignored; stderr goes to the debug log.
pub struct CommandAgentDriver {
    command: String,
    args: Vec<String>,
    api_key: Option<String>,
}

impl CommandAgentDriver {
    pub fn new(command: String, args: Vec<String>, api_key: Option<String>) -> Self {
        Self {
            command,
            args,
            api_key,
        }
    }

    async fn drive(&self, task: AgentTask, actions: Arc<dyn ScoutActions>) -> anyhow::Result<()> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(key) = &self.api_key {
            command.env(API_KEY_ENV, key);
        }

        let mut child = command.spawn().map_err(|err| {
            CoreError::AgentFault(format!("could not start agent {}: {err}", self.command))
        })?;

        let mut stdin = child.stdin.take().context("agent stdin unavailable")?;
        let stdout = child.stdout.take().context("agent stdout unavailable")?;
        let stderr = child.stderr.take().context("agent stderr unavailable")?;

        let stderr_task = tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("{line}");
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        send(
            &mut stdin,
            &HostMessage::Start {
                task: &task.task,
                model_id: &task.model_id,
                temperature: task.temperature,
                max_steps: task.max_steps,
                browser_url: &task.browser_url,
                actions: ACTION_CATALOG
                    .iter()
                    .map(|&(name, description)| ActionSpec { name, description })
                    .collect(),
            },
        )
        .await?;

        let mut finished: Option<anyhow::Result<()>> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message = match serde_json::from_str::<AgentMessage>(line) {
                Ok(message) => message,
                Err(err) => {
                    debug!(%line, %err, "ignoring non-protocol output");
                    continue;
                }
            };

            match message {
                AgentMessage::Action { id, request } => {
                    let actions = Arc::clone(&actions);
                    let result = tokio::task::spawn_blocking(move || request.dispatch(actions.as_ref()))
                        .await
                        .unwrap_or_else(|err| ActionOutcome::Error {
                            message: format!("action aborted: {err}"),
                        });
                    send(&mut stdin, &HostMessage::ActionResult { id, result: &result }).await?;
                }
                AgentMessage::Log { message } => info!("{message}"),
                AgentMessage::Done { summary } => {
                    if let Some(summary) = summary {
                        info!(%summary, "agent finished");
                    }
                    finished = Some(Ok(()));
                    break;
                }
                AgentMessage::Failed { message } => {
                    finished = Some(Err(CoreError::AgentFault(message).into()));
                    break;
                }
            }
        }

        drop(stdin);
        let exit = match timeout(Duration::from_secs(30), child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                warn!("agent process still running after completion, killing it");
                child.start_kill()?;
                None
            }
        };
        let stderr_tail = stderr_task.await.unwrap_or_default();

        match finished {
            Some(result) => result,
            None => {
                let exit = exit
                    .map(|status| status.to_string())
                    .unwrap_or_else(|| "no exit status".to_string());
                let mut message = format!("agent stopped without reporting completion ({exit})");
                if !stderr_tail.is_empty() {
                    message.push_str(":\n");
                    message.push_str(&stderr_tail);
                }
                Err(CoreError::AgentFault(message).into())
            }
        }
    }
}

impl AgentDriver for CommandAgentDriver {
    fn run(
        &self,
        task: AgentTask,
        actions: Arc<dyn ScoutActions>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        self.drive(task, actions)
    }
}

async fn send(stdin: &mut ChildStdin, message: &HostMessage<'_>) -> anyhow::Result<()> {
    let mut payload = serde_json::to_string(message)?;
    payload.push('\n');
    stdin
        .write_all(payload.as_bytes())
        .await
        .context("failed to write to agent stdin")?;
    stdin.flush().await?;
    Ok(())
}
