use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::document_parser::JobDescriptionReader;
use super::errors::CoreError;
use super::ledger::{LedgerDocument, SLOT_CAPACITY};
use super::models::{CandidateRecord, RunConfiguration};
use super::status::StatusChannel;

/// Result handed back to the agent. Failures are values, never panics or
/// `Err`, so the agent can reason about them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Text { text: String },
    Ok { message: String },
    Error { message: String },
}

impl ActionOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ActionOutcome::Error { .. })
    }
}

/// The only side effects the agent can trigger.
pub trait ScoutActions: Send + Sync {
    fn read_document_text(&self, path: &Path) -> ActionOutcome;
    fn persist_candidate(&self, candidate: CandidateRecord) -> ActionOutcome;
    fn publish_status(&self, status: &str) -> ActionOutcome;
}

/// An action invocation as it arrives from the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    ReadDocumentText { path: String },
    PersistCandidate { candidate: CandidateRecord },
    PublishStatus { status: String },
}

impl ActionRequest {
    pub fn dispatch(self, actions: &dyn ScoutActions) -> ActionOutcome {
        match self {
            ActionRequest::ReadDocumentText { path } => actions.read_document_text(Path::new(&path)),
            ActionRequest::PersistCandidate { candidate } => actions.persist_candidate(candidate),
            ActionRequest::PublishStatus { status } => actions.publish_status(&status),
        }
    }
}

/// Name and description of each action, as advertised to the agent.
pub const ACTION_CATALOG: [(&str, &str); 3] = [
    (
        "read_document_text",
        "Read the job description document at `path` and return its text",
    ),
    (
        "persist_candidate",
        "Save one evaluated candidate (name, match_score 0-100, matched_skills, non_matched_skills, location, profile_url) to the results spreadsheet",
    ),
    (
        "publish_status",
        "Update the progress message shown to the operator",
    ),
];

/// Action set bound to one run: the ledger target and job title come from the
/// run's configuration rather than shared state.
pub struct LedgerActions {
    config: RunConfiguration,
    status: Arc<StatusChannel>,
    reader: JobDescriptionReader,
}

impl LedgerActions {
    pub fn new(config: RunConfiguration, status: Arc<StatusChannel>) -> Self {
        Self {
            config,
            status,
            reader: JobDescriptionReader::default(),
        }
    }

    fn write_candidate(&self, candidate: &CandidateRecord) -> anyhow::Result<()> {
        let mut doc =
            LedgerDocument::open_or_create(&self.config.ledger_path, &self.config.template_path)?;
        doc.write_metadata(self.config.run_date, &self.config.job_title)?;

        if !doc.append_record(candidate)? {
            return Err(CoreError::CapacityExceeded {
                path: self.config.ledger_path.display().to_string(),
                name: candidate.name.clone(),
                capacity: SLOT_CAPACITY,
            }
            .into());
        }

        doc.save()
    }
}

impl ScoutActions for LedgerActions {
    fn read_document_text(&self, path: &Path) -> ActionOutcome {
        match self.reader.read_text(path) {
            Ok(text) => {
                info!(path = %path.display(), chars = text.chars().count(), "read job description");
                ActionOutcome::Text { text }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "job description unreadable");
                ActionOutcome::Error {
                    message: err.to_string(),
                }
            }
        }
    }

    fn persist_candidate(&self, candidate: CandidateRecord) -> ActionOutcome {
        if let Err(reason) = candidate.validate() {
            warn!(candidate = %candidate.name, %reason, "rejected candidate");
            return ActionOutcome::Error {
                message: CoreError::InvalidRequest(reason).to_string(),
            };
        }

        info!(
            ledger = %self.config.ledger_path.display(),
            candidate = %candidate.name,
            score = candidate.match_score,
            "saving candidate"
        );

        match self.write_candidate(&candidate) {
            Ok(()) => ActionOutcome::Ok {
                message: format!("Saved candidate {}", candidate.name),
            },
            Err(err) => {
                if let Some(CoreError::CapacityExceeded { .. }) = err.downcast_ref::<CoreError>() {
                    warn!(candidate = %candidate.name, "{err}");
                } else {
                    error!(candidate = %candidate.name, error = %format!("{err:#}"), "failed to save candidate");
                }
                ActionOutcome::Error {
                    message: format!("Failed to save candidate: {err}"),
                }
            }
        }
    }

    fn publish_status(&self, status: &str) -> ActionOutcome {
        info!(%status, "status update");
        self.status.set(status);
        ActionOutcome::Ok {
            message: "Status updated".to_string(),
        }
    }
}
