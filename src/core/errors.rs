use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to read document {path}: {reason}")]
    DocumentRead { path: String, reason: String },
    #[error("Ledger I/O failed for {path}: {reason}")]
    LedgerIo { path: String, reason: String },
    #[error("Ledger {path} is full ({capacity} candidate rows); record for {name} was dropped")]
    CapacityExceeded {
        path: String,
        name: String,
        capacity: usize,
    },
    #[error("Agent run failed: {0}")]
    AgentFault(String),
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),
    #[error("Job description not found: {0}")]
    JobDescriptionNotFound(String),
    #[error("A candidate search is already running")]
    RunInProgress,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    pub fn document_read(path: &std::path::Path, reason: impl ToString) -> Self {
        CoreError::DocumentRead {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn ledger_io(path: &std::path::Path, reason: impl ToString) -> Self {
        CoreError::LedgerIo {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
