use std::sync::Mutex;

pub const IDLE: &str = "Idle";
pub const DONE_SENTINEL: &str = "__DONE__";
pub const ERROR_SENTINEL: &str = "__ERROR__";

/// Parsed view of the raw status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Progress(String),
    Succeeded,
    Failed(String),
}

impl AgentStatus {
    pub fn from_raw(raw: &str) -> Self {
        if raw == IDLE {
            AgentStatus::Idle
        } else if raw.contains(DONE_SENTINEL) {
            AgentStatus::Succeeded
        } else if let Some(rest) = raw.strip_prefix(ERROR_SENTINEL) {
            let message = rest.strip_prefix(':').unwrap_or(rest).trim();
            AgentStatus::Failed(message.to_string())
        } else {
            AgentStatus::Progress(raw.to_string())
        }
    }

    pub fn to_raw(&self) -> String {
        match self {
            AgentStatus::Idle => IDLE.to_string(),
            AgentStatus::Progress(text) => text.clone(),
            AgentStatus::Succeeded => DONE_SENTINEL.to_string(),
            AgentStatus::Failed(message) => format!("{ERROR_SENTINEL}: {message}"),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Succeeded | AgentStatus::Failed(_))
    }
}

/// Single-slot status register shared by the background run and its pollers.
///
/// Readers poll; there is no history and no wakeup. With more than one writer
/// the last `set` wins.
#[derive(Debug)]
pub struct StatusChannel {
    value: Mutex<String>,
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusChannel {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(IDLE.to_string()),
        }
    }

    pub fn set(&self, value: impl Into<String>) {
        let value = value.into();
        let mut guard = self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = value;
    }

    pub fn get(&self) -> String {
        self.value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn publish(&self, status: &AgentStatus) {
        self.set(status.to_raw());
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus::from_raw(&self.get())
    }
}
