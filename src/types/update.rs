use serde::{Deserialize, Serialize};

/// Envelope exchanged with the update worker: `{ "type": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum WorkerMessage {
    // Requests
    GetIsUpdating,
    DoUpdate(DoUpdateData),

    // Replies
    #[serde(rename = "status-kc3-is-updating")]
    StatusIsUpdating(UpdateStatus),
    UpdateProcessStarted(ProcessName),
    UpdateProcessProgress(ProcessProgress),
    UpdateProcessCompleted(ProcessResult),
    ErrorDoUpdate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoUpdateData {
    pub path: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub is_updating: bool,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessName {
    pub name: String,
}

/// `ok` is false when the process ended without finishing its work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub name: String,
    #[serde(default = "succeeded")]
    pub ok: bool,
}

fn succeeded() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessProgress {
    pub name: String,
    pub phase: String,
    pub current: u64,
    pub total: Option<u64>,
}

impl ProcessProgress {
    /// Human readable progress line, e.g. `Cloning repo (fetch) - 3/4 (75.0%)`.
    pub fn describe(&self) -> String {
        match self.total {
            Some(total) if total > 0 && total >= self.current => {
                let pct = self.current as f64 / total as f64 * 100.0;
                format!(
                    "{} ({}) - {}/{} ({:.1}%)",
                    self.name, self.phase, self.current, total, pct
                )
            }
            _ => format!("{} - waiting...", self.name),
        }
    }
}
