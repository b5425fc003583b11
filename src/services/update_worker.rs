// Damecon Update Worker
// Keeps the game extension sources current on a background task. The shell
// talks to it only through `WorkerMessage` envelopes: requests in, status
// and progress replies out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::types::errors::UpdateError;
use crate::types::update::{
    DoUpdateData, ProcessName, ProcessProgress, ProcessResult, UpdateStatus, WorkerMessage,
};

/// Name of the top-level process wrapping a whole update run.
pub const UPDATE_PROCESS_NAME: &str = "KC3 Update";

const FIXED_CHANNELS: [&str; 3] = ["release", "master", "develop"];

/// Accepts `release`, `master`, `develop` and anything starting with `custom`.
pub fn validate_channel(channel: &str) -> Result<(), UpdateError> {
    if FIXED_CHANNELS.contains(&channel) || channel.starts_with("custom") {
        Ok(())
    } else {
        Err(UpdateError::InvalidChannel(channel.to_string()))
    }
}

/// Custom channels are managed by hand and never checked for updates.
pub fn is_custom_channel(channel: &str) -> bool {
    channel.starts_with("custom")
}

/// Directory the sources of `channel` live in.
pub fn channel_dir(extensions_path: &Path, channel: &str) -> PathBuf {
    extensions_path.join(format!("kc3kai-{}", channel))
}

/// Parses a raw `{ type, data }` request.
pub fn parse_request(raw: serde_json::Value) -> Result<WorkerMessage, UpdateError> {
    let msg: WorkerMessage = serde_json::from_value(raw).map_err(|e| {
        UpdateError::InvalidMessage(format!(
            "Messages sent to update worker must be in the format {{ type, data }}: {}",
            e
        ))
    })?;
    match &msg {
        WorkerMessage::GetIsUpdating => Ok(msg),
        WorkerMessage::DoUpdate(data) if data.path.is_empty() || data.channel.is_empty() => Err(
            UpdateError::InvalidMessage("do-update data must be in the format { path, channel }".to_string()),
        ),
        WorkerMessage::DoUpdate(_) => Ok(msg),
        other => Err(UpdateError::InvalidMessage(format!(
            "Unknown message type {:?}",
            other
        ))),
    }
}

/// Hands out [`ProcessTracker`]s that report on the worker's reply channel.
#[derive(Clone)]
pub struct ProcessReporter {
    tx: UnboundedSender<WorkerMessage>,
}

impl ProcessReporter {
    pub fn new(tx: UnboundedSender<WorkerMessage>) -> Self {
        Self { tx }
    }

    /// Announces a new process and returns its tracker.
    pub fn start(&self, name: impl Into<String>) -> ProcessTracker {
        let name = name.into();
        let _ = self.tx.send(WorkerMessage::UpdateProcessStarted(ProcessName {
            name: name.clone(),
        }));
        ProcessTracker {
            name,
            ok: false,
            tx: self.tx.clone(),
        }
    }
}

/// One named step of an update. Reports `update-process-completed` when
/// dropped, so a failing step still closes; `ok` is set only by
/// [`ProcessTracker::complete`].
pub struct ProcessTracker {
    name: String,
    ok: bool,
    tx: UnboundedSender<WorkerMessage>,
}

impl ProcessTracker {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn progress(&self, phase: &str, current: u64, total: Option<u64>) {
        let _ = self.tx.send(WorkerMessage::UpdateProcessProgress(ProcessProgress {
            name: self.name.clone(),
            phase: phase.to_string(),
            current,
            total,
        }));
    }

    pub fn complete(mut self) {
        self.ok = true;
    }
}

impl Drop for ProcessTracker {
    fn drop(&mut self) {
        let _ = self.tx.send(WorkerMessage::UpdateProcessCompleted(ProcessResult {
            name: std::mem::take(&mut self.name),
            ok: self.ok,
        }));
    }
}

/// Fetches and installs extension sources for a channel.
#[async_trait]
pub trait Updater: Send + Sync {
    async fn update(
        &self,
        extensions_path: &Path,
        channel: &str,
        reporter: &ProcessReporter,
    ) -> Result<(), UpdateError>;
}

/// Updater for sources already unpacked on disk. It verifies the channel
/// directory and reports the installed version; it never downloads.
#[derive(Debug, Default, Clone)]
pub struct LocalReleaseUpdater;

#[async_trait]
impl Updater for LocalReleaseUpdater {
    async fn update(
        &self,
        extensions_path: &Path,
        channel: &str,
        reporter: &ProcessReporter,
    ) -> Result<(), UpdateError> {
        let dir = channel_dir(extensions_path, channel);
        tracing::info!(dir = %dir.display(), channel, "checking extension sources");

        let run = reporter.start(UPDATE_PROCESS_NAME);
        if is_custom_channel(channel) {
            tracing::info!("custom update channel, skipping update check");
            run.complete();
            return Ok(());
        }

        let marker = if channel == "release" { "release" } else { "package.json" };
        let phases = 2;
        run.progress("", 1, Some(phases));

        let check = reporter.start("Checking for updates");
        let contents = tokio::fs::read_to_string(dir.join(marker)).await.map_err(|e| {
            UpdateError::Failed(format!("{} missing in {}: {}", marker, dir.display(), e))
        })?;
        check.complete();

        if channel == "release" {
            tracing::info!(version = contents.trim(), "installed release");
        }
        run.progress("", phases, Some(phases));
        run.complete();
        Ok(())
    }
}

struct WorkerState {
    is_updating: bool,
    channel: Option<String>,
}

impl WorkerState {
    fn status(&self) -> WorkerMessage {
        WorkerMessage::StatusIsUpdating(UpdateStatus {
            is_updating: self.is_updating,
            channel: self.channel.clone(),
        })
    }
}

/// Handle to the running worker task.
pub struct UpdateWorker {
    requests: UnboundedSender<WorkerMessage>,
    handle: JoinHandle<()>,
}

impl UpdateWorker {
    /// Starts the worker on the current tokio runtime. Returns the handle
    /// and the receiver of every reply the worker posts.
    pub fn spawn(updater: Arc<dyn Updater>) -> (Self, UnboundedReceiver<WorkerMessage>) {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(updater, req_rx, reply_tx));
        (
            Self {
                requests: req_tx,
                handle,
            },
            reply_rx,
        )
    }

    pub fn post(&self, msg: WorkerMessage) -> Result<(), UpdateError> {
        self.requests
            .send(msg)
            .map_err(|_| UpdateError::Failed("update worker has stopped".to_string()))
    }

    pub fn request_update(&self, path: impl Into<String>, channel: impl Into<String>) -> Result<(), UpdateError> {
        self.post(WorkerMessage::DoUpdate(DoUpdateData {
            path: path.into(),
            channel: channel.into(),
        }))
    }

    pub fn request_status(&self) -> Result<(), UpdateError> {
        self.post(WorkerMessage::GetIsUpdating)
    }

    /// Closes the request channel and waits for the in-flight update, if any.
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "update worker panicked");
        }
    }
}

async fn run_worker(
    updater: Arc<dyn Updater>,
    mut requests: UnboundedReceiver<WorkerMessage>,
    replies: UnboundedSender<WorkerMessage>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();
    let mut state = WorkerState {
        is_updating: false,
        channel: None,
    };
    let mut accepting = true;

    loop {
        tokio::select! {
            msg = requests.recv(), if accepting => {
                let Some(msg) = msg else {
                    accepting = false;
                    if !state.is_updating {
                        break;
                    }
                    continue;
                };
                tracing::debug!(?msg, "update worker received message");
                match msg {
                    WorkerMessage::GetIsUpdating => {
                        let _ = replies.send(state.status());
                    }
                    WorkerMessage::DoUpdate(data) => {
                        if state.is_updating {
                            let _ = replies.send(WorkerMessage::ErrorDoUpdate(
                                UpdateError::AlreadyUpdating.to_string(),
                            ));
                            continue;
                        }
                        if data.path.is_empty() || data.channel.is_empty() {
                            let _ = replies.send(WorkerMessage::ErrorDoUpdate(
                                "do-update data must be in the format { path, channel }".to_string(),
                            ));
                            continue;
                        }
                        state.is_updating = true;
                        state.channel = Some(data.channel.clone());
                        let _ = replies.send(state.status());

                        let updater = updater.clone();
                        let replies = replies.clone();
                        let done_tx = done_tx.clone();
                        tokio::spawn(async move {
                            let reporter = ProcessReporter::new(replies.clone());
                            let result = match validate_channel(&data.channel) {
                                Ok(()) => updater.update(Path::new(&data.path), &data.channel, &reporter).await,
                                Err(e) => Err(e),
                            };
                            if let Err(e) = result {
                                tracing::error!(error = %e, "update failed");
                                let _ = replies.send(WorkerMessage::ErrorDoUpdate(e.to_string()));
                            }
                            let _ = done_tx.send(());
                        });
                    }
                    other => {
                        let e = UpdateError::InvalidMessage(format!("Unknown message type {:?}", other));
                        tracing::warn!(error = %e, "update worker ignored message");
                    }
                }
            }
            Some(()) = done_rx.recv() => {
                state.is_updating = false;
                let _ = replies.send(state.status());
                if !accepting {
                    break;
                }
            }
        }
    }
    tracing::debug!("update worker stopped");
}
