use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use damecon::services::update_worker::{
    channel_dir, parse_request, LocalReleaseUpdater, ProcessReporter, UpdateWorker, Updater,
    UPDATE_PROCESS_NAME,
};
use damecon::types::errors::UpdateError;
use damecon::types::update::{DoUpdateData, ProcessResult, UpdateStatus, WorkerMessage};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

/// Updater that reports one step and waits for `release` before finishing.
struct GatedUpdater {
    release: Arc<Notify>,
}

#[async_trait]
impl Updater for GatedUpdater {
    async fn update(&self, _path: &Path, _channel: &str, reporter: &ProcessReporter) -> Result<(), UpdateError> {
        let run = reporter.start(UPDATE_PROCESS_NAME);
        run.progress("fetch", 1, Some(2));
        self.release.notified().await;
        run.complete();
        Ok(())
    }
}

struct FailingUpdater;

#[async_trait]
impl Updater for FailingUpdater {
    async fn update(&self, _path: &Path, _channel: &str, reporter: &ProcessReporter) -> Result<(), UpdateError> {
        let _run = reporter.start(UPDATE_PROCESS_NAME);
        Err(UpdateError::Failed("network unreachable".to_string()))
    }
}

async fn next(rx: &mut UnboundedReceiver<WorkerMessage>) -> WorkerMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("worker reply timed out")
        .expect("worker reply channel closed")
}

fn status(is_updating: bool, channel: Option<&str>) -> WorkerMessage {
    WorkerMessage::StatusIsUpdating(UpdateStatus {
        is_updating,
        channel: channel.map(str::to_string),
    })
}

fn completed(name: &str) -> WorkerMessage {
    WorkerMessage::UpdateProcessCompleted(ProcessResult { name: name.to_string(), ok: true })
}

fn failed(name: &str) -> WorkerMessage {
    WorkerMessage::UpdateProcessCompleted(ProcessResult { name: name.to_string(), ok: false })
}

#[test]
fn test_wire_format() {
    let msg = status(true, Some("release"));
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({"type": "status-kc3-is-updating", "data": {"isUpdating": true, "channel": "release"}})
    );
    assert_eq!(
        serde_json::to_value(WorkerMessage::GetIsUpdating).unwrap(),
        json!({"type": "get-is-updating"})
    );
}

#[test]
fn test_parse_request() {
    assert_eq!(
        parse_request(json!({"type": "get-is-updating"})).unwrap(),
        WorkerMessage::GetIsUpdating
    );
    assert_eq!(
        parse_request(json!({"type": "do-update", "data": {"path": "/x", "channel": "master"}})).unwrap(),
        WorkerMessage::DoUpdate(DoUpdateData { path: "/x".into(), channel: "master".into() })
    );
    assert!(parse_request(json!({"type": "do-update", "data": {"path": "", "channel": "master"}})).is_err());
    assert!(parse_request(json!({"kind": "do-update"})).is_err());
}

#[test]
fn test_channel_dir() {
    assert_eq!(
        channel_dir(Path::new("/ext"), "develop"),
        Path::new("/ext").join("kc3kai-develop")
    );
}

#[tokio::test]
async fn test_status_when_idle() {
    let (worker, mut rx) = UpdateWorker::spawn(Arc::new(FailingUpdater));
    worker.request_status().unwrap();
    assert_eq!(next(&mut rx).await, status(false, None));
    worker.shutdown().await;
}

#[tokio::test]
async fn test_update_lifecycle_and_concurrent_rejection() {
    let release = Arc::new(Notify::new());
    let (worker, mut rx) = UpdateWorker::spawn(Arc::new(GatedUpdater { release: release.clone() }));

    worker.request_update("/ext", "release").unwrap();
    assert_eq!(next(&mut rx).await, status(true, Some("release")));
    assert!(matches!(next(&mut rx).await, WorkerMessage::UpdateProcessStarted(_)));
    assert!(matches!(next(&mut rx).await, WorkerMessage::UpdateProcessProgress(_)));

    worker.request_update("/ext", "release").unwrap();
    assert_eq!(
        next(&mut rx).await,
        WorkerMessage::ErrorDoUpdate("Update already in progress.".to_string())
    );

    release.notify_one();
    assert_eq!(next(&mut rx).await, completed(UPDATE_PROCESS_NAME));
    assert_eq!(next(&mut rx).await, status(false, Some("release")));
    worker.shutdown().await;
}

#[tokio::test]
async fn test_invalid_channel_reports_error() {
    let (worker, mut rx) = UpdateWorker::spawn(Arc::new(FailingUpdater));
    worker.request_update("/ext", "nightly").unwrap();
    assert_eq!(next(&mut rx).await, status(true, Some("nightly")));
    assert_eq!(
        next(&mut rx).await,
        WorkerMessage::ErrorDoUpdate("Invalid update channel nightly".to_string())
    );
    assert_eq!(next(&mut rx).await, status(false, Some("nightly")));
    worker.shutdown().await;
}

#[tokio::test]
async fn test_failed_update_closes_process_as_failed() {
    let (worker, mut rx) = UpdateWorker::spawn(Arc::new(FailingUpdater));
    worker.request_update("/ext", "master").unwrap();
    assert_eq!(next(&mut rx).await, status(true, Some("master")));
    assert!(matches!(next(&mut rx).await, WorkerMessage::UpdateProcessStarted(_)));
    assert_eq!(next(&mut rx).await, failed(UPDATE_PROCESS_NAME));
    assert_eq!(
        next(&mut rx).await,
        WorkerMessage::ErrorDoUpdate("Update failed: network unreachable".to_string())
    );
    assert_eq!(next(&mut rx).await, status(false, Some("master")));
    worker.shutdown().await;
}

#[tokio::test]
async fn test_local_release_updater_reads_marker() {
    let dir = TempDir::new().unwrap();
    let release_dir = channel_dir(dir.path(), "release");
    std::fs::create_dir_all(&release_dir).unwrap();
    std::fs::write(release_dir.join("release"), "v1.2.3\n").unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    LocalReleaseUpdater
        .update(dir.path(), "release", &ProcessReporter::new(tx))
        .await
        .unwrap();

    let mut names = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let WorkerMessage::UpdateProcessCompleted(p) = msg {
            names.push(p.name);
        }
    }
    assert_eq!(names, vec!["Checking for updates".to_string(), UPDATE_PROCESS_NAME.to_string()]);
}

#[tokio::test]
async fn test_local_release_updater_missing_sources_fails() {
    let dir = TempDir::new().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let err = LocalReleaseUpdater
        .update(dir.path(), "develop", &ProcessReporter::new(tx))
        .await
        .unwrap_err();
    assert!(matches!(err, UpdateError::Failed(_)));

    let mut closed = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let WorkerMessage::UpdateProcessCompleted(p) = msg {
            closed.push(p);
        }
    }
    assert!(closed.iter().all(|p| !p.ok));
    assert_eq!(closed.last().map(|p| p.name.as_str()), Some(UPDATE_PROCESS_NAME));
}

#[test]
fn test_completion_without_ok_flag_reads_as_success() {
    let msg: WorkerMessage =
        serde_json::from_value(json!({"type": "update-process-completed", "data": {"name": "x"}})).unwrap();
    assert_eq!(msg, completed("x"));
}

#[tokio::test]
async fn test_custom_channel_skips_check() {
    let dir = TempDir::new().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    LocalReleaseUpdater
        .update(dir.path(), "custom-local", &ProcessReporter::new(tx))
        .await
        .unwrap();
    assert!(matches!(rx.try_recv(), Ok(WorkerMessage::UpdateProcessStarted(_))));
    assert_eq!(rx.try_recv().unwrap(), completed(UPDATE_PROCESS_NAME));
    assert!(rx.try_recv().is_err());
}
