//! Damecon RPC Server: JSON-RPC over stdin/stdout for the embedding host.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"tabs.query", "params":{"active":true}}
//! Response: {"id":1, "result":[...]} or {"id":1, "error":"..."}
//! Events:   {"event":"tabs.onCreated", "tabId":3, "windowId":1}
//!
//! Windows are backed by the headless surface backend; logs go to stderr
//! and are filtered with `DAMECON_LOG` (default `info`).

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use damecon::app::{Shell, ShellOptions};
use damecon::platform;
use damecon::rpc_handler::handle_method;
use damecon::services::update_worker::LocalReleaseUpdater;
use damecon::surface::headless::HeadlessBackend;
use damecon::types::extension::ExtensionEvent;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DAMECON_LOG";

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn emit(line: &Value) {
    let mut out = std::io::stdout().lock();
    if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
        tracing::error!("stdout closed");
    }
}

fn forward_events(rx: &mut broadcast::Receiver<ExtensionEvent>) {
    loop {
        match rx.try_recv() {
            Ok(event) => match serde_json::to_value(&event) {
                Ok(value) => emit(&value),
                Err(e) => tracing::warn!(error = %e, "could not encode extension event"),
            },
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "extension event subscriber lagged");
            }
            Err(_) => break,
        }
    }
}

async fn serve(mut shell: Shell, mut events: broadcast::Receiver<ExtensionEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rate_limiter = RateLimiter::new(200);

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(l)) => l,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "stdin read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let req: Value = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
                        continue;
                    }
                };
                let id = req.get("id").cloned().unwrap_or(Value::Null);

                if !rate_limiter.check() {
                    emit(&json!({"id": id, "error": "rate limit exceeded"}));
                    continue;
                }

                let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                let params = req.get("params").cloned().unwrap_or(json!({}));

                let response = match handle_method(&mut shell, method, &params).await {
                    Ok(val) => json!({"id": id, "result": val}),
                    Err(err) => json!({"id": id, "error": err}),
                };
                emit(&response);
            }
            event = shell.next_event() => {
                let Some(event) = event else { break };
                if !shell.dispatch(event) {
                    break;
                }
            }
        }
        shell.run_pending();
        forward_events(&mut events);
    }

    shell.shutdown().await;
    forward_events(&mut events);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = platform::get_data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(dir = %data_dir.display(), error = %e, "cannot create data directory");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "cannot start runtime");
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let options = ShellOptions {
            extensions_path: data_dir.join("extensions"),
            cookie_db: Some(data_dir.join("cookies.db")),
            ..Default::default()
        };
        let mut shell = match Shell::new(Box::new(HeadlessBackend::new()), options) {
            Ok(shell) => shell,
            Err(e) => {
                tracing::error!(error = %e, "failed to initialize shell");
                std::process::exit(1);
            }
        };
        let events = shell.subscribe();
        shell.start_update_worker(Arc::new(LocalReleaseUpdater));
        shell.open_startup_window();
        serve(shell, events).await;
    });
}
