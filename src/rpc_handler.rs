//! RPC method handler for the Damecon JSON-RPC protocol.
//!
//! Extension hosts reach the `chrome.cookies`, `chrome.tabs` and
//! `chrome.windows` bridge through `handle_method`; the chrome UI reaches
//! the shell through `webui.message`. Kept apart from `rpc_server.rs` so it
//! can be unit-tested without stdin/stdout.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::app::Shell;
use crate::types::cookie::{CookieDetails, CookieFilter, SetCookieDetails};
use crate::types::event::ShellCommand;
use crate::types::extension::{
    CreateTabDetails, CreateWindowDetails, TabIdList, TabQuery, UpdateTabDetails,
};
use crate::types::tab::{TabId, WindowId};

fn parse<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T, String> {
    serde_json::from_value(value.clone()).map_err(|e| format!("invalid {}: {}", what, e))
}

fn field<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, String> {
    let value = params.get(key).ok_or_else(|| format!("missing {}", key))?;
    parse(value, key)
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn parse_command(name: &str) -> Result<ShellCommand, String> {
    match name {
        "new-tab" => Ok(ShellCommand::NewTab),
        "close-tab" => Ok(ShellCommand::CloseTab),
        "reload" => Ok(ShellCommand::Reload),
        "toggle-inspector" => Ok(ShellCommand::ToggleInspector),
        other => Err(format!("unknown command: {}", other)),
    }
}

/// Dispatch a JSON-RPC method call to the shell.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// Window-level notices raised by the call are pumped before returning.
pub async fn handle_method(shell: &mut Shell, method: &str, params: &Value) -> Result<Value, String> {
    let result = dispatch(shell, method, params).await;
    shell.pump();
    if let Err(e) = &result {
        tracing::debug!(method, error = %e, "rpc call failed");
    }
    result
}

async fn dispatch(shell: &mut Shell, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        // ─── chrome.cookies ───
        "cookies.get" => {
            let details: CookieDetails = parse(params, "details")?;
            to_value(shell.bridge().cookies_get(&details).await)
        }
        "cookies.getAll" => {
            let filter: CookieFilter = parse(params, "filter")?;
            to_value(shell.bridge().cookies_get_all(&filter).await)
        }
        "cookies.set" => {
            let details: SetCookieDetails = parse(params, "details")?;
            let cookie = shell
                .bridge()
                .cookies_set(&details)
                .await
                .map_err(|e| e.to_string())?;
            to_value(cookie)
        }
        "cookies.remove" => {
            let details: CookieDetails = parse(params, "details")?;
            to_value(shell.bridge().cookies_remove(&details).await)
        }
        "cookies.getAllCookieStores" => {
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.cookies_get_all_stores(host))
        }

        // ─── chrome.tabs ───
        "tabs.get" => {
            let tab: TabId = field(params, "tabId")?;
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.tabs_get(host, tab).map_err(|e| e.to_string())?)
        }
        "tabs.query" => {
            let query: TabQuery = parse(params, "queryInfo")?;
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.tabs_query(host, &query))
        }
        "tabs.create" => {
            let details: CreateTabDetails = parse(params, "createProperties")?;
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.tabs_create(host, &details).map_err(|e| e.to_string())?)
        }
        "tabs.update" => {
            let tab: TabId = field(params, "tabId")?;
            let details: UpdateTabDetails = field(params, "updateProperties")?;
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.tabs_update(host, tab, &details).map_err(|e| e.to_string())?)
        }
        "tabs.remove" => {
            let tabs: TabIdList = field(params, "tabIds")?;
            let (bridge, host) = shell.bridge_and_host();
            bridge
                .tabs_remove(host, &tabs.into_vec())
                .map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }
        "tabs.reload" => {
            let tab: TabId = field(params, "tabId")?;
            let (bridge, host) = shell.bridge_and_host();
            bridge.tabs_reload(host, tab).map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }

        // ─── chrome.windows ───
        "windows.get" => {
            let window: WindowId = field(params, "windowId")?;
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.windows_get(host, window).map_err(|e| e.to_string())?)
        }
        "windows.getAll" => {
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.windows_get_all(host))
        }
        "windows.getLastFocused" => {
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.windows_get_last_focused(host).map_err(|e| e.to_string())?)
        }
        "windows.create" => {
            let details: CreateWindowDetails = parse(params, "createData")?;
            let (bridge, host) = shell.bridge_and_host();
            to_value(bridge.windows_create(host, &details).map_err(|e| e.to_string())?)
        }
        "windows.remove" => {
            let window: WindowId = field(params, "windowId")?;
            let (bridge, host) = shell.bridge_and_host();
            bridge.windows_remove(host, window).map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }

        // ─── Shell ───
        "webui.message" => {
            let message: String = field(params, "message")?;
            let data = params.get("data").cloned().unwrap_or_else(|| json!({}));
            shell.handle_webui_message(&message, &data)
        }
        "shell.command" => {
            let name: String = field(params, "command")?;
            let command = parse_command(&name)?;
            shell.run_command(command).map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }
        "worker.post" => {
            shell
                .post_worker_request(params.clone())
                .map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }
        "ping" => Ok(json!({"pong": true})),

        _ => Err(format!("unknown method: {}", method)),
    }
}
