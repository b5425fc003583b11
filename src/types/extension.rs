use serde::{Deserialize, Serialize};

use super::tab::{TabId, TabSnapshot, WindowId};
use super::window::WindowSnapshot;

/// Identifier of the network session a bridge is attached to.
pub type SessionId = String;

/// `chrome.tabs.create` details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTabDetails {
    #[serde(default)]
    pub window_id: Option<WindowId>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// `chrome.tabs.update` details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTabDetails {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// `chrome.tabs.query` info. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub window_id: Option<WindowId>,
    #[serde(default)]
    pub current_window: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
}

/// `chrome.windows.create` details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWindowDetails {
    #[serde(default)]
    pub url: Option<UrlList>,
    #[serde(default)]
    pub focused: Option<bool>,
}

/// Chrome accepts either one URL or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlList {
    One(String),
    Many(Vec<String>),
}

impl UrlList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            UrlList::One(url) => vec![url],
            UrlList::Many(urls) => urls,
        }
    }
}

/// State changes re-broadcast to extension hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum ExtensionEvent {
    #[serde(rename = "tabs.onCreated")]
    TabCreated { tab_id: TabId, window_id: WindowId },
    #[serde(rename = "tabs.onActivated")]
    TabActivated { tab_id: TabId, window_id: WindowId },
    #[serde(rename = "tabs.onRemoved")]
    TabRemoved { tab_id: TabId, window_id: WindowId },
    #[serde(rename = "windows.onCreated")]
    WindowCreated { window_id: WindowId },
    #[serde(rename = "windows.onRemoved")]
    WindowRemoved { window_id: WindowId },
}

/// `chrome.tabs.Tab`, as returned to extensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeTab {
    pub id: TabId,
    pub index: usize,
    pub window_id: WindowId,
    pub active: bool,
    pub highlighted: bool,
    pub selected: bool,
    pub pinned: bool,
    pub incognito: bool,
    pub discarded: bool,
    pub auto_discardable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub status: &'static str,
    pub width: u32,
    pub height: u32,
}

impl From<TabSnapshot> for ChromeTab {
    fn from(tab: TabSnapshot) -> Self {
        Self {
            id: tab.id,
            index: tab.index,
            window_id: tab.window_id,
            active: tab.active,
            highlighted: tab.active,
            selected: tab.active,
            pinned: false,
            incognito: false,
            discarded: false,
            auto_discardable: true,
            url: tab.url,
            status: "complete",
            width: tab.width,
            height: tab.height,
        }
    }
}

/// `chrome.windows.Window`, as returned to extensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeWindow {
    pub id: WindowId,
    pub focused: bool,
    pub top: i32,
    pub left: i32,
    pub width: u32,
    pub height: u32,
    pub incognito: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub state: &'static str,
    pub always_on_top: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<ChromeTab>>,
}

impl ChromeWindow {
    pub fn new(window: &WindowSnapshot, tabs: Option<Vec<ChromeTab>>) -> Self {
        Self {
            id: window.id,
            focused: window.focused,
            top: 0,
            left: 0,
            width: window.width,
            height: window.height,
            incognito: false,
            kind: "normal",
            state: "normal",
            always_on_top: false,
            tabs,
        }
    }
}

/// `chrome.tabs.remove` takes one id or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabIdList {
    One(TabId),
    Many(Vec<TabId>),
}

impl TabIdList {
    pub fn into_vec(self) -> Vec<TabId> {
        match self {
            TabIdList::One(id) => vec![id],
            TabIdList::Many(ids) => ids,
        }
    }
}
