use serde::{Deserialize, Serialize};

use super::tab::{TabId, WindowId};

/// Options used to build a new `WindowHost`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOptions {
    /// Tabs opened once the window is ready. Empty means one new-tab page.
    #[serde(default)]
    pub initial_urls: Vec<String>,
    /// URLs whose tabs render with the compact toolbar.
    #[serde(default)]
    pub hide_address_bar_for: Vec<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl WindowOptions {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            initial_urls: vec![url.into()],
            ..Default::default()
        }
    }
}

/// Window-level notifications produced while a `WindowHost` drains its
/// tab events. The shell forwards them to the extension bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowNotice {
    TabTracked { tab: TabId, window: WindowId },
    TabActivated { tab: TabId, window: WindowId },
    TabRemoved { tab: TabId, window: WindowId },
    Closed { window: WindowId },
}

/// Read-only view of a window, used by the extension bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub id: WindowId,
    pub focused: bool,
    pub width: u32,
    pub height: u32,
    pub tab_ids: Vec<TabId>,
    pub active_tab: Option<TabId>,
}
