use serde::{Deserialize, Serialize};

/// Identifier of a tab. Assigned by the content surface that backs it and
/// unique within the process.
pub type TabId = u32;

/// Identifier of a native window.
pub type WindowId = u32;

/// Options accepted by `TabCollection::create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTabOptions {
    /// URL to load. Falls back to the collection's new-tab page.
    pub initial_url: Option<String>,
}

impl CreateTabOptions {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            initial_url: Some(url.into()),
        }
    }
}

/// Whether a tab's surface is currently laid out inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Hidden,
    Shown,
}

/// Lifecycle state of a `TabCollection` as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Empty,
    Active,
    /// Transient: a selection change is in progress.
    Selecting,
    Destroyed,
}

/// Events emitted by a `TabCollection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    TabCreated { tab: TabId, url: String },
    /// Carries the URL originally requested at creation, not the final
    /// post-redirect URL.
    TabNavigated { tab: TabId, url: String },
    TabSelected { tab: TabId },
    TabDeselected { tab: TabId },
    TabDestroyed { tab: TabId },
    TabsHidden(bool),
    CollectionDestroyed,
}

/// Read-only view of a tab, used by the extension bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub id: TabId,
    pub window_id: WindowId,
    pub index: usize,
    pub active: bool,
    pub url: Option<String>,
    pub width: u32,
    pub height: u32,
}
