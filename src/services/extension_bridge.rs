//! Extension API bridge.
//!
//! Translates `chrome.cookies`, `chrome.tabs` and `chrome.windows` requests
//! into calls on the session cookie store and on the embedding host, and
//! translates the shell's window notices into extension events.
//!
//! The bridge keeps its own record of which tabs extensions may see (the
//! tab store). Tabs enter it through [`ExtensionBridge::add_tab`] and leave
//! through [`ExtensionBridge::remove_tab`]; liveness is always re-checked
//! with the host, so a tab whose surface is gone is never reported.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::services::cookie_store::{normalize, CookieStore};
use crate::types::cookie::{
    CookieDetails, CookieFilter, CookieRecord, CookieStoreDescriptor, SetCookieDetails,
    DEFAULT_STORE_ID,
};
use crate::types::errors::ExtensionError;
use crate::types::extension::{
    ChromeTab, ChromeWindow, CreateTabDetails, CreateWindowDetails, ExtensionEvent, SessionId,
    TabQuery, UpdateTabDetails,
};
use crate::types::tab::{TabId, TabSnapshot, WindowId};
use crate::types::window::{WindowNotice, WindowSnapshot};

/// Sessions that already have a bridge attached. Owned by the shell.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashSet<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `session`. A session can only be claimed once.
    pub fn register(&mut self, session: &str) -> Result<(), ExtensionError> {
        if !self.sessions.insert(session.to_string()) {
            return Err(ExtensionError::AlreadyRegistered(session.to_string()));
        }
        Ok(())
    }

    pub fn unregister(&mut self, session: &str) -> bool {
        self.sessions.remove(session)
    }

    pub fn contains(&self, session: &str) -> bool {
        self.sessions.contains(session)
    }
}

/// Callbacks into the embedding application.
///
/// `create_tab` must fail when `details.window_id` names a window that
/// does not exist.
pub trait ExtensionHost {
    fn create_tab(&mut self, details: &CreateTabDetails) -> Result<(TabId, WindowId), ExtensionError>;
    fn select_tab(&mut self, tab: TabId, window: WindowId) -> Result<(), ExtensionError>;
    fn deselect_tab(&mut self, window: WindowId) -> Result<(), ExtensionError>;
    fn remove_tab(&mut self, tab: TabId, window: WindowId) -> Result<(), ExtensionError>;
    fn create_window(&mut self, details: &CreateWindowDetails) -> Result<WindowId, ExtensionError>;
    fn remove_window(&mut self, window: WindowId) -> Result<(), ExtensionError>;
    fn load_url(&mut self, tab: TabId, window: WindowId, url: &str) -> Result<(), ExtensionError>;
    fn reload_tab(&mut self, tab: TabId, window: WindowId) -> Result<(), ExtensionError>;

    /// `None` once the tab's surface has been destroyed.
    fn tab_info(&self, tab: TabId) -> Option<TabSnapshot>;
    fn window_info(&self, window: WindowId) -> Option<WindowSnapshot>;
    /// Live windows in creation order.
    fn window_ids(&self) -> Vec<WindowId>;
    fn focused_window(&self) -> Option<WindowId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackedTab {
    tab: TabId,
    window: WindowId,
}

pub struct ExtensionBridge {
    session: SessionId,
    cookies: Rc<dyn CookieStore>,
    tabs: Vec<TrackedTab>,
    active: HashMap<WindowId, TabId>,
    windows: Vec<WindowId>,
    extension_hosts: Vec<TabId>,
    events: Vec<ExtensionEvent>,
}

impl ExtensionBridge {
    /// Attaches a bridge to `session`. Fails if one is already attached.
    pub fn new(
        registry: &mut SessionRegistry,
        session: &str,
        cookies: Rc<dyn CookieStore>,
    ) -> Result<Self, ExtensionError> {
        registry.register(session)?;
        tracing::info!(session, "extension bridge attached");
        Ok(Self {
            session: session.to_string(),
            cookies,
            tabs: Vec::new(),
            active: HashMap::new(),
            windows: Vec::new(),
            extension_hosts: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    // --- Tab store ---

    /// Starts tracking `tab` as belonging to `window`. Repeated calls are no-ops.
    pub fn add_tab(&mut self, tab: TabId, window: WindowId) {
        if self.is_tracked(tab) {
            return;
        }
        self.tabs.push(TrackedTab { tab, window });
        self.events.push(ExtensionEvent::TabCreated {
            tab_id: tab,
            window_id: window,
        });
    }

    pub fn remove_tab(&mut self, tab: TabId) {
        let Some(pos) = self.tabs.iter().position(|t| t.tab == tab) else {
            return;
        };
        let tracked = self.tabs.remove(pos);
        if self.active.get(&tracked.window) == Some(&tab) {
            self.active.remove(&tracked.window);
        }
        self.events.push(ExtensionEvent::TabRemoved {
            tab_id: tab,
            window_id: tracked.window,
        });
    }

    /// Records `tab` as the active tab of its window. Untracked tabs are ignored.
    pub fn select_tab(&mut self, tab: TabId) {
        let Some(tracked) = self.tabs.iter().find(|t| t.tab == tab).copied() else {
            return;
        };
        self.active.insert(tracked.window, tab);
        self.events.push(ExtensionEvent::TabActivated {
            tab_id: tab,
            window_id: tracked.window,
        });
    }

    pub fn is_tracked(&self, tab: TabId) -> bool {
        self.tabs.iter().any(|t| t.tab == tab)
    }

    pub fn tracked_tabs(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.tab).collect()
    }

    pub fn active_tab(&self, window: WindowId) -> Option<TabId> {
        self.active.get(&window).copied()
    }

    pub fn window_created(&mut self, window: WindowId) {
        if self.windows.contains(&window) {
            return;
        }
        self.windows.push(window);
        self.events.push(ExtensionEvent::WindowCreated { window_id: window });
    }

    /// Forgets a closed window and every tab still tracked in it.
    pub fn window_removed(&mut self, window: WindowId) {
        let orphaned: Vec<TabId> = self
            .tabs
            .iter()
            .filter(|t| t.window == window)
            .map(|t| t.tab)
            .collect();
        for tab in orphaned {
            self.remove_tab(tab);
        }
        self.active.remove(&window);
        if let Some(pos) = self.windows.iter().position(|w| *w == window) {
            self.windows.remove(pos);
            self.events.push(ExtensionEvent::WindowRemoved { window_id: window });
        }
    }

    /// Applies a notice drained from a `WindowHost`.
    pub fn apply_notice(&mut self, notice: WindowNotice) {
        match notice {
            WindowNotice::TabTracked { tab, window } => self.add_tab(tab, window),
            WindowNotice::TabActivated { tab, .. } => self.select_tab(tab),
            WindowNotice::TabRemoved { tab, .. } => self.remove_tab(tab),
            WindowNotice::Closed { window } => self.window_removed(window),
        }
    }

    /// Records a background page or popup as an extension host.
    pub fn add_extension_host(&mut self, surface: TabId) {
        if !self.extension_hosts.contains(&surface) {
            self.extension_hosts.push(surface);
        }
    }

    pub fn remove_extension_host(&mut self, surface: TabId) {
        self.extension_hosts.retain(|s| *s != surface);
    }

    pub fn extension_hosts(&self) -> &[TabId] {
        &self.extension_hosts
    }

    /// Drains queued extension events in emission order.
    pub fn take_events(&mut self) -> Vec<ExtensionEvent> {
        std::mem::take(&mut self.events)
    }

    // --- chrome.cookies ---

    /// First matching cookie in store order. Store failures read as "no cookie".
    pub async fn cookies_get(&self, details: &CookieDetails) -> Option<CookieRecord> {
        let filter = CookieFilter {
            url: Some(details.url.clone()),
            name: Some(details.name.clone()),
            ..Default::default()
        };
        match self.cookies.get(&filter).await {
            Ok(cookies) => cookies.into_iter().next().map(CookieRecord::from),
            Err(e) => {
                tracing::warn!(url = %details.url, name = %details.name, error = %e, "cookies.get failed");
                None
            }
        }
    }

    pub async fn cookies_get_all(&self, filter: &CookieFilter) -> Vec<CookieRecord> {
        match self.cookies.get(filter).await {
            Ok(cookies) => cookies.into_iter().map(CookieRecord::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "cookies.getAll failed");
                Vec::new()
            }
        }
    }

    /// Writes, then reads back the stored form. The read-back goes through
    /// the normalized key, so a defaulted domain or path still finds the row.
    pub async fn cookies_set(
        &self,
        details: &SetCookieDetails,
    ) -> Result<Option<CookieRecord>, ExtensionError> {
        let key = normalize(details)?;
        self.cookies.set(details).await?;
        let stored = self.cookies.get(&key.key_filter()).await?;
        Ok(stored
            .into_iter()
            .find(|c| c.domain == key.domain)
            .map(CookieRecord::from))
    }

    /// Best-effort removal: `None` on any failure, the details on success.
    pub async fn cookies_remove(&self, details: &CookieDetails) -> Option<CookieDetails> {
        match self.cookies.remove(&details.url, &details.name).await {
            Ok(()) => Some(details.clone()),
            Err(e) => {
                tracing::debug!(url = %details.url, error = %e, "cookies.remove swallowed error");
                None
            }
        }
    }

    pub fn cookies_get_all_stores(&self, host: &dyn ExtensionHost) -> Vec<CookieStoreDescriptor> {
        let tab_ids = self
            .tabs
            .iter()
            .filter(|t| host.tab_info(t.tab).is_some())
            .map(|t| t.tab)
            .collect();
        vec![CookieStoreDescriptor {
            id: DEFAULT_STORE_ID.to_string(),
            tab_ids,
        }]
    }

    // --- chrome.tabs ---

    fn live_tab(&self, host: &dyn ExtensionHost, tab: TabId) -> Result<TabSnapshot, ExtensionError> {
        host.tab_info(tab)
            .ok_or_else(|| ExtensionError::NotFound(format!("tab {}", tab)))
    }

    pub fn tabs_get(&self, host: &dyn ExtensionHost, tab: TabId) -> Result<ChromeTab, ExtensionError> {
        Ok(self.live_tab(host, tab)?.into())
    }

    pub fn tabs_query(&self, host: &dyn ExtensionHost, query: &TabQuery) -> Vec<ChromeTab> {
        let focused = host.focused_window();
        let mut out = Vec::new();
        for window in host.window_ids() {
            if query.window_id.is_some_and(|w| w != window) {
                continue;
            }
            if query.current_window.is_some_and(|c| c != (Some(window) == focused)) {
                continue;
            }
            let Some(info) = host.window_info(window) else {
                continue;
            };
            for tab in info.tab_ids {
                let Some(snapshot) = host.tab_info(tab) else {
                    continue;
                };
                if query.active.is_some_and(|a| a != snapshot.active) {
                    continue;
                }
                if let Some(pattern) = &query.url {
                    let url = snapshot.url.as_deref().unwrap_or_default();
                    if !url_pattern_matches(pattern, url) {
                        continue;
                    }
                }
                out.push(snapshot.into());
            }
        }
        out
    }

    pub fn tabs_create(
        &mut self,
        host: &mut dyn ExtensionHost,
        details: &CreateTabDetails,
    ) -> Result<ChromeTab, ExtensionError> {
        let (tab, window) = host.create_tab(details)?;
        self.add_tab(tab, window);
        self.tabs_get(host, tab)
    }

    pub fn tabs_update(
        &mut self,
        host: &mut dyn ExtensionHost,
        tab: TabId,
        details: &UpdateTabDetails,
    ) -> Result<ChromeTab, ExtensionError> {
        let window = self.live_tab(host, tab)?.window_id;
        if let Some(url) = &details.url {
            host.load_url(tab, window, url)?;
        }
        if details.active == Some(true) {
            host.select_tab(tab, window)?;
        }
        self.tabs_get(host, tab)
    }

    pub fn tabs_remove(
        &mut self,
        host: &mut dyn ExtensionHost,
        tabs: &[TabId],
    ) -> Result<(), ExtensionError> {
        for &tab in tabs {
            let window = self.live_tab(host, tab)?.window_id;
            host.remove_tab(tab, window)?;
        }
        Ok(())
    }

    pub fn tabs_reload(&mut self, host: &mut dyn ExtensionHost, tab: TabId) -> Result<(), ExtensionError> {
        let window = self.live_tab(host, tab)?.window_id;
        host.reload_tab(tab, window)
    }

    // --- chrome.windows ---

    fn window_record(&self, host: &dyn ExtensionHost, info: &WindowSnapshot) -> ChromeWindow {
        let tabs = info
            .tab_ids
            .iter()
            .filter_map(|t| host.tab_info(*t))
            .map(ChromeTab::from)
            .collect();
        ChromeWindow::new(info, Some(tabs))
    }

    pub fn windows_get(&self, host: &dyn ExtensionHost, window: WindowId) -> Result<ChromeWindow, ExtensionError> {
        let info = host
            .window_info(window)
            .ok_or_else(|| ExtensionError::NotFound(format!("window {}", window)))?;
        Ok(self.window_record(host, &info))
    }

    pub fn windows_get_all(&self, host: &dyn ExtensionHost) -> Vec<ChromeWindow> {
        host.window_ids()
            .into_iter()
            .filter_map(|w| host.window_info(w))
            .map(|info| self.window_record(host, &info))
            .collect()
    }

    pub fn windows_get_last_focused(&self, host: &dyn ExtensionHost) -> Result<ChromeWindow, ExtensionError> {
        let window = host
            .focused_window()
            .ok_or_else(|| ExtensionError::NotFound("no window is open".to_string()))?;
        self.windows_get(host, window)
    }

    pub fn windows_create(
        &mut self,
        host: &mut dyn ExtensionHost,
        details: &CreateWindowDetails,
    ) -> Result<ChromeWindow, ExtensionError> {
        let window = host.create_window(details)?;
        self.window_created(window);
        self.windows_get(host, window)
    }

    pub fn windows_remove(&mut self, host: &mut dyn ExtensionHost, window: WindowId) -> Result<(), ExtensionError> {
        if host.window_info(window).is_none() {
            return Err(ExtensionError::NotFound(format!("window {}", window)));
        }
        host.remove_window(window)
    }
}

/// Chrome match pattern subset: `<all_urls>` or a literal with `*` wildcards.
pub fn url_pattern_matches(pattern: &str, url: &str) -> bool {
    if pattern == "<all_urls>" {
        return true;
    }
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return false;
    };
    let Some(mut rest) = url.strip_prefix(first) else {
        return false;
    };
    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
