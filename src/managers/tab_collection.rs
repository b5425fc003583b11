//! Ordered, single-selection set of tabs belonging to one window.
//!
//! The collection owns its tabs and shares the native window handle with
//! its `WindowHost`. State changes are queued as [`TabEvent`]s and drained
//! by the owner with [`TabCollection::take_events`].

use url::Url;

use crate::managers::tab::Tab;
use crate::surface::{SurfaceBackend, WindowHandle};
use crate::types::errors::TabError;
use crate::types::surface::InspectorMode;
use crate::types::tab::{CollectionState, CreateTabOptions, TabEvent, TabId, Visibility};

pub const DEFAULT_NEW_TAB_URL: &str = "about:blank";

/// Construction options for a [`TabCollection`].
#[derive(Debug, Clone)]
pub struct TabCollectionOptions {
    pub new_tab_url: String,
    /// Tabs opened on one of these URLs use the compact toolbar.
    pub hide_address_bar_for: Vec<String>,
    pub hidden: bool,
}

impl Default for TabCollectionOptions {
    fn default() -> Self {
        Self {
            new_tab_url: DEFAULT_NEW_TAB_URL.to_string(),
            hide_address_bar_for: Vec::new(),
            hidden: false,
        }
    }
}

pub struct TabCollection {
    window: Option<WindowHandle>,
    tabs: Vec<Tab>,
    selected: Option<TabId>,
    hidden: bool,
    new_tab_url: String,
    hide_address_bar_for: Vec<String>,
    state: CollectionState,
    events: Vec<TabEvent>,
}

impl TabCollection {
    pub fn new(window: WindowHandle, options: TabCollectionOptions) -> Self {
        Self {
            window: Some(window),
            tabs: Vec::new(),
            selected: None,
            hidden: options.hidden,
            new_tab_url: options.new_tab_url,
            hide_address_bar_for: options.hide_address_bar_for,
            state: CollectionState::Empty,
            events: Vec::new(),
        }
    }

    fn live_window(&self) -> Result<WindowHandle, TabError> {
        match (&self.window, self.state) {
            (_, CollectionState::Destroyed) | (None, _) => Err(TabError::InvalidState(
                "tab collection is destroyed".to_string(),
            )),
            (Some(window), _) => Ok(window.clone()),
        }
    }

    /// Opens a new tab at the end of the strip and selects it.
    pub fn create(
        &mut self,
        backend: &mut dyn SurfaceBackend,
        options: CreateTabOptions,
    ) -> Result<TabId, TabError> {
        let window = self.live_window()?;
        let url = options
            .initial_url
            .unwrap_or_else(|| self.new_tab_url.clone());
        let compact = self.hide_address_bar_for.iter().any(|u| *u == url);

        let mut tab = Tab::create(&*window, backend.create_surface(), compact);
        let id = tab.id();
        // Completion is reported through the surface event sink.
        let _pending = tab.load_url(&url)?;

        self.tabs.push(tab);
        if self.selected.is_none() {
            self.selected = Some(id);
        }
        self.state = CollectionState::Active;
        tracing::info!(tab = id, window = window.id(), %url, "tab created");

        self.events.push(TabEvent::TabCreated {
            tab: id,
            url: url.clone(),
        });
        self.select(id)?;
        Ok(id)
    }

    /// Called when the surface backing `id` finished a navigation. Emits
    /// `TabNavigated` with the URL originally requested for the tab.
    pub fn handle_navigation(&mut self, id: TabId) -> bool {
        if self.is_destroyed() {
            return false;
        }
        let Some(tab) = self.get(id) else {
            return false;
        };
        let url = tab.requested_url().unwrap_or_default().to_string();
        self.events.push(TabEvent::TabNavigated { tab: id, url });
        true
    }

    /// Removes and destroys a tab. Selection moves to the tab that slides
    /// into the vacated slot, or the one before it. Removing the last tab
    /// destroys the whole collection and its window.
    pub fn remove(&mut self, id: TabId) -> Result<(), TabError> {
        self.live_window()?;
        let index = self.index_of(id).ok_or(TabError::NotFound(id))?;

        let mut tab = self.tabs.remove(index);
        tab.destroy(self.window.as_deref());
        tracing::info!(tab = id, "tab removed");

        let was_selected = self.selected == Some(id);
        if was_selected {
            self.selected = None;
        }
        self.events.push(TabEvent::TabDestroyed { tab: id });

        if was_selected {
            let next = self
                .tabs
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|i| self.tabs.get(i)))
                .map(|t| t.id());
            if let Some(next) = next {
                self.select(next)?;
            }
        }

        if self.tabs.is_empty() {
            self.destroy();
        }
        Ok(())
    }

    /// Makes `id` the selected tab. Unknown ids are ignored.
    pub fn select(&mut self, id: TabId) -> Result<(), TabError> {
        let window = self.live_window()?;
        let Some(index) = self.index_of(id) else {
            return Ok(());
        };

        let previous_state = self.state;
        self.state = CollectionState::Selecting;

        if let Some(previous) = self.selected.filter(|prev| *prev != id) {
            if let Some(prev_tab) = self.tabs.iter_mut().find(|t| t.id() == previous) {
                prev_tab.hide();
            }
        }

        if !self.hidden {
            if let Err(e) = self.tabs[index].show(&*window) {
                self.state = previous_state;
                return Err(e);
            }
        }

        self.selected = Some(id);
        self.state = CollectionState::Active;
        debug_assert!(self.shown_count() <= 1, "more than one tab shown");
        tracing::debug!(tab = id, "tab selected");
        self.events.push(TabEvent::TabSelected { tab: id });
        Ok(())
    }

    /// Hides the selected tab and clears the selection.
    pub fn deselect(&mut self) -> Result<(), TabError> {
        self.live_window()?;
        if let Some(id) = self.selected.take() {
            if let Some(tab) = self.get_mut(id) {
                tab.hide();
            }
            self.events.push(TabEvent::TabDeselected { tab: id });
        }
        Ok(())
    }

    /// Removes every tab showing a page of the extension `owner_id`.
    /// Returns the ids that were removed.
    pub fn remove_extension_tabs(&mut self, owner_id: &str) -> Result<Vec<TabId>, TabError> {
        self.live_window()?;
        let doomed = self.extension_tab_ids(owner_id);
        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if self.is_destroyed() {
                break;
            }
            self.remove(id)?;
            removed.push(id);
        }
        Ok(removed)
    }

    /// Tabs currently showing a page of the extension `owner_id`.
    pub fn extension_tab_ids(&self, owner_id: &str) -> Vec<TabId> {
        self.tabs
            .iter()
            .filter(|t| {
                t.url()
                    .map(|u| is_extension_page(&u, owner_id))
                    .unwrap_or(false)
            })
            .map(|t| t.id())
            .collect()
    }

    /// Hides the whole strip. The selection is dropped, not remembered;
    /// a later `show` needs an explicit `select` to bring a tab back.
    pub fn hide(&mut self) -> Result<(), TabError> {
        self.live_window()?;
        self.hidden = true;
        self.deselect()?;
        self.events.push(TabEvent::TabsHidden(true));
        Ok(())
    }

    pub fn show(&mut self) -> Result<(), TabError> {
        let window = self.live_window()?;
        self.hidden = false;
        if let Some(id) = self.selected {
            if let Some(tab) = self.get_mut(id) {
                tab.show(&*window)?;
            }
        }
        self.events.push(TabEvent::TabsHidden(false));
        Ok(())
    }

    /// Destroys every tab, then the window. Idempotent.
    pub fn destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        let window = self.window.take();
        for tab in self.tabs.iter_mut() {
            tab.destroy(window.as_deref());
        }
        self.tabs.clear();
        self.selected = None;
        if let Some(window) = window {
            if !window.is_destroyed() {
                window.destroy();
            }
        }
        self.state = CollectionState::Destroyed;
        self.events.push(TabEvent::CollectionDestroyed);
        tracing::debug!("tab collection destroyed");
    }

    pub fn load_url(&mut self, id: TabId, url: &str) -> Result<(), TabError> {
        self.live_window()?;
        let tab = self.get_mut(id).ok_or(TabError::NotFound(id))?;
        let _pending = tab.load_url(url)?;
        Ok(())
    }

    pub fn reload(&mut self, id: TabId) -> Result<(), TabError> {
        self.get_mut(id).ok_or(TabError::NotFound(id))?.reload()
    }

    pub fn open_inspector(&mut self, id: TabId, mode: InspectorMode) -> Result<(), TabError> {
        self.get_mut(id)
            .ok_or(TabError::NotFound(id))?
            .open_inspector(mode)
    }

    pub fn toggle_inspector(&mut self, id: TabId, mode: InspectorMode) -> Result<bool, TabError> {
        self.get_mut(id)
            .ok_or(TabError::NotFound(id))?
            .toggle_inspector(mode)
    }

    /// Drains the queued events in emission order.
    pub fn take_events(&mut self) -> Vec<TabEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id() == id)
    }

    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id() == id)
    }

    pub fn ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id()).collect()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn selected(&self) -> Option<TabId> {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == CollectionState::Destroyed
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    pub fn new_tab_url(&self) -> &str {
        &self.new_tab_url
    }

    /// Number of tabs currently laid out on-screen. Never more than one.
    pub fn shown_count(&self) -> usize {
        self.tabs
            .iter()
            .filter(|t| t.visibility() == Visibility::Shown)
            .count()
    }
}

/// True when `url` is a page served by the extension `owner_id`.
fn is_extension_page(url: &str, owner_id: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.scheme() == "chrome-extension" && parsed.host_str() == Some(owner_id),
        Err(_) => false,
    }
}
