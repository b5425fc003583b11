//! A native window, its chrome UI surface and its tab collection.

use serde_json::json;

use crate::managers::tab_collection::{TabCollection, TabCollectionOptions};
use crate::surface::{SurfaceBackend, ViewSurface, WindowHandle};
use crate::types::errors::WindowError;
use crate::types::event::{EventSender, ShellEvent};
use crate::types::settings::ProxyConfig;
use crate::types::surface::{Bounds, InspectorMode};
use crate::types::tab::{CreateTabOptions, TabEvent, TabId, TabSnapshot, WindowId};
use crate::types::window::{WindowNotice, WindowOptions, WindowSnapshot};

/// Channel name the chrome UI listens on.
pub const WEBUI_CHANNEL: &str = "webui-message";

/// URLs of the pages bundled in the chrome UI extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromePages {
    base: String,
}

impl ChromePages {
    pub fn new(webui_extension_id: &str) -> Self {
        Self {
            base: format!("chrome-extension://{}", webui_extension_id),
        }
    }

    pub fn webui_url(&self) -> String {
        format!("{}/webui.html", self.base)
    }

    pub fn new_tab_url(&self) -> String {
        format!("{}/new-tab.html", self.base)
    }

    pub fn settings_url(&self) -> String {
        format!("{}/settings.html", self.base)
    }
}

/// Shell-wide knobs consulted while a window reacts to its tab events.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    /// Start page of the game extension, once it has been loaded.
    pub start_page_url: Option<String>,
    pub open_inspector_on_start_page: bool,
}

pub struct WindowHost {
    id: WindowId,
    window: WindowHandle,
    chrome_ui: Option<Box<dyn ViewSurface>>,
    tabs: TabCollection,
    initial_urls: Vec<String>,
    ready: bool,
    destroyed: bool,
}

impl WindowHost {
    /// Builds the window and loads the chrome UI. Initial tabs are not
    /// created here: a `ShellEvent::WindowReady` is posted instead so they
    /// appear on the next turn of the event loop, once the caller has
    /// registered the window.
    pub fn new(
        backend: &mut dyn SurfaceBackend,
        options: WindowOptions,
        pages: &ChromePages,
        events: &EventSender,
        debug: bool,
    ) -> Self {
        let window = backend.create_window(&options);
        let id = window.id();
        let (width, height) = window.size();

        let mut chrome_ui = backend.create_surface();
        window.attach_surface(chrome_ui.id());
        chrome_ui.set_bounds(Bounds::new(0, 0, width, height));
        chrome_ui.set_auto_resize(true);
        let _pending = chrome_ui.load_url(&pages.webui_url());
        if debug {
            chrome_ui.open_inspector(InspectorMode::Detach);
        }

        let tabs = TabCollection::new(
            window.clone(),
            TabCollectionOptions {
                new_tab_url: pages.new_tab_url(),
                hide_address_bar_for: options.hide_address_bar_for.clone(),
                hidden: false,
            },
        );

        if events.send(ShellEvent::WindowReady(id)).is_err() {
            tracing::warn!(window = id, "event loop gone, initial tabs will not open");
        }
        tracing::info!(window = id, width, height, "window created");

        Self {
            id,
            window,
            chrome_ui: Some(chrome_ui),
            tabs,
            initial_urls: options.initial_urls,
            ready: false,
            destroyed: false,
        }
    }

    /// Deferred half of construction: applies the proxy, then opens the
    /// initial tabs and selects the first one. Runs at most once.
    pub fn on_ready(
        &mut self,
        backend: &mut dyn SurfaceBackend,
        proxy: &ProxyConfig,
    ) -> Result<(), WindowError> {
        if self.ready || self.destroyed {
            return Ok(());
        }
        self.ready = true;

        if proxy.enable {
            tracing::info!(rules = %proxy.rules(), "applying proxy");
            backend.set_proxy(Some(proxy));
        } else {
            backend.set_proxy(None);
        }

        let urls = std::mem::take(&mut self.initial_urls);
        if urls.is_empty() {
            self.tabs.create(backend, CreateTabOptions::default())?;
            return Ok(());
        }

        let mut first = None;
        for url in urls {
            let tab = self.tabs.create(backend, CreateTabOptions::with_url(url))?;
            first.get_or_insert(tab);
        }
        if let Some(first) = first {
            self.tabs.select(first)?;
        }
        Ok(())
    }

    /// Drains the collection's events and reacts to them. Returns what the
    /// shell needs to forward to the extension bridge.
    pub fn process_events(&mut self, ctx: &HostContext) -> Vec<WindowNotice> {
        let mut notices = Vec::new();
        loop {
            let events = self.tabs.take_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.handle_tab_event(event, ctx, &mut notices);
            }
        }
        notices
    }

    fn handle_tab_event(&mut self, event: TabEvent, ctx: &HostContext, notices: &mut Vec<WindowNotice>) {
        let window = self.id;
        match event {
            TabEvent::TabCreated { tab, .. } => {
                // Tabs created from the UI side must be visible to extensions too.
                notices.push(WindowNotice::TabTracked { tab, window });
            }
            TabEvent::TabNavigated { tab, url } => {
                let is_start_page = ctx.start_page_url.as_deref() == Some(url.as_str());
                if is_start_page && ctx.open_inspector_on_start_page {
                    if let Err(e) = self.tabs.open_inspector(tab, InspectorMode::Bottom) {
                        tracing::warn!(tab, error = %e, "could not open inspector");
                    }
                }
            }
            TabEvent::TabSelected { tab } => {
                notices.push(WindowNotice::TabActivated { tab, window });
            }
            TabEvent::TabsHidden(hidden) => {
                self.send_to_chrome("tabs-hidden", json!(hidden));
            }
            TabEvent::TabDestroyed { tab } => {
                notices.push(WindowNotice::TabRemoved { tab, window });
            }
            TabEvent::TabDeselected { .. } => {}
            TabEvent::CollectionDestroyed => {
                self.destroy();
                notices.push(WindowNotice::Closed { window });
            }
        }
    }

    /// Posts `{message, value}` to the chrome UI page.
    pub fn send_to_chrome(&mut self, message: &str, value: serde_json::Value) {
        if let Some(ui) = self.chrome_ui.as_mut() {
            ui.send(WEBUI_CHANNEL, json!({ "message": message, "value": value }));
        }
    }

    /// Tears down the tabs first, then the window. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.tabs.destroy();
        if let Some(mut ui) = self.chrome_ui.take() {
            self.window.detach_surface(ui.id());
            ui.release();
        }
        if !self.window.is_destroyed() {
            self.window.destroy();
        }
        tracing::info!(window = self.id, "window destroyed");
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn window(&self) -> &WindowHandle {
        &self.window
    }

    pub fn chrome_surface_id(&self) -> Option<TabId> {
        self.chrome_ui.as_ref().map(|ui| ui.id())
    }

    pub fn tabs(&self) -> &TabCollection {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut TabCollection {
        &mut self.tabs
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_focused(&self) -> bool {
        !self.destroyed && self.window.is_focused()
    }

    pub fn size(&self) -> (u32, u32) {
        self.window.size()
    }

    pub fn focused_tab(&self) -> Option<TabId> {
        self.tabs.selected()
    }

    pub fn tab_snapshot(&self, id: TabId) -> Option<TabSnapshot> {
        let index = self.tabs.index_of(id)?;
        let tab = self.tabs.get(id)?;
        if tab.is_destroyed() {
            return None;
        }
        let bounds = tab.bounds();
        Some(TabSnapshot {
            id,
            window_id: self.id,
            index,
            active: self.tabs.selected() == Some(id),
            url: tab.url().or_else(|| tab.requested_url().map(str::to_string)),
            width: bounds.width,
            height: bounds.height,
        })
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        let (width, height) = self.size();
        WindowSnapshot {
            id: self.id,
            focused: self.is_focused(),
            width,
            height,
            tab_ids: self.tabs.ids(),
            active_tab: self.tabs.selected(),
        }
    }
}
