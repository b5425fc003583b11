//! Shell core for Damecon.
//!
//! [`Shell`] owns every window, the extension bridge, the configuration and
//! the update worker, and routes [`ShellEvent`]s between them on a single
//! thread.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::database::Database;
use crate::managers::window_host::{ChromePages, HostContext, WindowHost};
use crate::services::cookie_store::{CookieStore, SqliteCookieStore};
use crate::services::extension_bridge::{ExtensionBridge, ExtensionHost, SessionRegistry};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::update_worker::{parse_request, UpdateWorker, Updater, UPDATE_PROCESS_NAME};
use crate::surface::SurfaceBackend;
use crate::types::errors::{ExtensionError, TabError, UpdateError, WindowError};
use crate::types::event::{event_channel, EventReceiver, EventSender, ShellCommand, ShellEvent};
use crate::types::extension::{CreateTabDetails, CreateWindowDetails, ExtensionEvent};
use crate::types::settings::ProxyConfig;
use crate::types::surface::{InspectorMode, SurfaceEvent};
use crate::types::tab::{CreateTabOptions, TabId, TabSnapshot, WindowId};
use crate::types::update::WorkerMessage;
use crate::types::window::{WindowOptions, WindowSnapshot};

const EXTENSION_EVENT_CAPACITY: usize = 64;

/// Construction options for a [`Shell`].
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Network session the extension bridge attaches to.
    pub session: String,
    /// Id of the extension serving the chrome UI pages.
    pub webui_extension_id: String,
    /// Where extension sources (and the game extension) live.
    pub extensions_path: PathBuf,
    /// Overrides the settings file location.
    pub config_path: Option<String>,
    /// Cookie jar file. `None` keeps cookies in memory.
    pub cookie_db: Option<PathBuf>,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            session: "persist:default".to_string(),
            webui_extension_id: "webui".to_string(),
            extensions_path: PathBuf::from("extensions"),
            config_path: None,
            cookie_db: None,
        }
    }
}

/// What to do with a page's request to open a new window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOpenAction {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Popup {
    surface: TabId,
    parent: WindowId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GameExtension {
    id: String,
    start_page_url: String,
    strategy_room_url: String,
}

impl GameExtension {
    fn new(id: &str) -> Self {
        let base = format!("chrome-extension://{}", id);
        Self {
            id: id.to_string(),
            start_page_url: format!("{}/pages/game/direct.html", base),
            strategy_room_url: format!("{}/pages/strategy/strategy.html", base),
        }
    }

    /// Opens the start page and the strategy room in `host`. Returns the
    /// start page tab.
    fn open_tabs(&self, host: &mut WindowHost, backend: &mut dyn SurfaceBackend) -> Result<TabId, TabError> {
        let start = host
            .tabs_mut()
            .create(backend, CreateTabOptions::with_url(self.start_page_url.clone()))?;
        host.tabs_mut()
            .create(backend, CreateTabOptions::with_url(self.strategy_room_url.clone()))?;
        Ok(start)
    }
}

/// The live windows plus the backend that builds them. Implements the
/// host side of the extension bridge.
pub struct WindowRegistry {
    backend: Box<dyn SurfaceBackend>,
    windows: Vec<WindowHost>,
    pages: ChromePages,
    events: EventSender,
    proxy: ProxyConfig,
    debug: bool,
    default_size: (u32, u32),
}

impl WindowRegistry {
    fn create(&mut self, mut options: WindowOptions) -> WindowId {
        if options.width == 0 {
            options.width = self.default_size.0;
        }
        if options.height == 0 {
            options.height = self.default_size.1;
        }
        let host = WindowHost::new(
            self.backend.as_mut(),
            options,
            &self.pages,
            &self.events,
            self.debug,
        );
        let id = host.id();
        self.windows.push(host);
        id
    }

    /// Runs the deferred half of a window's construction.
    fn make_ready(&mut self, window: WindowId) -> Result<(), WindowError> {
        let host = self
            .windows
            .iter_mut()
            .find(|w| w.id() == window && !w.is_destroyed())
            .ok_or(WindowError::NotFound(window))?;
        host.on_ready(self.backend.as_mut(), &self.proxy)
    }

    pub fn get(&self, window: WindowId) -> Option<&WindowHost> {
        self.windows
            .iter()
            .find(|w| w.id() == window && !w.is_destroyed())
    }

    pub fn get_mut(&mut self, window: WindowId) -> Option<&mut WindowHost> {
        self.windows
            .iter_mut()
            .find(|w| w.id() == window && !w.is_destroyed())
    }

    fn live(&mut self, window: WindowId) -> Result<&mut WindowHost, WindowError> {
        self.get_mut(window).ok_or(WindowError::NotFound(window))
    }

    pub fn ids(&self) -> Vec<WindowId> {
        self.windows
            .iter()
            .filter(|w| !w.is_destroyed())
            .map(|w| w.id())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.iter().all(|w| w.is_destroyed())
    }

    /// The focused window, or the first one when none has focus.
    pub fn focused(&self) -> Option<WindowId> {
        let mut live = self.windows.iter().filter(|w| !w.is_destroyed());
        let first = live.clone().next().map(|w| w.id());
        live.find(|w| w.is_focused()).map(|w| w.id()).or(first)
    }

    /// Window whose tab strip contains `tab`.
    pub fn window_of_tab(&self, tab: TabId) -> Option<WindowId> {
        self.windows
            .iter()
            .filter(|w| !w.is_destroyed())
            .find(|w| w.tabs().get(tab).is_some())
            .map(|w| w.id())
    }

    /// Window whose chrome UI is `surface`.
    pub fn window_of_chrome(&self, surface: TabId) -> Option<WindowId> {
        self.windows
            .iter()
            .filter(|w| !w.is_destroyed())
            .find(|w| w.chrome_surface_id() == Some(surface))
            .map(|w| w.id())
    }
}

impl ExtensionHost for WindowRegistry {
    fn create_tab(&mut self, details: &CreateTabDetails) -> Result<(TabId, WindowId), ExtensionError> {
        let window = match details.window_id {
            Some(id) => id,
            None => self
                .focused()
                .ok_or_else(|| ExtensionError::NotFound("no window is open".to_string()))?,
        };
        let host = self
            .windows
            .iter_mut()
            .find(|w| w.id() == window && !w.is_destroyed())
            .ok_or_else(|| ExtensionError::NotFound(format!("Unable to find windowId={}", window)))?;

        let previous = host.tabs().selected();
        let options = CreateTabOptions {
            initial_url: details.url.clone(),
        };
        let tab = host
            .tabs_mut()
            .create(self.backend.as_mut(), options)
            .map_err(WindowError::from)?;
        if details.active == Some(false) {
            if let Some(previous) = previous {
                host.tabs_mut().select(previous).map_err(WindowError::from)?;
            }
        }
        Ok((tab, window))
    }

    fn select_tab(&mut self, tab: TabId, window: WindowId) -> Result<(), ExtensionError> {
        self.live(window)?.tabs_mut().select(tab).map_err(WindowError::from)?;
        Ok(())
    }

    fn deselect_tab(&mut self, window: WindowId) -> Result<(), ExtensionError> {
        self.live(window)?.tabs_mut().deselect().map_err(WindowError::from)?;
        Ok(())
    }

    fn remove_tab(&mut self, tab: TabId, window: WindowId) -> Result<(), ExtensionError> {
        self.live(window)?.tabs_mut().remove(tab).map_err(WindowError::from)?;
        Ok(())
    }

    fn create_window(&mut self, details: &CreateWindowDetails) -> Result<WindowId, ExtensionError> {
        let initial_urls = details.url.clone().map(|u| u.into_vec()).unwrap_or_default();
        Ok(self.create(WindowOptions {
            initial_urls,
            ..Default::default()
        }))
    }

    fn remove_window(&mut self, window: WindowId) -> Result<(), ExtensionError> {
        self.live(window)?.destroy();
        Ok(())
    }

    fn load_url(&mut self, tab: TabId, window: WindowId, url: &str) -> Result<(), ExtensionError> {
        self.live(window)?
            .tabs_mut()
            .load_url(tab, url)
            .map_err(WindowError::from)?;
        Ok(())
    }

    fn reload_tab(&mut self, tab: TabId, window: WindowId) -> Result<(), ExtensionError> {
        self.live(window)?.tabs_mut().reload(tab).map_err(WindowError::from)?;
        Ok(())
    }

    fn tab_info(&self, tab: TabId) -> Option<TabSnapshot> {
        let window = self.window_of_tab(tab)?;
        self.get(window)?.tab_snapshot(tab)
    }

    fn window_info(&self, window: WindowId) -> Option<WindowSnapshot> {
        self.get(window).map(|w| w.snapshot())
    }

    fn window_ids(&self) -> Vec<WindowId> {
        self.ids()
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.focused()
    }
}

/// Central shell struct holding every window and service.
pub struct Shell {
    windows: WindowRegistry,
    bridge: ExtensionBridge,
    sessions: SessionRegistry,
    settings: SettingsEngine,
    events_tx: EventSender,
    events_rx: EventReceiver,
    extension_events: broadcast::Sender<ExtensionEvent>,
    popup: Option<Popup>,
    game: Option<GameExtension>,
    worker: Option<UpdateWorker>,
    worker_replies: Option<UnboundedReceiver<WorkerMessage>>,
    is_updating: bool,
    extensions_path: PathBuf,
}

impl Shell {
    /// Loads settings, opens the cookie jar and attaches the extension
    /// bridge. No window exists until [`Shell::create_window`] is called.
    pub fn new(
        mut backend: Box<dyn SurfaceBackend>,
        options: ShellOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = SettingsEngine::new(options.config_path.clone());
        let loaded = settings.load()?;

        let db = match &options.cookie_db {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };
        let cookies: Rc<dyn CookieStore> = Rc::new(SqliteCookieStore::new(db));

        let mut sessions = SessionRegistry::new();
        let bridge = ExtensionBridge::new(&mut sessions, &options.session, cookies)?;

        let (events_tx, events_rx) = event_channel();
        backend.set_event_sink(events_tx.clone());
        let (extension_events, _) = broadcast::channel(EXTENSION_EVENT_CAPACITY);

        let windows = WindowRegistry {
            backend,
            windows: Vec::new(),
            pages: ChromePages::new(&options.webui_extension_id),
            events: events_tx.clone(),
            proxy: loaded.proxy.client.clone(),
            debug: loaded.devtools.debug_shell,
            default_size: (loaded.window.state.width, loaded.window.state.height),
        };

        tracing::info!(
            config = settings.get_config_path(),
            session = %options.session,
            "shell initialized"
        );

        Ok(Self {
            windows,
            bridge,
            sessions,
            settings,
            events_tx,
            events_rx,
            extension_events,
            popup: None,
            game: None,
            worker: None,
            worker_replies: None,
            is_updating: false,
            extensions_path: options.extensions_path,
        })
    }

    // --- Accessors ---

    pub fn windows(&self) -> &WindowRegistry {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut WindowRegistry {
        &mut self.windows
    }

    pub fn bridge(&self) -> &ExtensionBridge {
        &self.bridge
    }

    /// The bridge together with the host it calls back into.
    pub fn bridge_and_host(&mut self) -> (&mut ExtensionBridge, &mut WindowRegistry) {
        (&mut self.bridge, &mut self.windows)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn settings(&self) -> &SettingsEngine {
        &self.settings
    }

    pub fn event_sender(&self) -> EventSender {
        self.events_tx.clone()
    }

    /// Subscribes to the events forwarded to extension hosts.
    pub fn subscribe(&self) -> broadcast::Receiver<ExtensionEvent> {
        self.extension_events.subscribe()
    }

    pub fn is_updating(&self) -> bool {
        self.is_updating
    }

    pub fn game_start_page(&self) -> Option<&str> {
        self.game.as_ref().map(|g| g.start_page_url.as_str())
    }

    pub fn chrome_pages(&self) -> &ChromePages {
        &self.windows.pages
    }

    // --- Windows ---

    /// Opens a window sized from the persisted window state unless
    /// `options` says otherwise. Its initial tabs appear once the
    /// `WindowReady` event it posts has been dispatched.
    pub fn create_window(&mut self, options: WindowOptions) -> WindowId {
        let id = self.windows.create(options);
        self.bridge.window_created(id);
        self.forward_extension_events();
        id
    }

    /// Opens the first window of a session. Its only tab is the settings
    /// page, shown with the compact toolbar.
    pub fn open_startup_window(&mut self) -> WindowId {
        let settings_url = self.windows.pages.settings_url();
        self.create_window(WindowOptions {
            initial_urls: vec![settings_url.clone()],
            hide_address_bar_for: vec![settings_url],
            ..Default::default()
        })
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.windows.focused()
    }

    /// Window a surface belongs to: the popup's parent for the extension
    /// popup, the owning window for tabs and chrome UI, and the focused
    /// window for background pages.
    pub fn window_for_surface(&self, surface: TabId) -> Option<WindowId> {
        if let Some(popup) = self.popup.filter(|p| p.surface == surface) {
            return self.windows.get(popup.parent).map(|w| w.id());
        }
        if let Some(window) = self
            .windows
            .window_of_tab(surface)
            .or_else(|| self.windows.window_of_chrome(surface))
        {
            return Some(window);
        }
        if self.bridge.extension_hosts().contains(&surface) {
            return self.focused_window();
        }
        None
    }

    /// Extension popups are tracked as extension hosts and attributed to
    /// the window that opened them.
    /// Only one popup is open at a time; a new one replaces the old.
    pub fn on_popup_created(&mut self, surface: TabId, parent: WindowId) {
        if let Some(old) = self.popup.replace(Popup { surface, parent }) {
            if old.surface != surface {
                self.bridge.remove_extension_host(old.surface);
            }
        }
        self.bridge.add_extension_host(surface);
    }

    /// Background pages are extension hosts with no window of their own.
    pub fn on_background_page_created(&mut self, surface: TabId) {
        self.bridge.add_extension_host(surface);
    }

    /// `window.open` handling: tab and window dispositions are denied
    /// because surfaces cannot yet be handed to the page opener.
    pub fn on_window_open(&self, disposition: &str) -> WindowOpenAction {
        match disposition {
            "foreground-tab" | "background-tab" | "new-window" => {
                tracing::debug!(disposition, "window.open denied");
                WindowOpenAction::Deny
            }
            _ => WindowOpenAction::Allow,
        }
    }

    /// Context-menu "open link": a new window for `new-window`, otherwise a
    /// new tab in the focused window.
    pub fn open_link(&mut self, url: &str, disposition: &str) -> Result<(), WindowError> {
        if disposition == "new-window" {
            self.create_window(WindowOptions::with_url(url));
            return Ok(());
        }
        let window = self
            .focused_window()
            .ok_or_else(|| WindowError::InvalidState("no window is open".to_string()))?;
        let windows = &mut self.windows;
        let host = windows
            .windows
            .iter_mut()
            .find(|w| w.id() == window)
            .ok_or(WindowError::NotFound(window))?;
        host.tabs_mut()
            .create(windows.backend.as_mut(), CreateTabOptions::with_url(url))?;
        self.pump();
        Ok(())
    }

    // --- Game extension ---

    /// Called once the game extension is loaded: opens its start page and
    /// strategy room in the focused window, drops the initial tab and
    /// selects the start page. Returns the start tab.
    pub fn register_game_extension(&mut self, extension_id: &str) -> Result<TabId, WindowError> {
        let game = GameExtension::new(extension_id);
        let window = self
            .focused_window()
            .ok_or_else(|| WindowError::InvalidState("no window is open".to_string()))?;
        self.windows.make_ready(window)?;
        self.pump();

        let windows = &mut self.windows;
        let host = windows
            .windows
            .iter_mut()
            .find(|w| w.id() == window)
            .ok_or(WindowError::NotFound(window))?;
        let initial = host.tabs().selected();
        let start = game.open_tabs(host, windows.backend.as_mut())?;
        if let Some(initial) = initial {
            host.tabs_mut().remove(initial)?;
        }
        host.tabs_mut().select(start)?;

        tracing::info!(extension = extension_id, tab = start, "game extension loaded");
        self.game = Some(game);
        self.pump();
        Ok(start)
    }

    /// Closes every tab showing a page of `extension_id`, in every window.
    pub fn reload_extension(&mut self, extension_id: &str) -> Vec<TabId> {
        let mut removed = Vec::new();
        for host in self.windows.windows.iter_mut().filter(|w| !w.is_destroyed()) {
            match host.tabs_mut().remove_extension_tabs(extension_id) {
                Ok(ids) => removed.extend(ids),
                Err(e) => tracing::warn!(window = host.id(), error = %e, "extension tab sweep failed"),
            }
        }
        self.pump();
        removed
    }

    /// Replaces the game extension's tabs with a fresh start page and
    /// strategy room after its sources changed.
    fn reopen_game_extension(&mut self) {
        let Some(game) = self.game.clone() else {
            return;
        };
        let Some(window) = self.focused_window() else {
            return;
        };
        let stale: Vec<(WindowId, Vec<TabId>)> = self
            .windows
            .windows
            .iter()
            .filter(|w| !w.is_destroyed())
            .map(|w| (w.id(), w.tabs().extension_tab_ids(&game.id)))
            .collect();

        let windows = &mut self.windows;
        if let Some(host) = windows.windows.iter_mut().find(|w| w.id() == window) {
            let opened = game
                .open_tabs(host, windows.backend.as_mut())
                .and_then(|start| host.tabs_mut().select(start));
            if let Err(e) = opened {
                tracing::warn!(error = %e, "could not reopen game extension");
                return;
            }
        }

        for (window, tabs) in stale {
            let Some(host) = self.windows.get_mut(window) else {
                continue;
            };
            for tab in tabs {
                if host.is_destroyed() {
                    break;
                }
                if let Err(e) = host.tabs_mut().remove(tab) {
                    tracing::warn!(tab, error = %e, "could not close stale game tab");
                }
            }
        }
        self.pump();
    }

    // --- Update worker ---

    /// Starts the update worker on the current tokio runtime.
    pub fn start_update_worker(&mut self, updater: Arc<dyn Updater>) {
        let (worker, replies) = UpdateWorker::spawn(updater);
        self.worker = Some(worker);
        self.worker_replies = Some(replies);
    }

    /// Asks the worker to update the game extension on the configured channel.
    pub fn request_update(&self) -> Result<(), UpdateError> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| UpdateError::Failed("update worker is not running".to_string()))?;
        let channel = self.settings.get_settings().kc3kai.update.channel.clone();
        worker.request_update(self.extensions_path.to_string_lossy(), channel)
    }

    /// Forwards a raw `{ type, data }` request from the embedding host to
    /// the worker.
    pub fn post_worker_request(&self, raw: Value) -> Result<(), UpdateError> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| UpdateError::Failed("update worker is not running".to_string()))?;
        worker.post(parse_request(raw)?)
    }

    fn handle_worker_message(&mut self, msg: WorkerMessage) {
        match msg {
            WorkerMessage::StatusIsUpdating(status) => {
                self.is_updating = status.is_updating;
                tracing::info!(updating = status.is_updating, channel = ?status.channel, "update status");
            }
            WorkerMessage::UpdateProcessStarted(p) => {
                tracing::info!("Process started: {}", p.name);
            }
            WorkerMessage::UpdateProcessProgress(p) => {
                tracing::info!("Process progress: {}", p.describe());
            }
            WorkerMessage::UpdateProcessCompleted(p) if !p.ok => {
                tracing::warn!("Process failed: {}", p.name);
            }
            WorkerMessage::UpdateProcessCompleted(p) => {
                tracing::info!("Process completed: {}", p.name);
                if p.name == UPDATE_PROCESS_NAME {
                    self.reopen_game_extension();
                }
            }
            WorkerMessage::ErrorDoUpdate(e) => {
                tracing::warn!(error = %e, "update rejected");
            }
            request => {
                tracing::debug!(?request, "ignoring request echoed by update worker");
            }
        }
    }

    // --- Chrome UI ---

    /// Handles a `webui-message` sent by a chrome UI page.
    pub fn handle_webui_message(&mut self, message: &str, data: &Value) -> Result<Value, String> {
        match message {
            "get-config-item" => {
                let key = data
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or("get-config-item requires a string 'value'")?;
                self.settings.get_value(key).map_err(|e| e.to_string())
            }
            "get-config" => self.settings.all().map_err(|e| e.to_string()),
            "set-config-item" => {
                let key = data
                    .get("key")
                    .and_then(Value::as_str)
                    .ok_or("set-config-item requires a string 'key'")?;
                let value = data.get("value").cloned().unwrap_or(Value::Null);
                self.settings.set_value(key, value).map_err(|e| e.to_string())?;
                self.refresh_window_settings();
                Ok(Value::Null)
            }
            "kc3-doupdate" => {
                self.request_update().map_err(|e| e.to_string())?;
                Ok(Value::Null)
            }
            other => Err(format!("Unknown webui message: {}", other)),
        }
    }

    fn refresh_window_settings(&mut self) {
        let s = self.settings.get_settings();
        self.windows.proxy = s.proxy.client.clone();
        self.windows.debug = s.devtools.debug_shell;
        self.windows.default_size = (s.window.state.width, s.window.state.height);
    }

    fn persist_window_size(&mut self, width: u32, height: u32) {
        for (key, value) in [("window.state.width", width), ("window.state.height", height)] {
            if let Err(e) = self.settings.set_value(key, json!(value)) {
                tracing::warn!(key, error = %e, "could not persist window size");
            }
        }
        self.windows.default_size = (width, height);
    }

    // --- Commands ---

    pub fn run_command(&mut self, command: ShellCommand) -> Result<(), WindowError> {
        let window = self
            .focused_window()
            .ok_or_else(|| WindowError::InvalidState("no window is open".to_string()))?;
        let windows = &mut self.windows;
        let host = windows
            .windows
            .iter_mut()
            .find(|w| w.id() == window)
            .ok_or(WindowError::NotFound(window))?;
        let focused = host.focused_tab();
        match (command, focused) {
            (ShellCommand::NewTab, _) => {
                host.tabs_mut()
                    .create(windows.backend.as_mut(), CreateTabOptions::default())?;
            }
            (ShellCommand::CloseTab, Some(tab)) => host.tabs_mut().remove(tab)?,
            (ShellCommand::Reload, Some(tab)) => host.tabs_mut().reload(tab)?,
            (ShellCommand::ToggleInspector, Some(tab)) => {
                host.tabs_mut().toggle_inspector(tab, InspectorMode::Right)?;
            }
            (_, None) => {}
        }
        self.pump();
        Ok(())
    }

    // --- Event loop ---

    /// Routes one event. Returns `false` when the shell should stop.
    pub fn dispatch(&mut self, event: ShellEvent) -> bool {
        match event {
            ShellEvent::WindowReady(window) => {
                if let Err(e) = self.windows.make_ready(window) {
                    tracing::warn!(window, error = %e, "window not ready");
                }
            }
            ShellEvent::Surface(SurfaceEvent::DidNavigate { surface, url }) => {
                match self.windows.window_of_tab(surface) {
                    Some(window) => {
                        if let Some(host) = self.windows.get_mut(window) {
                            host.tabs_mut().handle_navigation(surface);
                        }
                    }
                    None => tracing::trace!(surface, %url, "navigation outside the tab strip"),
                }
            }
            ShellEvent::Surface(SurfaceEvent::DidFailLoad { surface, url, error }) => {
                tracing::warn!(surface, %url, %error, "load failed");
            }
            ShellEvent::WindowResized { window, width, height } => {
                tracing::debug!(window, width, height, "window resized");
                self.persist_window_size(width, height);
            }
            ShellEvent::Worker(msg) => self.handle_worker_message(msg),
            ShellEvent::Command(command) => {
                if let Err(e) = self.run_command(command) {
                    tracing::warn!(?command, error = %e, "command failed");
                }
            }
            ShellEvent::Quit => return false,
        }
        self.pump();
        true
    }

    /// Drains every window's notices into the bridge, forgets closed
    /// windows and forwards the resulting extension events.
    pub fn pump(&mut self) {
        let ctx = HostContext {
            start_page_url: self.game.as_ref().map(|g| g.start_page_url.clone()),
            open_inspector_on_start_page: self.settings.get_settings().devtools.open_on_start_page,
        };
        for host in self.windows.windows.iter_mut() {
            for notice in host.process_events(&ctx) {
                self.bridge.apply_notice(notice);
            }
        }
        self.windows.windows.retain(|w| !w.is_destroyed());
        if let Some(popup) = self.popup.filter(|p| self.windows.get(p.parent).is_none()) {
            self.bridge.remove_extension_host(popup.surface);
            self.popup = None;
        }
        self.forward_extension_events();
    }

    fn forward_extension_events(&mut self) {
        for event in self.bridge.take_events() {
            // No subscribers is fine; extension hosts attach lazily.
            let _ = self.extension_events.send(event);
        }
    }

    /// Dispatches everything already queued without waiting. Returns the
    /// number of events handled.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let event = match self.events_rx.try_recv() {
                Ok(event) => event,
                Err(_) => match self.worker_replies.as_mut().map(|rx| rx.try_recv()) {
                    Some(Ok(msg)) => ShellEvent::Worker(msg),
                    _ => break,
                },
            };
            handled += 1;
            if !self.dispatch(event) {
                break;
            }
        }
        handled
    }

    /// Waits for the next surface, window or worker event.
    pub async fn next_event(&mut self) -> Option<ShellEvent> {
        tokio::select! {
            Some(event) = self.events_rx.recv() => Some(event),
            Some(msg) = recv_worker(&mut self.worker_replies) => Some(ShellEvent::Worker(msg)),
            else => None,
        }
    }

    /// Runs the event loop until `Quit` or until the last window closes.
    pub async fn run(&mut self) {
        while let Some(event) = self.next_event().await {
            if !self.dispatch(event) {
                break;
            }
            if self.windows.is_empty() {
                tracing::info!("all windows closed");
                break;
            }
        }
        self.shutdown().await;
    }

    /// Destroys every window and stops the update worker.
    pub async fn shutdown(&mut self) {
        for host in self.windows.windows.iter_mut() {
            host.destroy();
        }
        self.pump();
        if let Some(worker) = self.worker.take() {
            worker.shutdown().await;
        }
        self.worker_replies = None;
    }
}

async fn recv_worker(rx: &mut Option<UnboundedReceiver<WorkerMessage>>) -> Option<WorkerMessage> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
