//! In-memory surface backend.
//!
//! Keeps every window and surface it hands out in shared state so callers
//! can inspect bounds, attachment and inspector state after ownership has
//! moved into the shell. Loads complete immediately and report
//! `DidNavigate` on the event sink, unless the URL was marked as failing.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;

use super::{
    LoadCompleter, NativeWindow, PendingLoad, SurfaceBackend, SurfaceEventSink, ViewSurface,
    WindowHandle,
};
use crate::types::event::ShellEvent;
use crate::types::settings::ProxyConfig;
use crate::types::surface::{Bounds, InspectorMode, SurfaceEvent};
use crate::types::tab::{TabId, WindowId};
use crate::types::window::WindowOptions;

static NEXT_SURFACE_ID: AtomicU32 = AtomicU32::new(1);
static NEXT_WINDOW_ID: AtomicU32 = AtomicU32::new(1);

const DEFAULT_WIDTH: u32 = 1200;
const DEFAULT_HEIGHT: u32 = 800;

/// Observable state of one headless surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    pub id: TabId,
    pub bounds: Bounds,
    pub auto_resize: bool,
    pub background: Option<String>,
    pub url: Option<String>,
    pub history: Vec<String>,
    pub reloads: u32,
    pub inspector: Option<InspectorMode>,
    pub messages: Vec<(String, Value)>,
    pub release_count: u32,
}

/// Observable state of one headless window.
#[derive(Debug, Clone, Default)]
pub struct WindowState {
    pub id: WindowId,
    pub width: u32,
    pub height: u32,
    pub attached: Vec<TabId>,
    pub focused: bool,
    pub destroy_count: u32,
}

#[derive(Default)]
struct BackendState {
    surfaces: Vec<Rc<RefCell<SurfaceState>>>,
    windows: Vec<Rc<RefCell<WindowState>>>,
    failing_urls: HashSet<String>,
    proxy: Option<ProxyConfig>,
    sink: Option<SurfaceEventSink>,
}

/// Cloneable handle to the in-memory backend. Clones share state.
#[derive(Clone, Default)]
pub struct HeadlessBackend {
    state: Rc<RefCell<BackendState>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future load of `url` fail.
    pub fn fail_url(&self, url: impl Into<String>) {
        self.state.borrow_mut().failing_urls.insert(url.into());
    }

    pub fn surface(&self, id: TabId) -> Option<SurfaceState> {
        self.state
            .borrow()
            .surfaces
            .iter()
            .find(|s| s.borrow().id == id)
            .map(|s| s.borrow().clone())
    }

    pub fn window(&self, id: WindowId) -> Option<WindowState> {
        self.state
            .borrow()
            .windows
            .iter()
            .find(|w| w.borrow().id == id)
            .map(|w| w.borrow().clone())
    }

    /// Simulates the user resizing a window.
    pub fn resize_window(&self, id: WindowId, width: u32, height: u32) {
        if let Some(w) = self.state.borrow().windows.iter().find(|w| w.borrow().id == id) {
            let mut w = w.borrow_mut();
            w.width = width;
            w.height = height;
        }
    }

    /// Moves focus to `id`, unfocusing every other window.
    pub fn focus_window(&self, id: WindowId) {
        for w in &self.state.borrow().windows {
            let mut w = w.borrow_mut();
            w.focused = w.id == id;
        }
    }

    pub fn proxy(&self) -> Option<ProxyConfig> {
        self.state.borrow().proxy.clone()
    }

    /// Surfaces whose bounds are currently on-screen.
    pub fn shown_surfaces(&self) -> Vec<TabId> {
        self.state
            .borrow()
            .surfaces
            .iter()
            .filter(|s| {
                let s = s.borrow();
                s.release_count == 0 && s.bounds.x >= 0 && !s.bounds.is_degenerate()
            })
            .map(|s| s.borrow().id)
            .collect()
    }
}

impl SurfaceBackend for HeadlessBackend {
    fn create_window(&mut self, options: &WindowOptions) -> WindowHandle {
        let id = NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed);
        let width = if options.width > 0 { options.width } else { DEFAULT_WIDTH };
        let height = if options.height > 0 { options.height } else { DEFAULT_HEIGHT };
        let state = Rc::new(RefCell::new(WindowState {
            id,
            width,
            height,
            ..Default::default()
        }));
        self.state.borrow_mut().windows.push(state.clone());
        Rc::new(HeadlessWindow { state })
    }

    fn create_surface(&mut self) -> Box<dyn ViewSurface> {
        let id = NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed);
        let state = Rc::new(RefCell::new(SurfaceState {
            id,
            ..Default::default()
        }));
        self.state.borrow_mut().surfaces.push(state.clone());
        Box::new(HeadlessSurface {
            state,
            backend: self.state.clone(),
        })
    }

    fn set_proxy(&mut self, proxy: Option<&ProxyConfig>) {
        self.state.borrow_mut().proxy = proxy.cloned();
    }

    fn set_event_sink(&mut self, sink: SurfaceEventSink) {
        self.state.borrow_mut().sink = Some(sink);
    }
}

struct HeadlessSurface {
    state: Rc<RefCell<SurfaceState>>,
    backend: Rc<RefCell<BackendState>>,
}

impl HeadlessSurface {
    fn finish_load(&self, url: &str, completer: LoadCompleter) {
        let id = self.state.borrow().id;
        let backend = self.backend.borrow();
        let event = if backend.failing_urls.contains(url) {
            completer.complete(Err(format!("ERR_FAILED loading {}", url)));
            SurfaceEvent::DidFailLoad {
                surface: id,
                url: url.to_string(),
                error: "ERR_FAILED".to_string(),
            }
        } else {
            {
                let mut state = self.state.borrow_mut();
                state.url = Some(url.to_string());
                state.history.push(url.to_string());
            }
            completer.complete(Ok(()));
            SurfaceEvent::DidNavigate {
                surface: id,
                url: url.to_string(),
            }
        };
        if let Some(sink) = &backend.sink {
            let _ = sink.send(ShellEvent::Surface(event));
        }
    }
}

impl ViewSurface for HeadlessSurface {
    fn id(&self) -> TabId {
        self.state.borrow().id
    }

    fn bounds(&self) -> Bounds {
        self.state.borrow().bounds
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.state.borrow_mut().bounds = bounds;
    }

    fn set_auto_resize(&mut self, enabled: bool) {
        self.state.borrow_mut().auto_resize = enabled;
    }

    fn set_background_color(&mut self, color: &str) {
        self.state.borrow_mut().background = Some(color.to_string());
    }

    fn load_url(&mut self, url: &str) -> PendingLoad {
        let (completer, pending) = PendingLoad::channel();
        self.finish_load(url, completer);
        pending
    }

    fn url(&self) -> Option<String> {
        self.state.borrow().url.clone()
    }

    fn reload(&mut self) {
        self.state.borrow_mut().reloads += 1;
    }

    fn is_inspector_open(&self) -> bool {
        self.state.borrow().inspector.is_some()
    }

    fn open_inspector(&mut self, mode: InspectorMode) {
        self.state.borrow_mut().inspector = Some(mode);
    }

    fn close_inspector(&mut self) {
        self.state.borrow_mut().inspector = None;
    }

    fn send(&mut self, channel: &str, payload: Value) {
        self.state
            .borrow_mut()
            .messages
            .push((channel.to_string(), payload));
    }

    fn release(&mut self) {
        self.state.borrow_mut().release_count += 1;
    }
}

struct HeadlessWindow {
    state: Rc<RefCell<WindowState>>,
}

impl NativeWindow for HeadlessWindow {
    fn id(&self) -> WindowId {
        self.state.borrow().id
    }

    fn size(&self) -> (u32, u32) {
        let s = self.state.borrow();
        (s.width, s.height)
    }

    fn attach_surface(&self, surface: TabId) {
        let mut s = self.state.borrow_mut();
        if !s.attached.contains(&surface) {
            s.attached.push(surface);
        }
    }

    fn detach_surface(&self, surface: TabId) {
        self.state.borrow_mut().attached.retain(|id| *id != surface);
    }

    fn is_focused(&self) -> bool {
        self.state.borrow().focused
    }

    fn destroy(&self) {
        self.state.borrow_mut().destroy_count += 1;
    }

    fn is_destroyed(&self) -> bool {
        self.state.borrow().destroy_count > 0
    }
}
