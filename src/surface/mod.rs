//! Content surface abstraction.
//!
//! The shell never renders anything itself. A [`SurfaceBackend`] supplied by
//! the embedding application creates native windows and embeddable content
//! surfaces; the tab and window managers drive them through the
//! [`ViewSurface`] and [`NativeWindow`] traits. [`headless`] provides an
//! in-memory backend used by the demo binary and the test suite.

pub mod headless;

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::types::errors::TabError;
use crate::types::event::EventSender;
use crate::types::settings::ProxyConfig;
use crate::types::surface::{Bounds, InspectorMode};
use crate::types::tab::{TabId, WindowId};
use crate::types::window::WindowOptions;

/// Channel on which surfaces report navigation outcomes, wrapped in
/// `ShellEvent::Surface`.
pub type SurfaceEventSink = EventSender;

/// One embeddable content area with its own bounds and visibility.
pub trait ViewSurface {
    /// Identifier assigned by the backend, unique within the process.
    fn id(&self) -> TabId;
    fn bounds(&self) -> Bounds;
    fn set_bounds(&mut self, bounds: Bounds);
    fn set_auto_resize(&mut self, enabled: bool);
    fn set_background_color(&mut self, color: &str);
    /// Starts loading `url`. Never blocks; the outcome arrives later.
    fn load_url(&mut self, url: &str) -> PendingLoad;
    /// URL of the content currently committed in the surface.
    fn url(&self) -> Option<String>;
    fn reload(&mut self);
    fn is_inspector_open(&self) -> bool;
    fn open_inspector(&mut self, mode: InspectorMode);
    fn close_inspector(&mut self);
    /// Posts a message to the page hosted by the surface.
    fn send(&mut self, channel: &str, payload: Value);
    /// Frees the native resources. Called exactly once by the owner.
    fn release(&mut self);
}

/// A native top-level window. Handles are shared between a `WindowHost`
/// and its `TabCollection`, so every method takes `&self`.
pub trait NativeWindow {
    fn id(&self) -> WindowId;
    /// Inner size as `(width, height)`.
    fn size(&self) -> (u32, u32);
    fn attach_surface(&self, surface: TabId);
    fn detach_surface(&self, surface: TabId);
    fn is_focused(&self) -> bool;
    fn destroy(&self);
    fn is_destroyed(&self) -> bool;
}

pub type WindowHandle = Rc<dyn NativeWindow>;

/// Factory for windows and surfaces, implemented by the embedding app.
pub trait SurfaceBackend {
    fn create_window(&mut self, options: &WindowOptions) -> WindowHandle;
    fn create_surface(&mut self) -> Box<dyn ViewSurface>;
    /// Applies (or clears) the session-wide proxy.
    fn set_proxy(&mut self, proxy: Option<&ProxyConfig>);
    /// Where surfaces created from now on report navigation events.
    fn set_event_sink(&mut self, sink: SurfaceEventSink);
}

/// Outcome of a content load that has been started but not finished.
#[derive(Debug)]
pub struct PendingLoad {
    rx: oneshot::Receiver<Result<(), String>>,
}

/// Producer half of a [`PendingLoad`], kept by the backend.
#[derive(Debug)]
pub struct LoadCompleter {
    tx: oneshot::Sender<Result<(), String>>,
}

impl PendingLoad {
    pub fn channel() -> (LoadCompleter, PendingLoad) {
        let (tx, rx) = oneshot::channel();
        (LoadCompleter { tx }, PendingLoad { rx })
    }

    /// Non-blocking check. `None` while the load is still in flight.
    pub fn try_outcome(&mut self) -> Option<Result<(), TabError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result.map_err(TabError::Upstream)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(TabError::Upstream("load abandoned".to_string())))
            }
        }
    }
}

impl LoadCompleter {
    pub fn complete(self, result: Result<(), String>) {
        // The tab may have dropped its PendingLoad; nobody is waiting then.
        let _ = self.tx.send(result);
    }
}

impl Future for PendingLoad {
    type Output = Result<(), TabError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(result) => result.map_err(TabError::Upstream),
            Err(_) => Err(TabError::Upstream("load abandoned".to_string())),
        })
    }
}
