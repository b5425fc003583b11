//! A single browser tab: identity plus the one content surface it owns.

use crate::surface::{NativeWindow, PendingLoad, ViewSurface};
use crate::types::errors::TabError;
use crate::types::surface::{Bounds, InspectorMode};
use crate::types::tab::{TabId, Visibility, WindowId};

/// Height of the chrome UI toolbar (tab strip plus address bar).
pub const TOOLBAR_HEIGHT: u32 = 62;
/// Toolbar height for tabs whose address bar is suppressed.
pub const COMPACT_TOOLBAR_HEIGHT: u32 = 32;

const TAB_BACKGROUND: &str = "white";

/// A browser tab.
///
/// The window is referenced by id only; the owning `TabCollection` passes
/// the window handle into the operations that need it.
pub struct Tab {
    id: TabId,
    window_id: Option<WindowId>,
    surface: Option<Box<dyn ViewSurface>>,
    compact: bool,
    requested_url: Option<String>,
    visibility: Visibility,
}

impl Tab {
    /// Wraps `surface` into a tab and attaches it to `window`, hidden.
    pub fn create(window: &dyn NativeWindow, surface: Box<dyn ViewSurface>, compact: bool) -> Self {
        let id = surface.id();
        window.attach_surface(id);
        let mut tab = Self {
            id,
            window_id: Some(window.id()),
            surface: Some(surface),
            compact,
            requested_url: None,
            visibility: Visibility::Hidden,
        };
        tab.hide();
        tab
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    /// Id of the window this tab lives in, `None` once destroyed.
    pub fn window_id(&self) -> Option<WindowId> {
        self.window_id
    }

    pub fn is_destroyed(&self) -> bool {
        self.surface.is_none()
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// The URL most recently passed to [`Tab::load_url`].
    pub fn requested_url(&self) -> Option<&str> {
        self.requested_url.as_deref()
    }

    /// URL currently committed in the surface.
    pub fn url(&self) -> Option<String> {
        self.surface.as_ref().and_then(|s| s.url())
    }

    pub fn bounds(&self) -> Bounds {
        self.surface.as_ref().map(|s| s.bounds()).unwrap_or_default()
    }

    pub fn is_inspector_open(&self) -> bool {
        self.surface
            .as_ref()
            .map(|s| s.is_inspector_open())
            .unwrap_or(false)
    }

    fn surface_mut(&mut self) -> Result<&mut Box<dyn ViewSurface>, TabError> {
        let id = self.id;
        self.surface
            .as_mut()
            .ok_or_else(|| TabError::InvalidState(format!("tab {} is destroyed", id)))
    }

    pub fn load_url(&mut self, url: &str) -> Result<PendingLoad, TabError> {
        let pending = self.surface_mut()?.load_url(url);
        self.requested_url = Some(url.to_string());
        Ok(pending)
    }

    pub fn reload(&mut self) -> Result<(), TabError> {
        self.surface_mut()?.reload();
        Ok(())
    }

    pub fn open_inspector(&mut self, mode: InspectorMode) -> Result<(), TabError> {
        self.surface_mut()?.open_inspector(mode);
        Ok(())
    }

    /// Returns whether the inspector is open afterwards.
    pub fn toggle_inspector(&mut self, mode: InspectorMode) -> Result<bool, TabError> {
        let surface = self.surface_mut()?;
        if surface.is_inspector_open() {
            surface.close_inspector();
            Ok(false)
        } else {
            surface.open_inspector(mode);
            Ok(true)
        }
    }

    /// Lays the surface out below the toolbar and lets it follow resizes.
    pub fn show(&mut self, window: &dyn NativeWindow) -> Result<(), TabError> {
        let offset = if self.compact {
            COMPACT_TOOLBAR_HEIGHT
        } else {
            TOOLBAR_HEIGHT
        };
        let (width, height) = window.size();
        let surface = self.surface_mut()?;
        surface.set_background_color(TAB_BACKGROUND);
        surface.set_bounds(Bounds::new(
            0,
            offset as i32,
            width,
            height.saturating_sub(offset),
        ));
        surface.set_auto_resize(true);
        self.visibility = Visibility::Shown;
        Ok(())
    }

    /// Parks the surface off-screen. The surface stays attached so the
    /// window association survives for a later `show`.
    pub fn hide(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.set_auto_resize(false);
            surface.set_bounds(Bounds::offscreen());
        }
        self.visibility = Visibility::Hidden;
    }

    /// Tears the tab down. Safe to call repeatedly; only the first call
    /// touches the surface.
    pub fn destroy(&mut self, window: Option<&dyn NativeWindow>) {
        if self.is_destroyed() {
            return;
        }
        self.hide();
        if let Some(window) = window {
            window.detach_surface(self.id);
        }
        self.window_id = None;
        if let Some(mut surface) = self.surface.take() {
            if surface.is_inspector_open() {
                surface.close_inspector();
            }
            surface.release();
        }
        tracing::debug!(tab = self.id, "tab destroyed");
    }
}

impl std::fmt::Debug for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tab")
            .field("id", &self.id)
            .field("window_id", &self.window_id)
            .field("destroyed", &self.is_destroyed())
            .field("compact", &self.compact)
            .field("visibility", &self.visibility)
            .finish()
    }
}
