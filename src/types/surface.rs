use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Rectangle occupied by a surface inside its window, in window pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Bounds used to park a surface off-screen without detaching it.
    pub fn offscreen() -> Self {
        Self::new(-1000, 0, 0, 0)
    }

    /// True when the rectangle has no visible area.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Where an inspector (devtools) panel is docked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectorMode {
    Right,
    Bottom,
    Detach,
}

/// Notifications raised asynchronously by content surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    DidNavigate { surface: TabId, url: String },
    DidFailLoad { surface: TabId, url: String, error: String },
}
