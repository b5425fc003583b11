use tokio::sync::mpsc;

use super::surface::SurfaceEvent;
use super::tab::WindowId;
use super::update::WorkerMessage;

/// Everything the shell's event loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    /// Posted by a freshly built `WindowHost` so its initial tabs are
    /// created on the next turn of the loop, after construction returns.
    WindowReady(WindowId),
    Surface(SurfaceEvent),
    WindowResized {
        window: WindowId,
        width: u32,
        height: u32,
    },
    Worker(WorkerMessage),
    Command(ShellCommand),
    Quit,
}

/// Keyboard-shortcut commands. They act on the focused tab of the focused
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    NewTab,
    CloseTab,
    Reload,
    ToggleInspector,
}

pub type EventSender = mpsc::UnboundedSender<ShellEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ShellEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
