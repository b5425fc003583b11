use thiserror::Error;

use super::tab::{TabId, WindowId};

/// Coarse classification shared by every error enum in the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An operation referenced a tab or window id that does not exist.
    NotFound,
    /// An operation was attempted on a destroyed tab or collection.
    InvalidState,
    /// The cookie store or a content load failed underneath us.
    UpstreamFailure,
}

// === TabError ===

/// Errors related to tab and tab collection operations.
#[derive(Debug, Error)]
pub enum TabError {
    /// Tab with the given ID was not found.
    #[error("Tab not found: {0}")]
    NotFound(TabId),
    /// The tab or its collection has already been destroyed.
    #[error("Invalid tab state: {0}")]
    InvalidState(String),
    /// The content surface rejected the operation.
    #[error("Tab surface failure: {0}")]
    Upstream(String),
}

impl TabError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TabError::NotFound(_) => ErrorKind::NotFound,
            TabError::InvalidState(_) => ErrorKind::InvalidState,
            TabError::Upstream(_) => ErrorKind::UpstreamFailure,
        }
    }
}

// === WindowError ===

/// Errors related to window hosts.
#[derive(Debug, Error)]
pub enum WindowError {
    /// Window with the given ID was not found.
    #[error("Window not found: {0}")]
    NotFound(WindowId),
    /// The window has already been torn down.
    #[error("Invalid window state: {0}")]
    InvalidState(String),
    /// A tab operation inside the window failed.
    #[error(transparent)]
    Tab(#[from] TabError),
}

impl WindowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WindowError::NotFound(_) => ErrorKind::NotFound,
            WindowError::InvalidState(_) => ErrorKind::InvalidState,
            WindowError::Tab(e) => e.kind(),
        }
    }
}

// === CookieError ===

/// Errors surfaced by the session cookie store.
#[derive(Debug, Error)]
pub enum CookieError {
    /// The URL passed with the request could not be parsed.
    #[error("Invalid cookie url: {0}")]
    InvalidUrl(String),
    /// The underlying store failed.
    #[error("Cookie store error: {0}")]
    Store(String),
}

impl From<rusqlite::Error> for CookieError {
    fn from(err: rusqlite::Error) -> Self {
        CookieError::Store(err.to_string())
    }
}

// === ExtensionError ===

/// Errors related to the extension API bridge.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// A bridge already exists for the given session.
    #[error("Extensions instance already exists for session: {0}")]
    AlreadyRegistered(String),
    /// A referenced tab or window was not found.
    #[error("Extension target not found: {0}")]
    NotFound(String),
    /// The request details were malformed.
    #[error("Invalid extension request: {0}")]
    InvalidRequest(String),
    /// The embedding host rejected the request.
    #[error("Extension host error: {0}")]
    Host(String),
    /// The cookie store failed.
    #[error(transparent)]
    Cookie(#[from] CookieError),
}

impl ExtensionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtensionError::NotFound(_) => ErrorKind::NotFound,
            ExtensionError::AlreadyRegistered(_) | ExtensionError::InvalidRequest(_) => {
                ErrorKind::InvalidState
            }
            ExtensionError::Host(_) | ExtensionError::Cookie(_) => ErrorKind::UpstreamFailure,
        }
    }
}

impl From<WindowError> for ExtensionError {
    fn from(err: WindowError) -> Self {
        match err {
            WindowError::NotFound(id) => ExtensionError::NotFound(format!("window {}", id)),
            WindowError::Tab(TabError::NotFound(id)) => {
                ExtensionError::NotFound(format!("tab {}", id))
            }
            other => ExtensionError::Host(other.to_string()),
        }
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === UpdateError ===

/// Errors related to the extension update worker.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The requested update channel is not recognised.
    #[error("Invalid update channel {0}")]
    InvalidChannel(String),
    /// An update is already running.
    #[error("Update already in progress.")]
    AlreadyUpdating,
    /// A worker message did not match the `{ type, data }` envelope.
    #[error("Invalid worker message: {0}")]
    InvalidMessage(String),
    /// The updater itself failed.
    #[error("Update failed: {0}")]
    Failed(String),
}
