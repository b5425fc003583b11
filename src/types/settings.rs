use serde::{Deserialize, Serialize};

/// Top-level shell configuration, persisted as `config.json`.
///
/// Field names match the keys the chrome UI uses with `get-config-item`
/// and `set-config-item` (e.g. `window.state.width`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShellSettings {
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub kc3kai: GameExtensionSettings,
    #[serde(default)]
    pub proxy: ProxySettings,
    #[serde(default)]
    pub devtools: DevtoolsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WindowSettings {
    #[serde(default)]
    pub state: WindowState,
}

/// Persisted window size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowState {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GameExtensionSettings {
    #[serde(default)]
    pub update: UpdateSettings,
}

/// How the game extension sources are kept up to date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateSettings {
    pub channel: String,
    pub schedule: String,
    pub auto: bool,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            channel: "release".to_string(),
            schedule: "startup".to_string(),
            auto: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProxySettings {
    #[serde(default)]
    pub client: ProxyConfig,
}

/// Proxy applied to the browsing session when a window becomes ready.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub enable: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            enable: false,
        }
    }
}

impl ProxyConfig {
    /// Proxy rules string in `host:port` form.
    pub fn rules(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DevtoolsSettings {
    /// Open the inspector when a tab lands on the game start page.
    pub open_on_start_page: bool,
    /// Open detached inspectors for every window and background page.
    pub debug_shell: bool,
}

impl Default for DevtoolsSettings {
    fn default() -> Self {
        Self {
            open_on_start_page: true,
            debug_shell: false,
        }
    }
}
