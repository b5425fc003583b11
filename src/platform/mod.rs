// Damecon platform paths
//
// Linux:   $XDG_CONFIG_HOME/damecon, $XDG_DATA_HOME/damecon
// macOS:   ~/Library/Application Support/Damecon
// Windows: %APPDATA%/Damecon
//
// DAMECON_CONFIG_DIR overrides both on every platform.

use std::env;
use std::path::PathBuf;

pub const CONFIG_DIR_ENV: &str = "DAMECON_CONFIG_DIR";

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    PathBuf::from(env::var(var).unwrap_or_else(|_| String::from("/tmp")))
}

fn override_dir() -> Option<PathBuf> {
    env::var_os(CONFIG_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory holding `config.json`.
pub fn get_config_dir() -> PathBuf {
    if let Some(dir) = override_dir() {
        return dir;
    }
    #[cfg(target_os = "linux")]
    {
        match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => PathBuf::from(xdg).join("damecon"),
            Err(_) => home_dir().join(".config").join("damecon"),
        }
    }
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .join("Library")
            .join("Application Support")
            .join("Damecon")
    }
    #[cfg(target_os = "windows")]
    {
        match env::var("APPDATA") {
            Ok(appdata) => PathBuf::from(appdata).join("Damecon"),
            Err(_) => home_dir().join("AppData").join("Roaming").join("Damecon"),
        }
    }
}

/// Directory holding the cookie jar and the downloaded extension sources.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = override_dir() {
        return dir;
    }
    #[cfg(target_os = "linux")]
    {
        match env::var("XDG_DATA_HOME") {
            Ok(xdg) => PathBuf::from(xdg).join("damecon"),
            Err(_) => home_dir().join(".local").join("share").join("damecon"),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        get_config_dir()
    }
}
