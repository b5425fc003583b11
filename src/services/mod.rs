// Damecon services
// Services back the extension-facing surface and the shell's configuration: cookie store, extension bridge, settings, updates.

pub mod cookie_store;
pub mod extension_bridge;
pub mod settings_engine;
pub mod update_worker;
