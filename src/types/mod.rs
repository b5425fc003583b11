// Damecon shared type definitions
// Each submodule defines types used across the shell.

pub mod cookie;
pub mod errors;
pub mod event;
pub mod extension;
pub mod settings;
pub mod surface;
pub mod tab;
pub mod update;
pub mod window;
