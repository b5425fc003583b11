//! Damecon: a tabbed shell that hosts Chrome extensions.
//!
//! The library manages windows and their tab strips over an abstract
//! surface backend, bridges the `chrome.cookies`, `chrome.tabs` and
//! `chrome.windows` APIs to that state, and runs the game extension's
//! update worker. This crate exposes all modules for use by the binaries
//! and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod surface;
pub mod types;
