//! Voxlink - voice-over sample catalog with share links and an audio proxy
//!
//! This library crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod delivery;
pub mod fetch;
pub mod links;
pub mod server;
pub mod session;
pub mod share;
