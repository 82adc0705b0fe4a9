//! I/O adapters for bot commands.

pub mod api;
pub mod config;
pub mod record;
