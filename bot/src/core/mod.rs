//! Deterministic, pure logic shared by the bot.
//!
//! Core modules must be free of I/O side effects. They operate on comment text
//! and counter values already fetched from the platform and return
//! deterministic outputs suitable for tests.

pub mod plan;
pub mod template;
pub mod types;
pub mod video;
