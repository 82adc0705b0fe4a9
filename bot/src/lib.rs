//! Scheduled bot that advances a counter carried in a recurring video comment.
//!
//! Each cycle reads the newest comments, takes the highest counter matching
//! the configured template, and posts the successor until a ceiling is
//! reached. The comment section is the only source of truth: no counter state
//! is kept locally, so a restarted bot resumes from whatever is posted.
//!
//! - **[`core`]**: Pure, deterministic logic (template matching, next-step
//!   planning, outcome types). No I/O.
//! - **[`io`]**: Side-effecting adapters (config file, platform HTTP client,
//!   record log). The client sits behind a trait so tests can script it.
//!
//! Orchestration modules ([`resolver`], [`reader`], [`advancer`],
//! [`schedule`]) compose core logic with I/O to implement CLI commands.
//!
//! The bot assumes nobody else advances the same counter concurrently. A
//! racing writer can make it post a value that already exists; this is not
//! detected.

pub mod advancer;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod reader;
pub mod resolver;
pub mod schedule;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
