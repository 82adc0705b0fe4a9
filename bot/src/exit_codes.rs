//! Stable exit codes for countbot CLI commands.

/// Command succeeded, or `run` stopped at the ceiling or its cycle limit.
pub const OK: i32 = 0;
/// Invalid config, unresolvable video, record log failure, or other errors.
pub const INVALID: i32 = 1;
/// `countbot peek` found no counter in the comment window.
pub const NO_MATCH: i32 = 2;
/// `countbot run` was stopped by Ctrl-C.
pub const INTERRUPTED: i32 = 3;
