//! Stable exit codes for asm CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid arguments, configuration, or input.
pub const INVALID: i32 = 1;
/// No session pointer resolves (run `asm init`).
pub const NO_SESSION: i32 = 2;
/// `asm conv-end` found no unterminated conversation.
pub const NO_CONVERSATION: i32 = 3;
/// The record defining current state could not be parsed.
pub const CORRUPT_LOG: i32 = 4;
/// A create/append/list operation failed.
pub const IO_FAILURE: i32 = 5;
/// The session lock could not be acquired in time. Safe to retry.
pub const LOCK_TIMEOUT: i32 = 6;
/// A multi-step operation stopped partway; see the reported step.
pub const PARTIAL: i32 = 7;
