//! Event-sourced agent state machine.
//!
//! A session records every initialization, state transition, and
//! conversation boundary in an append-only Event Log (`state.jsonl`). Nothing
//! else is authoritative: current state, the active conversation, and the
//! permission profile in force are all recomputed by replaying that log on
//! every invocation.
//!
//! - **[`core`]**: Pure logic (state model, permission resolution, record
//!   model, replay). No I/O.
//! - **[`io`]**: Side-effecting operations (logs, locking, pointer file,
//!   workspaces, templates).
//!
//! Orchestration modules ([`session`], [`transition`], [`conversation`],
//! [`delegate`], [`permission_check`]) combine the two into one function per
//! CLI command: read, validate, append.

pub mod conversation;
pub mod core;
pub mod delegate;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod permission_check;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod transition;

pub use error::{AsmError, Step};
