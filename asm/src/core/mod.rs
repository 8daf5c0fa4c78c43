//! Deterministic, pure logic for the agent state machine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! record sequences and return deterministic outputs suitable for tests.

pub mod conversation;
pub mod permissions;
pub mod records;
pub mod replay;
pub mod state;
