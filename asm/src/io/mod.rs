//! Side-effecting helpers: filesystem layout, logs, locking, templates.

pub mod agents;
pub mod config;
pub mod conversation_index;
pub mod event_log;
pub mod lock;
pub mod paths;
pub mod pointer;
pub mod prompt;
pub mod workspace;
