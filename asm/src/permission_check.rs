//! `asm can-write <file>` / `asm can-exec <verb>`.
//!
//! Enforcement always uses the profile resolved live from the current state;
//! a disagreeing embedded snapshot is reported as a warning only.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::permissions::{Decision, PermissionProfile};
use crate::core::replay::{current_permissions, current_state};
use crate::core::state::MachineState;
use crate::error::AsmError;
use crate::session::open_session;

/// What is being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Write,
    Execute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub state: MachineState,
    pub check: CheckKind,
    pub subject: String,
    pub allowed: bool,
    pub rule: Option<String>,
    pub warnings: Vec<String>,
}

pub fn check_write(cwd: &Path, file: &str) -> Result<CheckOutcome, AsmError> {
    check(cwd, CheckKind::Write, file, PermissionProfile::check_write)
}

pub fn check_execute(cwd: &Path, verb: &str) -> Result<CheckOutcome, AsmError> {
    check(cwd, CheckKind::Execute, verb, PermissionProfile::check_execute)
}

fn check(
    cwd: &Path,
    kind: CheckKind,
    subject: &str,
    decide: fn(&PermissionProfile, &str) -> Decision,
) -> Result<CheckOutcome, AsmError> {
    if subject.trim().is_empty() {
        return Err(AsmError::InvalidInput(
            "nothing to check: argument is empty".to_string(),
        ));
    }

    let ctx = open_session(cwd)?;
    let replay = ctx.replay()?;
    let state = current_state(&replay.records)?.state().clone();
    let audit = current_permissions(&replay.records)?;

    let mut warnings = replay.warnings();
    if let Some(warning) = audit.warning(&state) {
        warn!(state = %state, "{warning}");
        warnings.push(warning);
    }

    let decision = decide(&audit.live, subject);
    debug!(state = %state, ?kind, subject, allowed = decision.allowed, "permission checked");
    Ok(CheckOutcome {
        state,
        check: kind,
        subject: subject.to_string(),
        allowed: decision.allowed,
        rule: decision.rule,
        warnings,
    })
}
