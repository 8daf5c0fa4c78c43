//! `asm delegate <agent> <task...>`: prepare a hand-off to an agent.
//!
//! Read-only with respect to the Event Log. The caller records the actual
//! state change with `asm transition` when the agent starts.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::core::conversation::ConversationId;
use crate::core::replay::{active_conversation, current_state};
use crate::core::state::MachineState;
use crate::error::AsmError;
use crate::io::prompt::{DelegationRequest, build_delegation};
use crate::session::open_session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateOutcome {
    pub task_tool_params: DelegationRequest,
    pub workspace: PathBuf,
    pub conversation_id: Option<ConversationId>,
    pub warnings: Vec<String>,
}

pub fn delegate(cwd: &Path, agent: &str, task: &str) -> Result<DelegateOutcome, AsmError> {
    let agent = MachineState::parse_target(agent)?;
    if !agent.is_agent() {
        return Err(AsmError::InvalidInput(format!(
            "cannot delegate to reserved state '{agent}'"
        )));
    }
    if task.trim().is_empty() {
        return Err(AsmError::InvalidInput("task must not be empty".to_string()));
    }

    let ctx = open_session(cwd)?;
    let replay = ctx.replay()?;
    current_state(&replay.records)?;
    let active = active_conversation(&replay.records);
    let workspace = match &active {
        Some(conv) => conv
            .workspace
            .clone()
            .unwrap_or_else(|| ctx.session.conversation(conv.conversation_id).workspace),
        None => ctx.session.root.clone(),
    };
    let conversation_id = active.map(|conv| conv.conversation_id);

    let params = build_delegation(
        agent.as_str(),
        task,
        &workspace.display().to_string(),
        conversation_id,
    )?;
    debug!(agent = %agent, workspace = %workspace.display(), "delegation prepared");
    Ok(DelegateOutcome {
        task_tool_params: params,
        workspace,
        conversation_id,
        warnings: replay.warnings(),
    })
}
