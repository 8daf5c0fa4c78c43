//! `asm transition <state> [trigger]`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::core::conversation::ConversationId;
use crate::core::permissions::PermissionProfile;
use crate::core::records::{EventRecord, RecordBody, StateChange};
use crate::core::replay::{active_conversation, current_state};
use crate::core::state::{MachineState, SessionMarker};
use crate::error::AsmError;
use crate::session::{open_session, timestamp_now};

/// Outcome of a recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub previous_state: MachineState,
    pub state: MachineState,
    pub trigger: String,
    pub session_marker: SessionMarker,
    pub workspace: PathBuf,
    pub conversation_id: Option<ConversationId>,
    pub permissions: PermissionProfile,
    pub warnings: Vec<String>,
}

/// Append a `transition` record moving the session into `target`.
///
/// Any name is accepted; `BASH` and `MAIN` carry their reserved semantics and
/// everything else is an agent. The record's workspace is the active
/// conversation's, or the session root when none is open.
pub fn transition(cwd: &Path, target: &str, trigger: &str) -> Result<TransitionOutcome, AsmError> {
    let target = MachineState::parse_target(target)?;
    let ctx = open_session(cwd)?;
    let _lock = ctx.lock()?;

    let replay = ctx.replay()?;
    let previous = current_state(&replay.records)?.state().clone();
    let active = active_conversation(&replay.records);

    let mut change = StateChange::new(Some(previous.clone()), target.clone(), trigger);
    let workspace = match &active {
        Some(conv) => {
            change.dialogue_path = Some(ctx.session.conversation(conv.conversation_id).transcript);
            conv.workspace
                .clone()
                .unwrap_or_else(|| ctx.session.conversation(conv.conversation_id).workspace)
        }
        None => ctx.session.root.clone(),
    };
    change.workspace = Some(workspace.clone());
    let permissions = change.permissions.clone();

    let record = EventRecord {
        timestamp: timestamp_now(),
        session_path: Some(ctx.session.display_root()),
        session: Some(target.session_marker()),
        body: RecordBody::Transition { data: change },
    };
    ctx.event_log().append(&record)?;

    info!(from = %previous, to = %target, trigger, session = target.session_marker().as_str(), "state transition recorded");
    Ok(TransitionOutcome {
        previous_state: previous,
        session_marker: target.session_marker(),
        state: target,
        trigger: trigger.to_string(),
        workspace,
        conversation_id: active.map(|conv| conv.conversation_id),
        permissions,
        warnings: replay.warnings(),
    })
}
