//! State reconstruction by replaying Event Log records.
//!
//! Every function here is a pure fold over an ordered record slice. Nothing is
//! cached between calls; the log is the only source of truth.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::core::conversation::ConversationId;
use crate::core::permissions::{PermissionProfile, resolve_permissions};
use crate::core::records::{EventRecord, RecordBody, StateChange};
use crate::core::state::MachineState;
use crate::error::AsmError;

/// The latest state record and its position in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentState<'a> {
    pub index: usize,
    pub record: &'a EventRecord,
    pub change: &'a StateChange,
}

impl CurrentState<'_> {
    pub fn state(&self) -> &MachineState {
        &self.change.state
    }
}

/// Live permissions together with the audit comparison against the snapshot
/// embedded in the latest state record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionAudit {
    /// Resolved from the state name; authoritative for enforcement.
    pub live: PermissionProfile,
    /// Snapshot stored in the record; authoritative for audit.
    pub embedded: PermissionProfile,
    pub consistent: bool,
}

impl PermissionAudit {
    pub fn warning(&self, state: &MachineState) -> Option<String> {
        (!self.consistent).then(|| {
            format!("permission snapshot for state '{state}' does not match its resolved profile")
        })
    }
}

/// The most recent unterminated conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveConversation {
    pub conversation_id: ConversationId,
    pub workspace: Option<PathBuf>,
}

/// Latest `initialization`/`transition` record, or `NoActiveSession` when the
/// log holds none.
pub fn current_state(records: &[EventRecord]) -> Result<CurrentState<'_>, AsmError> {
    records
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, record)| {
            record.state_change().map(|change| CurrentState {
                index,
                record,
                change,
            })
        })
        .ok_or(AsmError::NoActiveSession)
}

/// Resolve live permissions for the current state and compare them with the
/// embedded snapshot.
pub fn current_permissions(records: &[EventRecord]) -> Result<PermissionAudit, AsmError> {
    let current = current_state(records)?;
    let live = resolve_permissions(current.state());
    let embedded = current.change.permissions.clone();
    let consistent = live.same_rules(&embedded);
    Ok(PermissionAudit {
        live,
        embedded,
        consistent,
    })
}

/// Find the active conversation in two passes: collect every ended id, then
/// scan backwards for the first start not in that set.
///
/// Older unterminated conversations superseded by a newer start are treated
/// as abandoned and never reported.
pub fn active_conversation(records: &[EventRecord]) -> Option<ActiveConversation> {
    let ended: HashSet<ConversationId> = records
        .iter()
        .filter_map(|record| match &record.body {
            RecordBody::ConversationEnd { conversation_id } => Some(*conversation_id),
            _ => None,
        })
        .collect();

    records.iter().rev().find_map(|record| match &record.body {
        RecordBody::ConversationStart {
            conversation_id,
            workspace,
        } if !ended.contains(conversation_id) => Some(ActiveConversation {
            conversation_id: *conversation_id,
            workspace: workspace.clone(),
        }),
        _ => None,
    })
}

/// Agent states entered by `transition` records between the conversation's
/// start and its end (or the end of the log while it is still open).
pub fn agents_used_in_conversation(
    records: &[EventRecord],
    conversation_id: ConversationId,
) -> BTreeSet<String> {
    let mut agents = BTreeSet::new();
    let Some(start) = records.iter().position(|record| {
        matches!(
            &record.body,
            RecordBody::ConversationStart { conversation_id: id, .. } if *id == conversation_id
        )
    }) else {
        return agents;
    };

    for record in &records[start + 1..] {
        match &record.body {
            RecordBody::ConversationEnd { conversation_id: id } if *id == conversation_id => break,
            RecordBody::Transition { data } if data.state.is_agent() => {
                agents.insert(data.state.as_str().to_string());
            }
            _ => {}
        }
    }
    agents
}

/// Highest conversation number referenced anywhere in the log.
pub fn highest_conversation_number(records: &[EventRecord]) -> u32 {
    records
        .iter()
        .filter_map(|record| match &record.body {
            RecordBody::ConversationStart {
                conversation_id, ..
            }
            | RecordBody::ConversationEnd { conversation_id } => Some(conversation_id.number()),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}
