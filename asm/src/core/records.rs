//! Event Log record model.
//!
//! Two payload shapes share one line format. State records nest their payload
//! under `data`; conversation records keep `conversation_id` (and `workspace`)
//! at the top level:
//!
//! ```text
//! {"timestamp": .., "type": "transition", "session_path": .., "session": "dialogue",
//!  "data": {"previous_state": "BASH", "state": "MAIN", "trigger": .., "permissions": {..}}}
//! {"timestamp": .., "type": "conversation_start", "conversation_id": "conv_001", "workspace": ..}
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::conversation::ConversationId;
use crate::core::permissions::{PermissionProfile, resolve_permissions};
use crate::core::state::{MachineState, SessionMarker, optional_state};

/// One line of the Event Log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// ISO-8601 timestamp. Kept verbatim so legacy naive timestamps survive.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionMarker>,
    #[serde(flatten)]
    pub body: RecordBody,
}

/// Record payload, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordBody {
    Initialization {
        data: StateChange,
    },
    Transition {
        data: StateChange,
    },
    ConversationStart {
        conversation_id: ConversationId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workspace: Option<PathBuf>,
    },
    ConversationEnd {
        conversation_id: ConversationId,
    },
}

/// Payload of `initialization` and `transition` records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    #[serde(default, with = "optional_state")]
    pub previous_state: Option<MachineState>,
    pub state: MachineState,
    #[serde(default)]
    pub trigger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_list_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_description_file: Option<PathBuf>,
    /// Operating mode requested at `init` (e.g. `orchestrator`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Snapshot of the profile in force, kept for audit replay.
    pub permissions: PermissionProfile,
}

impl StateChange {
    /// Build a state change whose permission snapshot is resolved from `state`.
    pub fn new(previous_state: Option<MachineState>, state: MachineState, trigger: &str) -> Self {
        let permissions = resolve_permissions(&state);
        Self {
            previous_state,
            state,
            trigger: trigger.to_string(),
            workspace: None,
            dialogue_path: None,
            agent_list_file: None,
            agent_description_file: None,
            mode: None,
            permissions,
        }
    }
}

impl EventRecord {
    /// State payload for `initialization`/`transition` records.
    pub fn state_change(&self) -> Option<&StateChange> {
        match &self.body {
            RecordBody::Initialization { data } | RecordBody::Transition { data } => Some(data),
            _ => None,
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self.body, RecordBody::Transition { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self.body {
            RecordBody::Initialization { .. } => "initialization",
            RecordBody::Transition { .. } => "transition",
            RecordBody::ConversationStart { .. } => "conversation_start",
            RecordBody::ConversationEnd { .. } => "conversation_end",
        }
    }
}

/// Parse a single log line.
pub fn parse_record(line: &str) -> Result<EventRecord, serde_json::Error> {
    serde_json::from_str(line)
}
