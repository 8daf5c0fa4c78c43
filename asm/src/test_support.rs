//! Test-only helpers for building Event Log records and session fixtures.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::conversation::ConversationId;
use crate::core::records::{EventRecord, RecordBody, StateChange};
use crate::core::state::{MachineState, SessionMarker};
use crate::io::event_log::EventLog;
use crate::session::{InitOptions, initialize};

const SESSION_ROOT: &str = "/tmp/.asm/demo";
const TIMESTAMP: &str = "2025-09-18T08:10:09.000000Z";

/// `initialization` record entering `BASH`.
pub fn initialization() -> EventRecord {
    EventRecord {
        timestamp: TIMESTAMP.to_string(),
        session_path: Some(SESSION_ROOT.to_string()),
        session: Some(SessionMarker::System),
        body: RecordBody::Initialization {
            data: StateChange::new(None, MachineState::Bash, "init"),
        },
    }
}

/// `transition` record from `previous` into the state named `target`.
pub fn transition(previous: MachineState, target: &str, trigger: &str) -> EventRecord {
    let state = MachineState::from_name(target);
    EventRecord {
        timestamp: TIMESTAMP.to_string(),
        session_path: Some(SESSION_ROOT.to_string()),
        session: Some(state.session_marker()),
        body: RecordBody::Transition {
            data: StateChange::new(Some(previous), state, trigger),
        },
    }
}

pub fn conv_start(number: u32) -> EventRecord {
    let id = ConversationId::new(number);
    EventRecord {
        timestamp: TIMESTAMP.to_string(),
        session_path: None,
        session: None,
        body: RecordBody::ConversationStart {
            conversation_id: id,
            workspace: Some(
                PathBuf::from(SESSION_ROOT)
                    .join("conversations")
                    .join(id.to_string())
                    .join("outputs"),
            ),
        },
    }
}

pub fn conv_end(number: u32) -> EventRecord {
    EventRecord {
        timestamp: TIMESTAMP.to_string(),
        session_path: None,
        session: None,
        body: RecordBody::ConversationEnd {
            conversation_id: ConversationId::new(number),
        },
    }
}

/// A temporary working directory with an initialized session named `demo`.
pub struct TestSession {
    dir: TempDir,
    root: PathBuf,
}

impl TestSession {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = initialize(dir.path(), &InitOptions::named("demo")).expect("init session");
        Self {
            root: outcome.session_path,
            dir,
        }
    }

    /// Working directory to pass to operations.
    pub fn cwd(&self) -> &Path {
        self.dir.path()
    }

    /// Session root (`<cwd>/.asm/demo`).
    pub fn root(&self) -> PathBuf {
        self.root.clone()
    }

    /// Every parsable record currently in the Event Log.
    pub fn records(&self) -> Vec<EventRecord> {
        EventLog::new(self.root.join("state.jsonl"))
            .read_all()
            .expect("read event log")
            .records
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}
