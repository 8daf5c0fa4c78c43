//! Session orchestration: `asm init` and `asm status`.
//!
//! A session is a directory under `.asm/` holding one Event Log and a tree of
//! conversations. The pointer file selects which session the other commands
//! act on; re-initializing an existing name only re-points it and appends a
//! fresh `initialization` record.

use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::conversation::ConversationId;
use crate::core::permissions::PermissionProfile;
use crate::core::records::{EventRecord, RecordBody, StateChange};
use crate::core::replay::{active_conversation, current_permissions, current_state};
use crate::core::state::{MachineState, SessionMarker};
use crate::error::AsmError;
use crate::io::agents::load_agent_directory;
use crate::io::config::{AsmConfig, load_config};
use crate::io::event_log::{EventLog, LogReplay};
use crate::io::lock::SessionLock;
use crate::io::paths::{AsmPaths, SessionPaths};
use crate::io::pointer::{read_pointer, write_pointer};
use crate::io::workspace::create_session_layout;

/// Resolved paths and configuration for the current session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub asm: AsmPaths,
    pub config: AsmConfig,
    pub session: SessionPaths,
}

impl SessionContext {
    pub fn event_log(&self) -> EventLog {
        EventLog::new(&self.session.log_path)
    }

    pub fn lock(&self) -> Result<SessionLock, AsmError> {
        SessionLock::acquire(&self.session.lock_path, &self.config.lock)
    }

    pub fn replay(&self) -> Result<LogReplay, AsmError> {
        self.event_log().read_all()
    }
}

/// Follow the pointer in `cwd/.asm/` to the current session.
pub fn open_session(cwd: &Path) -> Result<SessionContext, AsmError> {
    let asm = AsmPaths::new(cwd);
    let config = load_config(&asm.config_path)?;
    let root = read_pointer(&asm.pointer_path)?;
    let session = SessionPaths::new(root, &config);
    debug!(session = %session.root.display(), "session resolved");
    Ok(SessionContext {
        asm,
        config,
        session,
    })
}

/// Timestamp for new records and transcript markers.
pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Outcome of `asm init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitOutcome {
    pub session_name: String,
    pub session_path: PathBuf,
    pub reinitialized: bool,
    /// Informational; 0 when no agent list exists.
    pub agent_count: usize,
    pub record: EventRecord,
}

/// Options for [`initialize`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Session directory name under `.asm/`; generated when absent.
    pub name: Option<String>,
    /// Free-form operating mode recorded with the initialization.
    pub mode: Option<String>,
}

impl InitOptions {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            mode: None,
        }
    }
}

/// Create (or re-point to) a session and record its `initialization`.
pub fn initialize(cwd: &Path, options: &InitOptions) -> Result<InitOutcome, AsmError> {
    let asm = AsmPaths::new(cwd);
    let config = load_config(&asm.config_path)?;
    let mode = options
        .mode
        .as_deref()
        .map(validate_mode)
        .transpose()?;
    let session_name = match options.name.as_deref() {
        Some(name) => validate_session_name(name)?,
        None => format!(
            "{}_{}",
            config.session_prefix,
            Local::now().format("%Y%m%d_%H%M%S")
        ),
    };

    let session = SessionPaths::new(asm.session_root(&session_name), &config);
    let log = EventLog::new(&session.log_path);
    let reinitialized = session.log_path.exists();

    create_session_layout(&asm.asm_dir, &session)?;
    let _lock = SessionLock::acquire(&session.lock_path, &config.lock)?;

    let agents = load_agent_directory(&session);
    let mut change = StateChange::new(None, MachineState::Bash, "init");
    change.workspace = Some(session.root.clone());
    change.agent_list_file = agents.list_file.clone();
    change.agent_description_file = agents.description_file.clone();
    change.mode = mode;

    let record = EventRecord {
        timestamp: timestamp_now(),
        session_path: Some(session.display_root()),
        session: Some(SessionMarker::System),
        body: RecordBody::Initialization { data: change },
    };
    log.append(&record)?;
    write_pointer(&asm.pointer_path, &session.root)?;

    info!(
        session = %session.root.display(),
        reinitialized,
        agent_count = agents.count(),
        "session initialized"
    );
    Ok(InitOutcome {
        session_name,
        session_path: session.root,
        reinitialized,
        agent_count: agents.count(),
        record,
    })
}

fn validate_mode(raw: &str) -> Result<String, AsmError> {
    let mode = raw.trim();
    if mode.is_empty() || mode.contains(['\n', '\r']) {
        return Err(AsmError::InvalidInput(
            "mode must be a non-empty single line".to_string(),
        ));
    }
    Ok(mode.to_string())
}

fn validate_session_name(raw: &str) -> Result<String, AsmError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AsmError::InvalidInput(
            "session name must not be empty".to_string(),
        ));
    }
    if name.starts_with('.') || name.contains(['/', '\\']) || name.contains(char::is_control) {
        return Err(AsmError::InvalidInput(format!(
            "session name must be a plain directory name (got {name:?})"
        )));
    }
    Ok(name.to_string())
}

/// Outcome of `asm status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusOutcome {
    pub session_path: PathBuf,
    pub state: MachineState,
    pub previous_state: Option<MachineState>,
    pub session_marker: SessionMarker,
    pub trigger: String,
    pub workspace: PathBuf,
    pub active_conversation: Option<ConversationId>,
    pub permissions: PermissionProfile,
    pub records: usize,
    pub warnings: Vec<String>,
}

/// Replay the current session's log and report derived state.
pub fn status(cwd: &Path) -> Result<StatusOutcome, AsmError> {
    let ctx = open_session(cwd)?;
    let replay = ctx.replay()?;
    let current = current_state(&replay.records)?;
    let audit = current_permissions(&replay.records)?;
    let active = active_conversation(&replay.records);

    let mut warnings = replay.warnings();
    if let Some(warning) = audit.warning(current.state()) {
        warn!(state = %current.state(), "{warning}");
        warnings.push(warning);
    }

    let workspace = active
        .as_ref()
        .and_then(|conv| conv.workspace.clone())
        .unwrap_or_else(|| ctx.session.root.clone());
    Ok(StatusOutcome {
        session_path: ctx.session.root.clone(),
        state: current.state().clone(),
        previous_state: current.change.previous_state.clone(),
        session_marker: current.state().session_marker(),
        trigger: current.change.trigger.clone(),
        workspace,
        active_conversation: active.map(|conv| conv.conversation_id),
        permissions: audit.live,
        records: replay.records.len(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::core::permissions::resolve_permissions;

    #[test]
    fn init_creates_layout_pointer_and_bash_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcome = initialize(temp.path(), &InitOptions::named("demo")).expect("init");

        assert_eq!(outcome.session_path, temp.path().join(".asm").join("demo"));
        assert!(!outcome.reinitialized);
        assert_eq!(outcome.agent_count, 0);
        assert!(outcome.session_path.join("conversations/messages.jsonl").is_file());

        let pointer =
            fs::read_to_string(temp.path().join(".asm/.current_asm_session")).expect("pointer");
        assert_eq!(PathBuf::from(pointer), outcome.session_path);

        let data = outcome.record.state_change().expect("state change");
        assert_eq!(data.state, MachineState::Bash);
        assert_eq!(data.previous_state, None);
        assert_eq!(data.trigger, "init");
        assert_eq!(data.permissions, resolve_permissions(&MachineState::Bash));
        assert_eq!(outcome.record.session, Some(SessionMarker::System));
    }

    #[test]
    fn default_name_uses_prefix_and_timestamp() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcome = initialize(temp.path(), &InitOptions::default()).expect("init");
        assert!(outcome.session_name.starts_with("session_"));
        assert_eq!(outcome.session_name.len(), "session_".len() + 15);
    }

    #[test]
    fn reinit_appends_without_truncating() {
        let temp = tempfile::tempdir().expect("tempdir");
        initialize(temp.path(), &InitOptions::named("demo")).expect("init");
        let again = initialize(temp.path(), &InitOptions::named("demo")).expect("re-init");
        assert!(again.reinitialized);

        let log = EventLog::new(again.session_path.join("state.jsonl"));
        assert_eq!(log.len().expect("len"), 2);
    }

    #[test]
    fn init_records_agent_directory_when_present() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join(".asm").join("demo");
        fs::create_dir_all(&root).expect("mkdir");
        fs::write(root.join("agent-list.txt"), "qa\nwriter\n").expect("write");

        let outcome = initialize(temp.path(), &InitOptions::named("demo")).expect("init");
        assert_eq!(outcome.agent_count, 2);
        let data = outcome.record.state_change().expect("state change");
        assert_eq!(data.agent_list_file, Some(root.join("agent-list.txt")));
        assert_eq!(data.agent_description_file, None);
    }

    #[test]
    fn rejects_path_like_session_names() {
        let temp = tempfile::tempdir().expect("tempdir");
        for name in ["", "../escape", ".hidden", "a/b"] {
            assert!(matches!(
                initialize(temp.path(), &InitOptions::named(name)),
                Err(AsmError::InvalidInput(_))
            ));
        }
        assert!(!temp.path().join(".asm").join(".current_asm_session").exists());
    }

    #[test]
    fn init_records_requested_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let options = InitOptions {
            name: Some("demo".to_string()),
            mode: Some(" orchestrator ".to_string()),
        };
        let outcome = initialize(temp.path(), &options).expect("init");
        let data = outcome.record.state_change().expect("state change");
        assert_eq!(data.mode.as_deref(), Some("orchestrator"));

        let plain = initialize(temp.path(), &InitOptions::named("plain")).expect("init");
        let line = serde_json::to_string(&plain.record).expect("json");
        assert!(!line.contains("\"mode\""));

        let blank = InitOptions {
            name: Some("other".to_string()),
            mode: Some("  ".to_string()),
        };
        assert!(matches!(
            initialize(temp.path(), &blank),
            Err(AsmError::InvalidInput(_))
        ));
    }

    #[test]
    fn status_without_session_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(matches!(status(temp.path()), Err(AsmError::NoActiveSession)));
    }

    #[test]
    fn status_after_init_reports_bash_at_session_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let init = initialize(temp.path(), &InitOptions::named("demo")).expect("init");
        let status = status(temp.path()).expect("status");
        assert_eq!(status.state, MachineState::Bash);
        assert_eq!(status.session_marker, SessionMarker::System);
        assert_eq!(status.workspace, init.session_path);
        assert_eq!(status.active_conversation, None);
        assert!(status.warnings.is_empty());
    }
}
