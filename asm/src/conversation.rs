//! Conversation orchestration: start, end, external logging, and history.
//!
//! Ending a conversation touches three append-only files. They cannot be
//! updated atomically together, so the steps run in a fixed order
//! (index, Event Log, transcript) and the first failure after any step has
//! taken effect is reported as [`AsmError::PartialCompletion`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::core::conversation::{ConversationId, ConversationSummary};
use crate::core::records::{EventRecord, RecordBody};
use crate::core::replay::{
    active_conversation, agents_used_in_conversation, current_state, highest_conversation_number,
};
use crate::error::{AsmError, Step};
use crate::io::config::AsmConfig;
use crate::io::conversation_index::{ConversationIndex, parse_log_request};
use crate::io::lock::SessionLock;
use crate::io::paths::SessionPaths;
use crate::io::workspace::{
    append_transcript_end, create_conversation, discard_conversation, ensure_conversation_index,
    list_workspace_files, next_conversation_id,
};
use crate::session::{open_session, timestamp_now};

/// Outcome of `asm conv-start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    pub conversation_id: ConversationId,
    pub workspace: PathBuf,
    pub transcript: PathBuf,
    pub started_at: String,
    /// Still-open conversation that this start leaves abandoned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded: Option<ConversationId>,
    pub warnings: Vec<String>,
}

/// Allocate the next conversation id, create its workspace and transcript,
/// and append `conversation_start`.
pub fn start_conversation(cwd: &Path) -> Result<StartOutcome, AsmError> {
    let ctx = open_session(cwd)?;
    let _lock = ctx.lock()?;

    let replay = ctx.replay()?;
    current_state(&replay.records)?;
    let mut warnings = replay.warnings();
    let superseded = active_conversation(&replay.records).map(|conv| conv.conversation_id);
    if let Some(open) = superseded {
        let warning = format!("conversation {open} was never ended and is now abandoned");
        warn!(conversation_id = %open, "{warning}");
        warnings.push(warning);
    }

    let id = next_conversation_id(&ctx.session, highest_conversation_number(&replay.records))?;
    let started_at = timestamp_now();
    let paths = create_conversation(&ctx.session, id, &started_at)?;

    let record = EventRecord {
        timestamp: started_at.clone(),
        session_path: None,
        session: None,
        body: RecordBody::ConversationStart {
            conversation_id: id,
            workspace: Some(paths.workspace.clone()),
        },
    };
    if let Err(err) = ctx.event_log().append(&record) {
        discard_conversation(&paths);
        return Err(err);
    }

    info!(conversation_id = %id, workspace = %paths.workspace.display(), "conversation started");
    Ok(StartOutcome {
        conversation_id: id,
        workspace: paths.workspace,
        transcript: paths.transcript,
        started_at,
        superseded,
        warnings,
    })
}

/// Outcome of `asm conv-end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndOutcome {
    pub conversation_id: ConversationId,
    pub entry: ConversationSummary,
    pub transcript: PathBuf,
    pub warnings: Vec<String>,
}

/// Close the active conversation.
///
/// Fails with `NoActiveConversation` (and appends nothing) when every start in
/// the log already has a matching end. A blank summary is recorded as the
/// configured default.
pub fn end_conversation(cwd: &Path, summary: &str) -> Result<EndOutcome, AsmError> {
    let ctx = open_session(cwd)?;
    let _lock = ctx.lock()?;

    let replay = ctx.replay()?;
    current_state(&replay.records)?;
    let active = active_conversation(&replay.records).ok_or(AsmError::NoActiveConversation)?;
    let id = active.conversation_id;
    let paths = ctx.session.conversation(id);
    let workspace = active.workspace.unwrap_or_else(|| paths.workspace.clone());

    let files_created = list_workspace_files(&workspace)?;
    let agents_used = agents_used_in_conversation(&replay.records, id)
        .into_iter()
        .collect();
    let summary = match summary.trim() {
        "" => ctx.config.default_summary.clone(),
        text => text.to_string(),
    };
    let ended_at = timestamp_now();
    let entry = ConversationSummary {
        conversation_id: id,
        timestamp: ended_at.clone(),
        summary,
        files_created,
        agents_used,
    };
    let record = EventRecord {
        timestamp: ended_at.clone(),
        session_path: None,
        session: None,
        body: RecordBody::ConversationEnd {
            conversation_id: id,
        },
    };

    let index = ConversationIndex::new(&ctx.session.index_path);
    let log = ctx.event_log();
    let mut completed = Vec::new();
    run_step(Step::IndexAppend, &mut completed, || index.append(&entry))?;
    run_step(Step::LogAppend, &mut completed, || log.append(&record))?;
    run_step(Step::TranscriptAppend, &mut completed, || {
        append_transcript_end(&paths.transcript, &ended_at, &entry.summary)
    })?;

    info!(
        conversation_id = %id,
        files = entry.files_created.len(),
        agents = entry.agents_used.len(),
        "conversation ended"
    );
    Ok(EndOutcome {
        conversation_id: id,
        entry,
        transcript: paths.transcript,
        warnings: replay.warnings(),
    })
}

/// Run one side effect of `end_conversation`. A failure before anything took
/// effect is returned as-is; later failures carry the completed steps.
fn run_step(
    step: Step,
    completed: &mut Vec<Step>,
    action: impl FnOnce() -> Result<(), AsmError>,
) -> Result<(), AsmError> {
    match action() {
        Ok(()) => {
            completed.push(step);
            Ok(())
        }
        Err(err) if completed.is_empty() => Err(err),
        Err(err) => {
            warn!(failed = %step, completed = completed.len(), error = %err, "conversation end partially applied");
            Err(AsmError::PartialCompletion {
                failed: step,
                completed: completed.clone(),
                source: Box::new(err),
            })
        }
    }
}

/// Outcome of `asm log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogOutcome {
    pub session_path: PathBuf,
    pub index_path: PathBuf,
    pub conversation_id: ConversationId,
}

/// Append an externally supplied summary to the named session's index.
///
/// The Event Log is not touched. The session root must already exist.
pub fn log_conversation(input: &str) -> Result<LogOutcome, AsmError> {
    let request = parse_log_request(input)?;
    if !request.session_path.is_dir() {
        return Err(AsmError::InvalidInput(format!(
            "session_path {} is not a directory",
            request.session_path.display()
        )));
    }

    let config = AsmConfig::default();
    let session = SessionPaths::new(&request.session_path, &config);
    ensure_conversation_index(&session)?;
    let _lock = SessionLock::acquire(&session.lock_path, &config.lock)?;
    ConversationIndex::new(&session.index_path).append(&request.entry)?;

    info!(conversation_id = %request.entry.conversation_id, index = %session.index_path.display(), "external conversation logged");
    Ok(LogOutcome {
        session_path: session.root,
        index_path: session.index_path,
        conversation_id: request.entry.conversation_id,
    })
}

/// Outcome of `asm history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryOutcome {
    pub session_path: PathBuf,
    pub conversations: Vec<ConversationSummary>,
    pub warnings: Vec<String>,
}

pub fn history(cwd: &Path) -> Result<HistoryOutcome, AsmError> {
    let ctx = open_session(cwd)?;
    let replay = ConversationIndex::new(&ctx.session.index_path).read_all()?;
    Ok(HistoryOutcome {
        warnings: replay.warnings(),
        conversations: replay.entries,
        session_path: ctx.session.root,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::io::event_log::EventLog;
    use crate::test_support::TestSession;
    use crate::transition::transition;

    #[test]
    fn start_allocates_sequential_ids_with_workspace() {
        let session = TestSession::new();
        let first = start_conversation(session.cwd()).expect("start");
        assert_eq!(first.conversation_id.to_string(), "conv_001");
        assert!(first.workspace.is_dir());
        assert!(first.transcript.is_file());
        assert_eq!(first.superseded, None);

        end_conversation(session.cwd(), "done").expect("end");
        let second = start_conversation(session.cwd()).expect("start");
        assert_eq!(second.conversation_id.to_string(), "conv_002");
    }

    #[test]
    fn start_over_open_conversation_reports_superseded() {
        let session = TestSession::new();
        start_conversation(session.cwd()).expect("start");
        let second = start_conversation(session.cwd()).expect("start");
        assert_eq!(second.superseded, Some(ConversationId::new(1)));
        assert_eq!(second.warnings.len(), 1);

        let ended = end_conversation(session.cwd(), "x").expect("end");
        assert_eq!(ended.conversation_id, ConversationId::new(2));
    }

    #[test]
    fn start_after_highest_possible_id_fails_cleanly() {
        let session = TestSession::new();
        let log = EventLog::new(session.root().join("state.jsonl"));
        let last: ConversationId = "conv_4294967295".parse().expect("id");
        for body in [
            RecordBody::ConversationStart {
                conversation_id: last,
                workspace: None,
            },
            RecordBody::ConversationEnd {
                conversation_id: last,
            },
        ] {
            log.append(&EventRecord {
                timestamp: timestamp_now(),
                session_path: None,
                session: None,
                body,
            })
            .expect("append");
        }
        let before = log.len().expect("len");

        assert!(matches!(
            start_conversation(session.cwd()),
            Err(AsmError::InvalidInput(_))
        ));
        assert_eq!(log.len().expect("len"), before);
        let dirs = fs::read_dir(session.root().join("conversations"))
            .expect("list")
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .count();
        assert_eq!(dirs, 0);
    }

    #[test]
    fn end_collects_files_agents_and_default_summary() {
        let session = TestSession::new();
        transition(session.cwd(), "MAIN", "init_done").expect("main");
        let started = start_conversation(session.cwd()).expect("start");
        transition(session.cwd(), "data-engineer", "delegate").expect("agent");
        fs::write(started.workspace.join("report.csv"), "a,b\n").expect("write");
        transition(session.cwd(), "MAIN", "done").expect("main");

        let ended = end_conversation(session.cwd(), "   ").expect("end");
        assert_eq!(ended.entry.summary, "Conversation completed");
        assert_eq!(ended.entry.agents_used, vec!["data-engineer".to_string()]);
        assert_eq!(ended.entry.files_created.len(), 1);
        assert_eq!(ended.entry.files_created[0].kind, "csv");

        let transcript = fs::read_to_string(&ended.transcript).expect("transcript");
        assert!(transcript.contains("Summary: Conversation completed"));
    }

    #[test]
    fn end_without_start_leaves_log_unchanged() {
        let session = TestSession::new();
        let log = EventLog::new(session.root().join("state.jsonl"));
        let before = log.len().expect("len");
        assert!(matches!(
            end_conversation(session.cwd(), "nothing"),
            Err(AsmError::NoActiveConversation)
        ));
        assert_eq!(log.len().expect("len"), before);
    }

    #[test]
    fn failed_transcript_append_is_partial_completion() {
        let session = TestSession::new();
        let started = start_conversation(session.cwd()).expect("start");
        fs::remove_file(&started.transcript).expect("rm transcript");
        fs::create_dir(&started.transcript).expect("block transcript path");

        let err = end_conversation(session.cwd(), "x").unwrap_err();
        match err {
            AsmError::PartialCompletion {
                failed, completed, ..
            } => {
                assert_eq!(failed, Step::TranscriptAppend);
                assert_eq!(completed, vec![Step::IndexAppend, Step::LogAppend]);
            }
            other => panic!("expected partial completion, got {other:?}"),
        }
        assert!(active_conversation(&session.records()).is_none());
    }

    #[test]
    fn first_step_failure_is_not_partial() {
        let mut completed = Vec::new();
        let err = run_step(Step::IndexAppend, &mut completed, || {
            Err(AsmError::InvalidInput("boom".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, AsmError::InvalidInput(_)));
        assert!(completed.is_empty());
    }

    #[test]
    fn log_then_history_round_trip() {
        let session = TestSession::new();
        let input = serde_json::json!({
            "session_path": session.root(),
            "conversation_data": {
                "conversation_id": "conv_009",
                "timestamp": "2025-09-18T08:10:09",
                "summary": "Imported",
                "files_created": [{"path": "/w/notes.txt"}],
                "agents_used": ["writer"]
            }
        })
        .to_string();

        let logged = log_conversation(&input).expect("log");
        assert_eq!(logged.conversation_id, ConversationId::new(9));
        let log_len = EventLog::new(session.root().join("state.jsonl"))
            .len()
            .expect("len");
        assert_eq!(log_len, 1);

        let history = history(session.cwd()).expect("history");
        assert_eq!(history.conversations.len(), 1);
        assert_eq!(history.conversations[0].summary, "Imported");
        assert_eq!(history.conversations[0].files_created[0].kind, "txt");
    }

    #[test]
    fn log_rejects_missing_session_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = serde_json::json!({
            "session_path": temp.path().join("nope"),
            "conversation_data": {"conversation_id": "conv_001", "timestamp": "t", "summary": "s"}
        })
        .to_string();
        assert!(matches!(
            log_conversation(&input),
            Err(AsmError::InvalidInput(_))
        ));
    }
}
