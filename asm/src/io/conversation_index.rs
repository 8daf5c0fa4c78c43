//! Conversation Index storage (`conversations/messages.jsonl`).
//!
//! Unlike the Event Log, nothing is derived from the last line here, so every
//! line is read best-effort and failures come back as [`SkippedLine`]s.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use jsonschema::validator_for;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::conversation::{ConversationId, ConversationSummary, CreatedFile, file_kind};
use crate::error::AsmError;
use crate::io::event_log::{SkippedLine, append_line, read_bytes, split_lines};

const LOG_REQUEST_SCHEMA: &str =
    include_str!("../../schemas/conversation_entry.schema.json");

/// Index entries plus any lines that failed to parse.
#[derive(Debug, Clone, Default)]
pub struct IndexReplay {
    pub entries: Vec<ConversationSummary>,
    pub skipped: Vec<SkippedLine>,
}

impl IndexReplay {
    pub fn warnings(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|skip| format!("skipped unparsable index line {}: {}", skip.line, skip.reason))
            .collect()
    }
}

/// Handle to one session's Conversation Index.
#[derive(Debug, Clone)]
pub struct ConversationIndex {
    path: PathBuf,
}

impl ConversationIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &ConversationSummary) -> Result<(), AsmError> {
        let line = serde_json::to_string(entry).map_err(|source| AsmError::Serialize {
            what: "conversation summary",
            source,
        })?;
        append_line(&self.path, &line, "append conversation index")?;
        debug!(path = %self.path.display(), conversation_id = %entry.conversation_id, "index entry appended");
        Ok(())
    }

    pub fn read_all(&self) -> Result<IndexReplay, AsmError> {
        let Some(contents) = read_bytes(&self.path, "read conversation index")? else {
            return Ok(IndexReplay::default());
        };

        let mut replay = IndexReplay::default();
        for (line_no, line) in split_lines(&contents) {
            let parsed = line.and_then(|line| {
                serde_json::from_str::<ConversationSummary>(line).map_err(|err| err.to_string())
            });
            match parsed {
                Ok(entry) => replay.entries.push(entry),
                Err(reason) => {
                    warn!(path = %self.path.display(), line = line_no, error = %reason, "skipping unparsable index line");
                    replay.skipped.push(SkippedLine {
                        line: line_no,
                        reason,
                    });
                }
            }
        }
        Ok(replay)
    }
}

/// A validated external request to record a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub session_path: PathBuf,
    pub entry: ConversationSummary,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    session_path: PathBuf,
    conversation_data: RawEntry,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    conversation_id: ConversationId,
    timestamp: String,
    summary: String,
    #[serde(default)]
    files_created: Vec<RawFile>,
    #[serde(default)]
    agents_used: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    path: String,
    kind: Option<String>,
    summary: Option<String>,
}

/// Parse and schema-check a `{session_path, conversation_data}` document.
pub fn parse_log_request(input: &str) -> Result<LogRequest, AsmError> {
    let instance: Value = serde_json::from_str(input)
        .map_err(|err| AsmError::InvalidInput(format!("log request is not valid JSON: {err}")))?;

    let schema: Value = serde_json::from_str(LOG_REQUEST_SCHEMA)
        .map_err(|err| anyhow!("parse conversation entry schema: {err}"))?;
    let validator =
        validator_for(&schema).map_err(|err| anyhow!("invalid conversation entry schema: {err}"))?;
    let messages = validator
        .iter_errors(&instance)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    if !messages.is_empty() {
        return Err(AsmError::InvalidInput(format!(
            "log request failed schema validation: {}",
            messages.join("; ")
        )));
    }

    let raw: RawRequest = serde_json::from_value(instance)
        .map_err(|err| AsmError::InvalidInput(format!("log request: {err}")))?;
    let data = raw.conversation_data;
    let files_created = data
        .files_created
        .into_iter()
        .map(|file| CreatedFile {
            kind: file
                .kind
                .unwrap_or_else(|| file_kind(Path::new(&file.path))),
            path: file.path,
            summary: file.summary,
        })
        .collect();

    Ok(LogRequest {
        session_path: raw.session_path,
        entry: ConversationSummary {
            conversation_id: data.conversation_id,
            timestamp: data.timestamp,
            summary: data.summary,
            files_created,
            agents_used: data.agents_used,
        },
    })
}
