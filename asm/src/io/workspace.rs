//! Workspace lifecycle: the only module that creates directories.
//!
//! Covers the session skeleton, per-conversation workspaces, transcript
//! writes, and listing the files a conversation produced.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::core::conversation::{ConversationId, CreatedFile};
use crate::error::AsmError;
use crate::io::paths::{ConversationPaths, SessionPaths};

/// Create `.asm/`, the session root, `conversations/` and an empty index.
pub fn create_session_layout(asm_dir: &Path, session: &SessionPaths) -> Result<(), AsmError> {
    create_dir(asm_dir)?;
    ensure_conversation_index(session)
}

/// Make sure `conversations/` and `messages.jsonl` exist without touching
/// existing content.
pub fn ensure_conversation_index(session: &SessionPaths) -> Result<(), AsmError> {
    create_dir(&session.conversations_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&session.index_path)
        .map_err(|err| AsmError::io("create conversation index", &session.index_path, err))?;
    Ok(())
}

/// Next conversation number: one past the larger of the number of `conv_*`
/// directories and the highest number already used on disk or in the log.
pub fn next_conversation_id(
    session: &SessionPaths,
    highest_in_log: u32,
) -> Result<ConversationId, AsmError> {
    let mut count = 0u32;
    let mut highest_on_disk = 0u32;
    for name in conversation_dir_names(&session.conversations_dir)? {
        count += 1;
        if let Ok(id) = name.parse::<ConversationId>() {
            highest_on_disk = highest_on_disk.max(id.number());
        }
    }
    let base = count.max(highest_on_disk).max(highest_in_log);
    base.checked_add(1).map(ConversationId::new).ok_or_else(|| {
        AsmError::InvalidInput(format!(
            "conversation ids are exhausted: conv_{base} is already in use"
        ))
    })
}

/// Create the workspace (and ancestors) and write the transcript header.
pub fn create_conversation(
    session: &SessionPaths,
    id: ConversationId,
    started_at: &str,
) -> Result<ConversationPaths, AsmError> {
    let paths = session.conversation(id);
    create_dir(&paths.workspace)?;
    let header = format!("# Conversation: {id}\n\nStarted: {started_at}\n\n");
    fs::write(&paths.transcript, header)
        .map_err(|err| AsmError::io("write transcript", &paths.transcript, err))?;
    debug!(conversation_id = %id, workspace = %paths.workspace.display(), "conversation workspace created");
    Ok(paths)
}

/// Remove a conversation directory whose start was never recorded. Failure
/// is logged and otherwise ignored.
pub fn discard_conversation(paths: &ConversationPaths) {
    if let Err(err) = fs::remove_dir_all(&paths.dir) {
        warn!(dir = %paths.dir.display(), error = %err, "could not remove unrecorded conversation directory");
    }
}

/// Append the closing marker to a conversation transcript.
pub fn append_transcript_end(
    transcript: &Path,
    ended_at: &str,
    summary: &str,
) -> Result<(), AsmError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(transcript)
        .map_err(|err| AsmError::io("open transcript", transcript, err))?;
    let marker = format!("\n## Conversation Ended: {ended_at}\nSummary: {summary}\n\n");
    file.write_all(marker.as_bytes())
        .map_err(|err| AsmError::io("append transcript", transcript, err))
}

/// Regular files directly inside `workspace`, sorted by path. A missing
/// workspace lists as empty.
pub fn list_workspace_files(workspace: &Path) -> Result<Vec<CreatedFile>, AsmError> {
    let entries = match fs::read_dir(workspace) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(AsmError::io("list workspace", workspace, err)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| AsmError::io("list workspace", workspace, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| AsmError::io("stat workspace entry", entry.path(), err))?;
        if file_type.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths.iter().map(|path| CreatedFile::from_path(path)).collect())
}

fn conversation_dir_names(conversations_dir: &Path) -> Result<Vec<String>, AsmError> {
    let entries = match fs::read_dir(conversations_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(AsmError::io("list conversations", conversations_dir, err)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|err| AsmError::io("list conversations", conversations_dir, err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("conv_") && entry.path().is_dir() {
            names.push(name);
        }
    }
    Ok(names)
}

fn create_dir(path: &Path) -> Result<(), AsmError> {
    fs::create_dir_all(path).map_err(|err| AsmError::io("create directory", path, err))
}
