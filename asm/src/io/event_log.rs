//! Append-only Event Log storage (`state.jsonl`).
//!
//! Read policy: the last non-blank line must parse, because it can define
//! current state; interior lines are parsed best-effort and every failure is
//! logged and reported back in [`LogReplay::skipped`].

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::records::{EventRecord, parse_record};
use crate::error::AsmError;

/// An interior line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-indexed line number in the file.
    pub line: usize,
    pub reason: String,
}

/// Result of reading the whole log.
#[derive(Debug, Clone, Default)]
pub struct LogReplay {
    pub records: Vec<EventRecord>,
    pub skipped: Vec<SkippedLine>,
}

impl LogReplay {
    pub fn warnings(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|skip| format!("skipped unparsable log line {}: {}", skip.line, skip.reason))
            .collect()
    }
}

/// Handle to one session's Event Log.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single self-contained line.
    pub fn append(&self, record: &EventRecord) -> Result<(), AsmError> {
        let line = serde_json::to_string(record).map_err(|source| AsmError::Serialize {
            what: "event record",
            source,
        })?;
        append_line(&self.path, &line, "append event log")?;
        debug!(path = %self.path.display(), kind = record.kind(), "event appended");
        Ok(())
    }

    /// Re-read the full file. A missing file reads as an empty log.
    pub fn read_all(&self) -> Result<LogReplay, AsmError> {
        match read_bytes(&self.path, "read event log")? {
            Some(bytes) => parse_log(&self.path, &bytes),
            None => Ok(LogReplay::default()),
        }
    }

    /// Number of non-blank lines currently in the log.
    pub fn len(&self) -> Result<usize, AsmError> {
        Ok(read_bytes(&self.path, "read event log")?
            .map_or(0, |bytes| split_lines(&bytes).len()))
    }

    pub fn is_empty(&self) -> Result<bool, AsmError> {
        Ok(self.len()? == 0)
    }
}

/// Apply the strict-last / lenient-interior policy to raw log contents.
///
/// A line that is not valid UTF-8 is treated like any other unparsable line.
pub fn parse_log(path: &Path, contents: &[u8]) -> Result<LogReplay, AsmError> {
    let lines = split_lines(contents);

    let mut replay = LogReplay::default();
    let last = lines.len().saturating_sub(1);
    for (pos, (line_no, line)) in lines.into_iter().enumerate() {
        let parsed = line.and_then(|line| parse_record(line).map_err(|err| err.to_string()));
        match parsed {
            Ok(record) => replay.records.push(record),
            Err(reason) if pos == last => {
                return Err(AsmError::CorruptLog {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason,
                });
            }
            Err(reason) => {
                warn!(path = %path.display(), line = line_no, error = %reason, "skipping unparsable log line");
                replay.skipped.push(SkippedLine {
                    line: line_no,
                    reason,
                });
            }
        }
    }
    Ok(replay)
}

/// Non-blank lines of a JSONL file with their 1-indexed line numbers, each
/// decoded on its own so one bad byte sequence only affects its line.
pub(crate) fn split_lines(contents: &[u8]) -> Vec<(usize, Result<&str, String>)> {
    contents
        .split(|byte| *byte == b'\n')
        .enumerate()
        .map(|(idx, raw)| (idx + 1, raw.trim_ascii()))
        .filter(|(_, raw)| !raw.is_empty())
        .map(|(line_no, raw)| {
            let line = std::str::from_utf8(raw).map_err(|err| format!("invalid UTF-8: {err}"));
            (line_no, line)
        })
        .collect()
}

/// Whole file contents, or `None` when it does not exist.
pub(crate) fn read_bytes(path: &Path, op: &'static str) -> Result<Option<Vec<u8>>, AsmError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(AsmError::io(op, path, err)),
    }
}

/// Append `line` and a newline to a JSONL file, creating it if needed.
///
/// If the file's last line lost its newline in an interrupted write, the
/// newline is restored first so the new line never merges into it.
pub(crate) fn append_line(path: &Path, line: &str, op: &'static str) -> Result<(), AsmError> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|err| AsmError::io(op, path, err))?;
    let len = file
        .metadata()
        .map_err(|err| AsmError::io(op, path, err))?
        .len();

    let mut buf = Vec::with_capacity(line.len() + 2);
    if len > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|err| AsmError::io(op, path, err))?;
        if last[0] != b'\n' {
            warn!(path = %path.display(), "restoring missing newline before append");
            buf.push(b'\n');
        }
    }
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    file.write_all(&buf)
        .map_err(|err| AsmError::io(op, path, err))
}
