//! Conversation identifiers and Conversation Index records.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const PREFIX: &str = "conv_";

/// Sequential conversation id, rendered as `conv_NNN` (zero-padded to 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(u32);

impl ConversationId {
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{:03}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let digits = raw
            .strip_prefix(PREFIX)
            .ok_or_else(|| format!("conversation id must start with '{PREFIX}' (got '{raw}')"))?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("conversation id must end in digits (got '{raw}')"));
        }
        digits
            .parse::<u32>()
            .map(ConversationId)
            .map_err(|err| format!("conversation id '{raw}': {err}"))
    }
}

impl Serialize for ConversationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A file found in a conversation workspace at end time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedFile {
    pub path: String,
    pub kind: String,
    /// Free-text description, only present on externally logged entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl CreatedFile {
    pub fn from_path(path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            kind: file_kind(path),
            summary: None,
        }
    }
}

/// Summary emitted once per ended conversation into `messages.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub timestamp: String,
    pub summary: String,
    #[serde(default)]
    pub files_created: Vec<CreatedFile>,
    /// Agent states visited during the conversation, sorted.
    #[serde(default)]
    pub agents_used: Vec<String>,
}

/// Derive a file kind from its extension; no extension yields `"unknown"`.
pub fn file_kind(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
