//! Machine states and session markers.
//!
//! A machine state is one of two reserved names (`BASH`, `MAIN`) or any other
//! name, which denotes an agent. The state machine does not gate which agent
//! may be entered; it only decides which capability category applies.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AsmError;

pub const BASH: &str = "BASH";
pub const MAIN: &str = "MAIN";

/// Current capability context of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MachineState {
    /// System/initialization context.
    Bash,
    /// Interactive dialogue context (restricted).
    Main,
    /// Delegated execution inside a named agent.
    Agent(String),
}

impl MachineState {
    /// Map a raw state name to its variant. Total: every string is a state.
    pub fn from_name(name: &str) -> Self {
        match name {
            BASH => MachineState::Bash,
            MAIN => MachineState::Main,
            other => MachineState::Agent(other.to_string()),
        }
    }

    /// Parse a user-supplied target state, rejecting names that cannot be
    /// stored as a single log field.
    pub fn parse_target(name: &str) -> Result<Self, AsmError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AsmError::InvalidInput(
                "state name must not be empty".to_string(),
            ));
        }
        if trimmed.contains(['\n', '\r']) {
            return Err(AsmError::InvalidInput(format!(
                "state name must be a single line (got {trimmed:?})"
            )));
        }
        Ok(Self::from_name(trimmed))
    }

    pub fn as_str(&self) -> &str {
        match self {
            MachineState::Bash => BASH,
            MachineState::Main => MAIN,
            MachineState::Agent(name) => name,
        }
    }

    pub fn is_agent(&self) -> bool {
        matches!(self, MachineState::Agent(_))
    }

    /// Kind of activity a record in this state describes.
    pub fn session_marker(&self) -> SessionMarker {
        match self {
            MachineState::Bash => SessionMarker::System,
            MachineState::Main => SessionMarker::Dialogue,
            MachineState::Agent(_) => SessionMarker::Execution,
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MachineState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MachineState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MachineState::from_name(&raw))
    }
}

/// Kind of activity a log record describes (not the session entity itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMarker {
    System,
    Dialogue,
    Execution,
}

impl SessionMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMarker::System => "system",
            SessionMarker::Dialogue => "dialogue",
            SessionMarker::Execution => "execution",
        }
    }
}

/// Serde helper for `previous_state`, which is stored as `""` when absent.
pub mod optional_state {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::MachineState;

    pub fn serialize<S: Serializer>(
        value: &Option<MachineState>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_ref().map(MachineState::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<MachineState>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .filter(|name| !name.is_empty())
            .map(|name| MachineState::from_name(&name)))
    }
}
