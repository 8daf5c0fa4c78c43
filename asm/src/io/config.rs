//! Configuration stored under `.asm/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// asm configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AsmConfig {
    /// Prefix for generated session names (`<prefix>_<YYYYmmdd_HHMMSS>`).
    pub session_prefix: String,

    /// Summary recorded when a conversation is ended without one.
    pub default_summary: String,

    pub lock: LockConfig,

    pub agents: AgentsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LockConfig {
    /// Give up waiting for the session lock after this many milliseconds.
    pub timeout_ms: u64,
    /// Delay between lock attempts.
    pub poll_interval_ms: u64,
}

/// Locations of the externally generated agent directory, relative to the
/// session root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentsConfig {
    pub list_file: String,
    pub directory_file: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            poll_interval_ms: 25,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            list_file: "agent-list.txt".to_string(),
            directory_file: "AGENT_DIRECTORY.md".to_string(),
        }
    }
}

impl Default for AsmConfig {
    fn default() -> Self {
        Self {
            session_prefix: "session".to_string(),
            default_summary: "Conversation completed".to_string(),
            lock: LockConfig::default(),
            agents: AgentsConfig::default(),
        }
    }
}

impl AsmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.session_prefix.trim().is_empty() || self.session_prefix.contains(['/', '\\']) {
            return Err(anyhow!(
                "session_prefix must be a non-empty name without path separators"
            ));
        }
        if self.lock.timeout_ms == 0 {
            return Err(anyhow!("lock.timeout_ms must be > 0"));
        }
        if self.lock.poll_interval_ms == 0 || self.lock.poll_interval_ms > self.lock.timeout_ms {
            return Err(anyhow!(
                "lock.poll_interval_ms must be > 0 and <= lock.timeout_ms"
            ));
        }
        if self.agents.list_file.trim().is_empty() || self.agents.directory_file.trim().is_empty()
        {
            return Err(anyhow!("agents.list_file and agents.directory_file must be set"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AsmConfig::default()`.
pub fn load_config(path: &Path) -> Result<AsmConfig> {
    if !path.exists() {
        let cfg = AsmConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AsmConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
