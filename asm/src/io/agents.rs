//! Read-only view of the externally generated agent directory.
//!
//! `agent-list.txt` holds one agent name per line. It is informational only;
//! a missing or unreadable file never blocks an operation.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::io::paths::SessionPaths;

/// Agent directory files found in a session root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentDirectory {
    pub list_file: Option<PathBuf>,
    pub description_file: Option<PathBuf>,
    pub names: Vec<String>,
}

impl AgentDirectory {
    pub fn count(&self) -> usize {
        self.names.len()
    }
}

pub fn load_agent_directory(session: &SessionPaths) -> AgentDirectory {
    let list_file = session.agent_list_path.is_file().then(|| session.agent_list_path.clone());
    let description_file = session
        .agent_directory_path
        .is_file()
        .then(|| session.agent_directory_path.clone());

    let names = match &list_file {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "agent list unreadable; reporting zero agents");
                Vec::new()
            }
        },
        None => {
            debug!(path = %session.agent_list_path.display(), "no agent list in session root");
            Vec::new()
        }
    };

    AgentDirectory {
        list_file,
        description_file,
        names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::AsmConfig;

    #[test]
    fn absent_files_count_zero() {
        let temp = tempfile::tempdir().expect("tempdir");
        let session = SessionPaths::new(temp.path(), &AsmConfig::default());
        assert_eq!(load_agent_directory(&session), AgentDirectory::default());
    }

    #[test]
    fn counts_non_blank_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let session = SessionPaths::new(temp.path(), &AsmConfig::default());
        fs::write(&session.agent_list_path, "data-engineer\n\nqa\nwriter\n").expect("write");
        fs::write(&session.agent_directory_path, "# Agents\n").expect("write");

        let directory = load_agent_directory(&session);
        assert_eq!(directory.count(), 3);
        assert_eq!(directory.list_file.as_ref(), Some(&session.agent_list_path));
        assert!(directory.description_file.is_some());
    }
}
