//! Canonical paths for the `.asm/` tree.
//!
//! ```text
//! <cwd>/.asm/
//!   .current_asm_session        pointer: absolute session root
//!   config.toml
//!   <session>/
//!     state.jsonl               Event Log
//!     state.lock                advisory lock
//!     agent-list.txt            (external, optional)
//!     AGENT_DIRECTORY.md        (external, optional)
//!     conversations/
//!       messages.jsonl          Conversation Index
//!       conv_001/
//!         outputs/              workspace
//!         dialogue.md           transcript
//! ```

use std::path::{Path, PathBuf};

use crate::core::conversation::ConversationId;
use crate::io::config::AsmConfig;

pub const ASM_DIR: &str = ".asm";
pub const POINTER_FILE: &str = ".current_asm_session";
pub const CONFIG_FILE: &str = "config.toml";

/// Paths rooted at the invoking working directory.
#[derive(Debug, Clone)]
pub struct AsmPaths {
    pub cwd: PathBuf,
    pub asm_dir: PathBuf,
    pub pointer_path: PathBuf,
    pub config_path: PathBuf,
}

impl AsmPaths {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        let asm_dir = cwd.join(ASM_DIR);
        Self {
            cwd,
            pointer_path: asm_dir.join(POINTER_FILE),
            config_path: asm_dir.join(CONFIG_FILE),
            asm_dir,
        }
    }

    pub fn session_root(&self, name: &str) -> PathBuf {
        self.asm_dir.join(name)
    }
}

/// All canonical paths within one session root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub root: PathBuf,
    pub log_path: PathBuf,
    pub lock_path: PathBuf,
    pub conversations_dir: PathBuf,
    pub index_path: PathBuf,
    pub agent_list_path: PathBuf,
    pub agent_directory_path: PathBuf,
}

impl SessionPaths {
    pub fn new(root: impl Into<PathBuf>, config: &AsmConfig) -> Self {
        let root = root.into();
        let conversations_dir = root.join("conversations");
        Self {
            log_path: root.join("state.jsonl"),
            lock_path: root.join("state.lock"),
            index_path: conversations_dir.join("messages.jsonl"),
            agent_list_path: root.join(&config.agents.list_file),
            agent_directory_path: root.join(&config.agents.directory_file),
            conversations_dir,
            root,
        }
    }

    pub fn conversation(&self, id: ConversationId) -> ConversationPaths {
        ConversationPaths::new(&self.conversations_dir, id)
    }

    pub fn display_root(&self) -> String {
        self.root.display().to_string()
    }
}

/// Workspace and transcript locations for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationPaths {
    pub dir: PathBuf,
    pub workspace: PathBuf,
    pub transcript: PathBuf,
}

impl ConversationPaths {
    pub fn new(conversations_dir: &Path, id: ConversationId) -> Self {
        let dir = conversations_dir.join(id.to_string());
        Self {
            workspace: dir.join("outputs"),
            transcript: dir.join("dialogue.md"),
            dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_paths_are_stable() {
        let paths = SessionPaths::new("/tmp/.asm/demo", &AsmConfig::default());
        assert_eq!(paths.log_path, Path::new("/tmp/.asm/demo/state.jsonl"));
        assert_eq!(
            paths.index_path,
            Path::new("/tmp/.asm/demo/conversations/messages.jsonl")
        );
        assert_eq!(paths.agent_list_path, Path::new("/tmp/.asm/demo/agent-list.txt"));
    }

    #[test]
    fn conversation_paths_derive_from_id() {
        let paths = SessionPaths::new("/s", &AsmConfig::default());
        let conv = paths.conversation(ConversationId::new(3));
        assert_eq!(conv.workspace, Path::new("/s/conversations/conv_003/outputs"));
        assert_eq!(
            conv.transcript,
            Path::new("/s/conversations/conv_003/dialogue.md")
        );
    }

    #[test]
    fn asm_paths_live_under_cwd() {
        let paths = AsmPaths::new("/work");
        assert_eq!(paths.pointer_path, Path::new("/work/.asm/.current_asm_session"));
        assert_eq!(paths.session_root("demo"), Path::new("/work/.asm/demo"));
    }
}
