//! Permission profiles and their resolution from machine state.
//!
//! Resolution is total: every state maps to exactly one of three fixed
//! profiles. The profile is also snapshotted into each state record so a
//! historical record can be audited without any external lookup.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::state::MachineState;

const ANY: &str = "*";
const BASH_NOTE: &str = "System initialization phase";

/// Allow/deny rule set attached to a machine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionProfile {
    pub can_write: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cannot_write: Vec<String>,
    pub can_execute: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cannot_execute: Vec<String>,
    /// Informational only; not part of the audited rule set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Outcome of checking a file or verb against a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    /// Pattern that decided the outcome, if any matched.
    pub rule: Option<String>,
}

impl PermissionProfile {
    fn unrestricted(note: Option<&str>) -> Self {
        Self {
            can_write: vec![ANY.to_string()],
            cannot_write: Vec::new(),
            can_execute: vec![ANY.to_string()],
            cannot_execute: Vec::new(),
            note: note.map(str::to_string),
        }
    }

    fn main() -> Self {
        Self {
            can_write: to_strings(&[
                "*.md",
                "*.txt",
                "*.log",
                "*.json",
                "*.csv",
                "non-executable files",
            ]),
            cannot_write: to_strings(&[
                "*.py",
                "*.js",
                "*.ts",
                "*.sh",
                "*.go",
                "*.rs",
                "*.c",
                "*.cpp",
                "*.java",
                "package.json",
                "requirements.txt",
                "Dockerfile",
                "Makefile",
                "any executable file",
            ]),
            can_execute: to_strings(&[
                "read",
                "list",
                "search",
                "analyze",
                "information-gathering functions only",
            ]),
            cannot_execute: to_strings(&["run", "exec", "eval", "compile", "build"]),
            note: None,
        }
    }

    /// True when the allow/deny lists match, ignoring the informational note.
    pub fn same_rules(&self, other: &PermissionProfile) -> bool {
        self.can_write == other.can_write
            && self.cannot_write == other.cannot_write
            && self.can_execute == other.can_execute
            && self.cannot_execute == other.cannot_execute
    }

    /// Decide whether a file may be written. Deny rules win over allow rules;
    /// a name matching no pattern is denied unless `*` is allowed.
    pub fn check_write(&self, file_name: &str) -> Decision {
        let name = base_name(file_name);
        if let Some(rule) = first_match(&self.cannot_write, name) {
            return Decision {
                allowed: false,
                rule: Some(rule.to_string()),
            };
        }
        match first_match(&self.can_write, name) {
            Some(rule) => Decision {
                allowed: true,
                rule: Some(rule.to_string()),
            },
            None => Decision {
                allowed: false,
                rule: None,
            },
        }
    }

    /// Decide whether an execution verb may be used. Verbs compare
    /// case-insensitively; prose entries in the lists never match a verb.
    pub fn check_execute(&self, verb: &str) -> Decision {
        let verb = verb.trim().to_ascii_lowercase();
        if let Some(rule) = self.cannot_execute.iter().find(|rule| **rule == verb) {
            return Decision {
                allowed: false,
                rule: Some(rule.clone()),
            };
        }
        match self
            .can_execute
            .iter()
            .find(|rule| rule.as_str() == ANY || **rule == verb)
        {
            Some(rule) => Decision {
                allowed: true,
                rule: Some(rule.clone()),
            },
            None => Decision {
                allowed: false,
                rule: None,
            },
        }
    }
}

/// Map a machine state to its capability profile. Never fails.
pub fn resolve_permissions(state: &MachineState) -> PermissionProfile {
    match state {
        MachineState::Bash => PermissionProfile::unrestricted(Some(BASH_NOTE)),
        MachineState::Main => PermissionProfile::main(),
        MachineState::Agent(_) => PermissionProfile::unrestricted(None),
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn first_match<'a>(patterns: &'a [String], name: &str) -> Option<&'a str> {
    patterns
        .iter()
        .map(String::as_str)
        .find(|pattern| pattern_matches(pattern, name))
}

/// Glob-style match for `*`, `*.ext` and exact names. Entries containing
/// whitespace are descriptive prose and never match.
fn pattern_matches(pattern: &str, name: &str) -> bool {
    static GLOB_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(\*|\*\.[A-Za-z0-9_+-]+|[A-Za-z0-9_.+-]+)$").expect("static glob regex")
    });

    if !GLOB_RE.is_match(pattern) {
        return false;
    }
    if pattern == ANY {
        return true;
    }
    match pattern.strip_prefix('*') {
        Some(suffix) => name.len() > suffix.len() && name.ends_with(suffix),
        None => name == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_and_agents_are_unrestricted() {
        for state in [MachineState::Bash, MachineState::Agent("x".to_string())] {
            let profile = resolve_permissions(&state);
            assert!(profile.check_write("build.sh").allowed);
            assert!(profile.check_execute("compile").allowed);
        }
    }

    #[test]
    fn main_denies_source_and_build_files() {
        let profile = resolve_permissions(&MachineState::Main);
        for name in [
            "script.py",
            "app.js",
            "run.sh",
            "main.go",
            "lib.rs",
            "x.c",
            "x.cpp",
            "Main.java",
            "Dockerfile",
            "Makefile",
            "package.json",
            "requirements.txt",
            "nested/dir/tool.py",
        ] {
            let decision = profile.check_write(name);
            assert!(!decision.allowed, "{name} should be denied");
            assert!(decision.rule.is_some(), "{name} should name its rule");
        }
    }

    #[test]
    fn main_allows_plain_text_outputs() {
        let profile = resolve_permissions(&MachineState::Main);
        for name in ["notes.md", "report.txt", "run.log", "data.json", "table.csv"] {
            assert!(profile.check_write(name).allowed, "{name} should be allowed");
        }
        assert!(!profile.check_write("image.png").allowed);
    }

    #[test]
    fn main_allows_only_information_gathering_verbs() {
        let profile = resolve_permissions(&MachineState::Main);
        assert!(profile.check_execute("read").allowed);
        assert!(profile.check_execute("Search").allowed);
        for verb in ["run", "exec", "eval", "compile", "build"] {
            assert!(!profile.check_execute(verb).allowed, "{verb} should be denied");
        }
        assert!(!profile.check_execute("deploy").allowed);
    }

    #[test]
    fn same_rules_ignores_note() {
        let mut embedded = resolve_permissions(&MachineState::Bash);
        embedded.note = None;
        assert!(embedded.same_rules(&resolve_permissions(&MachineState::Bash)));
        assert!(!embedded.same_rules(&resolve_permissions(&MachineState::Main)));
    }

    #[test]
    fn main_profile_serializes_with_all_lists() {
        let value = serde_json::to_value(resolve_permissions(&MachineState::Main)).expect("json");
        assert!(value.get("cannot_write").is_some());
        assert!(value.get("cannot_execute").is_some());
        assert!(value.get("note").is_none());
    }
}
