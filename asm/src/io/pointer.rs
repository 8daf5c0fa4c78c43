//! Session pointer file (`.asm/.current_asm_session`).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AsmError;

/// Read the session root the pointer names.
///
/// Missing pointer, empty pointer, or a pointer to a directory that no longer
/// exists all mean there is no active session.
pub fn read_pointer(pointer_path: &Path) -> Result<PathBuf, AsmError> {
    let contents = match fs::read_to_string(pointer_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(AsmError::NoActiveSession),
        Err(err) => return Err(AsmError::io("read session pointer", pointer_path, err)),
    };
    let target = contents.trim();
    if target.is_empty() {
        return Err(AsmError::NoActiveSession);
    }
    let root = PathBuf::from(target);
    if !root.is_dir() {
        debug!(pointer = %pointer_path.display(), target = %root.display(), "session pointer target missing");
        return Err(AsmError::NoActiveSession);
    }
    Ok(root)
}

/// Atomically point at `session_root` (temp file + rename).
pub fn write_pointer(pointer_path: &Path, session_root: &Path) -> Result<(), AsmError> {
    debug!(pointer = %pointer_path.display(), target = %session_root.display(), "writing session pointer");
    let tmp_path = pointer_path.with_extension("tmp");
    fs::write(&tmp_path, session_root.display().to_string())
        .map_err(|err| AsmError::io("write temp session pointer", &tmp_path, err))?;
    fs::rename(&tmp_path, pointer_path)
        .map_err(|err| AsmError::io("replace session pointer", pointer_path, err))
}
