//! Advisory session lock held across read → decide → append.
//!
//! Each invocation is a separate process, so the only way to keep two of them
//! from computing the same next record is an OS-level file lock on a sibling
//! of the Event Log. Contention past the configured timeout surfaces as
//! [`AsmError::LockTimeout`], which callers may retry.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::AsmError;
use crate::io::config::LockConfig;

/// Exclusive lock guard; released when dropped.
#[derive(Debug)]
pub struct SessionLock {
    file: File,
    path: PathBuf,
}

impl SessionLock {
    /// Poll `try_lock_exclusive` until it succeeds or the timeout elapses.
    pub fn acquire(path: &Path, config: &LockConfig) -> Result<Self, AsmError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| AsmError::io("open lock file", path, err))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let poll = Duration::from_millis(config.poll_interval_ms);
        let started = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    debug!(path = %path.display(), waited_ms = started.elapsed().as_millis() as u64, "session lock acquired");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                    if started.elapsed() >= timeout {
                        warn!(path = %path.display(), timeout_ms = config.timeout_ms, "session lock timed out");
                        return Err(AsmError::LockTimeout {
                            path: path.to_path_buf(),
                            waited_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    thread::sleep(poll);
                }
                Err(err) => return Err(AsmError::io("lock", path, err)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %err, "failed to release session lock");
        } else {
            debug!(path = %self.path.display(), "session lock released");
        }
    }
}
