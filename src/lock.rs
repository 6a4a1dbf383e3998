//! Advisory run lock
//!
//! Relational writes assume exclusive access, so a pid-stamped lock file
//! prevents two conversion runs from executing against the same target.

use crate::error::ConvertError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Held for the duration of one conversion run; released on drop.
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock, failing immediately (without side effects) when a
    /// live run already holds it.
    pub fn acquire(path: &Path) -> Result<Self, ConvertError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                info!(lock = %path.display(), "Acquired run lock");
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ConvertError::ConcurrentRun(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), "Failed to remove lock file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convert.lock");

        let lock = RunLock::acquire(&path).unwrap();
        match RunLock::acquire(&path) {
            Err(ConvertError::ConcurrentRun(p)) => assert_eq!(p, path),
            other => panic!("expected ConcurrentRun, got {:?}", other.map(|_| ())),
        }

        drop(lock);
        let _relock = RunLock::acquire(&path).unwrap();
    }
}
