use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory missing or not writable: {0}")]
    StateDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the local state directory exists and is writable.
pub fn ensure_state_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StateDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    }
    // Writability probe: creating a temp file fails fast on a read-only dir.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    Ok(())
}

/// Atomically replace `{dir}/{filename}`: write a temp file in the same
/// directory, fsync, then rename over the target. A crash mid-write leaves
/// the previous state file intact rather than a half-written one.
pub fn write_state_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
    ensure_state_dir(dir)?;

    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
    Ok(target)
}

/// Read a state file, mapping "not there yet" to `None`.
pub fn load_state_file(dir: &Path, filename: &str) -> Result<Option<String>, PersistError> {
    match fs::read_to_string(dir.join(filename)) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(PersistError::Io(err)),
    }
}
