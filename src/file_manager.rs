use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::FsError;

/// Fails unless `path` is an existing, writable directory.
pub fn check_directory(path: &Path) -> Result<(), FsError> {
    let metadata = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
    if !metadata.is_dir() {
        return Err(FsError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    if metadata.permissions().readonly() {
        return Err(FsError::PermissionDenied {
            path: path.to_path_buf(),
        });
    }

    // Mode bits miss ACLs and read-only mounts.
    let check_file = path.join(format!(".page-loader-write-check-{}", std::process::id()));
    match OpenOptions::new().write(true).create_new(true).open(&check_file) {
        Ok(file) => {
            drop(file);
            if let Err(e) = fs::remove_file(&check_file) {
                warn!(path = %check_file.display(), error = %e, "failed to remove write check file");
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(FsError::from_io(path, e)),
    }
}

/// Creates `path` and any missing parents. Returns `false` when it already existed.
pub fn create_directory(path: &Path) -> Result<bool, FsError> {
    if path.is_dir() {
        warn!(
            path = %path.display(),
            "directory already exists, the page was probably downloaded here before"
        );
        return Ok(false);
    }
    fs::create_dir_all(path).map_err(|e| FsError::from_io(path, e))?;
    debug!(path = %path.display(), "created directory");
    Ok(true)
}

/// Writes `content` verbatim to `directory/name`, replacing any existing file.
pub fn write_file(directory: &Path, name: &str, content: &[u8]) -> Result<PathBuf, FsError> {
    let file_path = directory.join(name);
    fs::write(&file_path, content).map_err(|e| FsError::from_io(&file_path, e))?;
    debug!(path = %file_path.display(), bytes = content.len(), "wrote file");
    Ok(file_path)
}

/// A validated, absolute output directory.
#[derive(Debug, Clone)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    /// Validates `base_dir` and resolves it to an absolute path.
    pub fn new(base_dir: &Path) -> Result<Self, FsError> {
        check_directory(base_dir)?;
        let base_dir = fs::canonicalize(base_dir).map_err(|e| FsError::from_io(base_dir, e))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes a file directly under the base directory.
    pub fn save_file(&self, name: &str, content: &[u8]) -> Result<PathBuf, FsError> {
        write_file(&self.base_dir, name, content)
    }

    /// Creates (or reuses) a subdirectory of the base directory.
    pub fn create_subdirectory(&self, name: &str) -> Result<PathBuf, FsError> {
        let path = self.base_dir.join(name);
        create_directory(&path)?;
        Ok(path)
    }
}
