//! Filesystem utilities for Keel.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Write `content` to `path` through a sibling temp file and a rename, so a
/// reader never observes a half-written file. Parent directories are created.
///
/// # Errors
/// Returns an error if the parent directory, the temp file or the rename fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), UtilError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));

    std::fs::write(&tmp_path, content).map_err(|source| UtilError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        UtilError::Io {
            path: path.display().to_string(),
            source,
        }
    })
}

/// The default local Maven repository, `~/.m2/repository`.
///
/// The home directory comes from `HOME`, or `USERPROFILE` on Windows, looked
/// up through `env` so callers control the environment.
///
/// # Errors
/// Returns `UtilError::NoHomeDir` if neither variable is set.
pub fn maven_local_repository(env: &dyn Fn(&str) -> Option<String>) -> Result<PathBuf, UtilError> {
    let home = env("HOME")
        .or_else(|| env("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .ok_or(UtilError::NoHomeDir)?;
    Ok(PathBuf::from(home).join(".m2").join("repository"))
}

/// Whether `path` is a regular file the current user may execute.
///
/// On non-Unix platforms any existing file counts as executable.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
