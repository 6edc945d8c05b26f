use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum FileOpError {
    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileOpError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::AlreadyExists {
            return FileOpError::AlreadyExists(path.to_path_buf());
        }
        FileOpError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of a recursive delete. Callers decide how to surface anything but
/// `Removed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    /// Some entries could not be removed; these paths are still on disk.
    Partial(Vec<PathBuf>),
    /// Nothing was removed.
    Denied(String),
}

impl DeleteOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, DeleteOutcome::Removed)
    }
}

pub fn list_subdirectories(path: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(path) else {
        return Vec::new();
    };
    read_dir
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect()
}

/// Regular files directly under `path` whose extension equals `ext`
/// (case-sensitive, without the dot).
pub fn list_files_by_extension(path: &Path, ext: &str) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(path) else {
        return Vec::new();
    };
    read_dir
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension() == Some(OsStr::new(ext)))
        .collect()
}

pub fn create_directory(parent: &Path, name: &str) -> Result<PathBuf, FileOpError> {
    validate_name(name)?;
    let target = parent.join(name);
    if fs::symlink_metadata(&target).is_ok() {
        return Err(FileOpError::AlreadyExists(target));
    }
    fs::create_dir_all(&target).map_err(|err| FileOpError::io("create directory", &target, err))?;
    Ok(target)
}

pub fn create_empty_file(parent: &Path, name: &str) -> Result<PathBuf, FileOpError> {
    validate_name(name)?;
    let target = parent.join(name);
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
        .map_err(|err| FileOpError::io("create file", &target, err))?;
    Ok(target)
}

/// Renames the last path segment of `path`, keeping it in the same parent.
/// Returns the new path.
pub fn rename(path: &Path, new_name: &str) -> Result<PathBuf, FileOpError> {
    validate_name(new_name)?;
    let parent = path.parent().ok_or_else(|| FileOpError::Io {
        action: "rename",
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"),
    })?;
    let target = parent.join(new_name);
    if target == path {
        return Ok(target);
    }
    // fs::rename silently replaces empty directories on unix.
    if fs::symlink_metadata(&target).is_ok() {
        return Err(FileOpError::AlreadyExists(target));
    }
    fs::rename(path, &target).map_err(|err| FileOpError::io("rename", path, err))?;
    Ok(target)
}

/// Deletes a file or a directory tree. A fast `remove_dir_all` is tried first;
/// when that fails the tree is walked bottom-up so every removable entry goes
/// and the leftovers are reported.
pub fn delete_recursively(path: &Path) -> DeleteOutcome {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return DeleteOutcome::Removed,
        Err(err) => return DeleteOutcome::Denied(err.to_string()),
    };

    if !meta.is_dir() {
        return match fs::remove_file(path) {
            Ok(()) => DeleteOutcome::Removed,
            Err(err) => DeleteOutcome::Denied(err.to_string()),
        };
    }

    let first_error = match fs::remove_dir_all(path) {
        Ok(()) => return DeleteOutcome::Removed,
        Err(err) => err,
    };

    let mut remaining = Vec::new();
    let mut removed_any = false;
    for entry in WalkDir::new(path).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if let Some(failed) = err.path() {
                    remaining.push(failed.to_path_buf());
                }
                continue;
            }
        };
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        match result {
            Ok(()) => removed_any = true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(_) => remaining.push(entry.path().to_path_buf()),
        }
    }

    if remaining.is_empty() {
        DeleteOutcome::Removed
    } else if removed_any {
        DeleteOutcome::Partial(remaining)
    } else {
        DeleteOutcome::Denied(first_error.to_string())
    }
}

pub fn validate_name(name: &str) -> Result<(), FileOpError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(FileOpError::InvalidName(name.to_string()));
    }
    Ok(())
}
