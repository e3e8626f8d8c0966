//! Command resolution inside the jail

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::errors::{JailError, Result};
use crate::utils;

/// Conventional binary directories, searched before any configured path
pub const SEARCH_DIRS: &[&str] = &["/bin", "/usr/bin", "/sbin", "/usr/sbin", "/usr/local/bin"];

/// Full search order: conventional dirs, then each extra dir with its `bin` and `shims`
pub fn search_path<'a>(extra_dirs: impl IntoIterator<Item = &'a Path>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = SEARCH_DIRS.iter().map(PathBuf::from).collect();
    for dir in extra_dirs {
        dirs.push(dir.to_path_buf());
        dirs.push(dir.join("bin"));
        dirs.push(dir.join("shims"));
    }
    dirs
}

/// Resolve `name` to an executable path.
///
/// Names containing `/` are returned untouched; exec reports any problem with them.
pub fn resolve_command<'a>(
    name: impl AsRef<OsStr>,
    extra_dirs: impl IntoIterator<Item = &'a Path>,
) -> Result<PathBuf> {
    let name = name.as_ref();
    if name.as_bytes().contains(&b'/') {
        return Ok(PathBuf::from(name));
    }

    search_path(extra_dirs)
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| utils::is_executable_file(candidate))
        .ok_or_else(|| JailError::CommandNotFound {
            name: name.to_string_lossy().into_owned(),
        })
}
