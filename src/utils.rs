//! Utility functions for jail operations

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

/// Get current real UID
pub fn get_uid() -> u32 {
    nix::unistd::getuid().as_raw()
}

/// Get current real GID
pub fn get_gid() -> u32 {
    nix::unistd::getgid().as_raw()
}

/// Check whether unprivileged user namespaces are enabled on this kernel
pub fn has_user_namespaces() -> bool {
    if let Ok(content) = fs::read_to_string("/proc/sys/kernel/unprivileged_userns_clone")
        && content.trim() == "0"
    {
        return false;
    }

    if let Ok(content) = fs::read_to_string("/proc/sys/user/max_user_namespaces")
        && let Ok(max) = content.trim().parse::<u64>()
    {
        return max > 0;
    }

    true
}

/// True for a non-directory with any execute bit set
pub fn is_executable_file(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => !meta.is_dir() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Normal components of `path` with `.` dropped and `..` folded; never climbs above the start
fn lexical_components(path: &Path) -> PathBuf {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::ParentDir => {
                relative.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    relative
}

/// Lexically clean an absolute path without touching the filesystem
pub fn normalize_absolute(path: &Path) -> PathBuf {
    Path::new("/").join(lexical_components(path))
}

/// Map a host path to the same path under `root`.
///
/// The host path is normalised lexically first, so `..` can never climb above `root`.
pub fn mirror_path(root: &Path, host_path: &Path) -> PathBuf {
    root.join(lexical_components(host_path))
}
