//! Mount primitives used to build the synthetic root

use nix::mount::{MntFlags, MsFlags, mount, umount2};
use nix::sys::statvfs::{FsFlags, statvfs};
use std::path::Path;

use crate::errors::{JailError, Result};

const NONE: Option<&str> = None;

/// Recursively mark every mount private so nothing propagates to or from the host
pub fn make_private() -> Result<()> {
    mount(NONE, "/", NONE, MsFlags::MS_PRIVATE | MsFlags::MS_REC, NONE)
        .map_err(|e| JailError::mount("making root mount private", "/", e))
}

/// Bind `source` onto `target`, including submounts when `recursive`
pub fn bind(source: &Path, target: &Path, recursive: bool) -> Result<()> {
    let mut flags = MsFlags::MS_BIND;
    if recursive {
        flags |= MsFlags::MS_REC;
    }
    mount(Some(source), target, NONE, flags, NONE)
        .map_err(|e| JailError::mount("bind mounting", source, e))
}

/// Remount an existing bind mount read-only.
///
/// Flags the underlying mount already carries are re-applied; a user
/// namespace rejects a remount that would clear them.
pub fn remount_readonly(target: &Path) -> Result<()> {
    let flags = MsFlags::MS_BIND
        | MsFlags::MS_REMOUNT
        | MsFlags::MS_RDONLY
        | MsFlags::MS_REC
        | locked_flags(target);
    mount(NONE, target, NONE, flags, NONE)
        .map_err(|e| JailError::mount("remounting read-only", target, e))
}

/// Recursive bind followed by a read-only remount
pub fn bind_readonly(source: &Path, target: &Path) -> Result<()> {
    bind(source, target, true)?;
    remount_readonly(target)
}

/// Mount a fresh procfs at `target`
pub fn mount_proc(target: &Path) -> Result<()> {
    mount(Some("proc"), target, Some("proc"), MsFlags::empty(), NONE)
        .map_err(|e| JailError::mount("mounting proc at", target, e))
}

/// Lazily detach whatever is mounted at `target`
pub fn detach(target: &Path) -> nix::Result<()> {
    umount2(target, MntFlags::MNT_DETACH)
}

fn locked_flags(target: &Path) -> MsFlags {
    let Ok(stat) = statvfs(target) else {
        return MsFlags::empty();
    };
    let current = stat.flags();

    [
        (FsFlags::ST_NOSUID, MsFlags::MS_NOSUID),
        (FsFlags::ST_NODEV, MsFlags::MS_NODEV),
        (FsFlags::ST_NOEXEC, MsFlags::MS_NOEXEC),
        (FsFlags::ST_NOATIME, MsFlags::MS_NOATIME),
        (FsFlags::ST_NODIRATIME, MsFlags::MS_NODIRATIME),
        (FsFlags::ST_RELATIME, MsFlags::MS_RELATIME),
    ]
    .into_iter()
    .filter(|(st, _)| current.contains(*st))
    .fold(MsFlags::empty(), |acc, (_, ms)| acc | ms)
}
