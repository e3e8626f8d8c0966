//! User namespace UID/GID mapping support
//!
//! The outer stage writes the child's `/proc/{pid}/uid_map` and `gid_map`
//! while the child is parked on the sync pipe.

use nix::unistd::Pid;
use std::fs;

use crate::errors::{JailError, Result};
use crate::isolation::namespace::NamespaceSpec;

/// Write the single-entry UID/GID maps of `spec` for `child_pid`.
///
/// `setgroups` is denied before `gid_map` is written, as required for an
/// unprivileged writer.
pub fn setup_user_namespace(child_pid: Pid, spec: &NamespaceSpec) -> Result<()> {
    let pid = child_pid.as_raw();

    fs::write(format!("/proc/{}/uid_map", pid), spec.uid_map.to_map_line()).map_err(|e| {
        JailError::NamespaceCreationFailed(format!("writing uid_map for pid {}: {}", pid, e))
    })?;

    fs::write(format!("/proc/{}/setgroups", pid), "deny\n").map_err(|e| {
        JailError::NamespaceCreationFailed(format!("writing setgroups for pid {}: {}", pid, e))
    })?;

    fs::write(format!("/proc/{}/gid_map", pid), spec.gid_map.to_map_line()).map_err(|e| {
        JailError::NamespaceCreationFailed(format!("writing gid_map for pid {}: {}", pid, e))
    })?;

    Ok(())
}
