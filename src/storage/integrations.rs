//! Optional host integrations mounted into the jail
//!
//! None of these are required for the jail to work. A missing source is a
//! quiet skip; any failure is reported as [`JailError::IntegrationMountFailed`]
//! and downgraded to a warning by the orchestrator.

use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use crate::config::HostContext;
use crate::errors::{JailError, Result};
use crate::storage::mount;
use crate::storage::orchestrator::{MountContext, StepOutcome};
use crate::storage::rootfs::SyntheticRoot;

/// Per-user tool configuration directory under `$HOME`
pub const HOME_CONFIG_DIR: &str = ".claude";
/// Per-user credential/config file under `$HOME`
pub const HOME_CONFIG_FILE: &str = ".claude.json";

const SYSTEM_SOCKETS: &[&str] = &["/var/run/docker.sock", "/run/docker.sock"];
const ROOTLESS_SOCKET: &str = ".docker/run/docker.sock";

/// Bind `$HOME/.claude` read-write at the same path inside the jail
pub fn mount_home_config_dir(
    ctx: &MountContext<'_>,
    root: &mut SyntheticRoot,
) -> Result<StepOutcome> {
    const NAME: &str = "home config directory";

    let Some(home) = &ctx.host.home else {
        return Ok(StepOutcome::Skipped("HOME is not set".to_string()));
    };
    let source = home.join(HOME_CONFIG_DIR);
    if !source.is_dir() {
        return Ok(StepOutcome::skipped_absent(&source));
    }

    let target = root
        .create_dir(&source, 0o755)
        .map_err(|e| {
            JailError::integration(NAME, format!("creating {}: {}", source.display(), e))
        })?;
    mount::bind(&source, &target, true).map_err(|e| JailError::integration(NAME, e))?;
    root.record_mount(target);
    Ok(StepOutcome::Done)
}

/// Bind `$HOME/.claude.json` over an empty placeholder at the same path
pub fn mount_home_config_file(
    ctx: &MountContext<'_>,
    root: &mut SyntheticRoot,
) -> Result<StepOutcome> {
    const NAME: &str = "home config file";

    let Some(home) = &ctx.host.home else {
        return Ok(StepOutcome::Skipped("HOME is not set".to_string()));
    };
    let source = home.join(HOME_CONFIG_FILE);
    if !source.is_file() {
        return Ok(StepOutcome::skipped_absent(&source));
    }

    let target = root
        .create_placeholder_file(&source, 0o600)
        .map_err(|e| JailError::integration(NAME, format!("creating mount point: {}", e)))?;
    mount::bind(&source, &target, false).map_err(|e| JailError::integration(NAME, e))?;
    root.record_mount(target);
    Ok(StepOutcome::Done)
}

/// Bind `$XDG_RUNTIME_DIR` read-write at the same path
pub fn mount_runtime_dir(ctx: &MountContext<'_>, root: &mut SyntheticRoot) -> Result<StepOutcome> {
    const NAME: &str = "XDG_RUNTIME_DIR";

    let Some(source) = &ctx.host.xdg_runtime_dir else {
        return Ok(StepOutcome::Skipped("XDG_RUNTIME_DIR is not set".to_string()));
    };
    if !source.exists() {
        return Ok(StepOutcome::skipped_absent(source));
    }

    let target = root
        .create_dir(source, 0o700)
        .map_err(|e| {
            JailError::integration(NAME, format!("creating {}: {}", source.display(), e))
        })?;
    mount::bind(source, &target, true).map_err(|e| JailError::integration(NAME, e))?;
    root.record_mount(target);
    Ok(StepOutcome::Done)
}

/// Bind the container runtime socket over an empty placeholder
pub fn mount_container_socket(
    ctx: &MountContext<'_>,
    root: &mut SyntheticRoot,
) -> Result<StepOutcome> {
    const NAME: &str = "Docker socket";

    let source = detect_container_socket(ctx.host)
        .ok_or_else(|| JailError::integration(NAME, "docker socket not found"))?;
    verify_socket(&source).map_err(|reason| JailError::integration(NAME, reason))?;

    let target = root
        .create_placeholder_file(&source, 0o666)
        .map_err(|e| JailError::integration(NAME, format!("creating mount point: {}", e)))?;
    mount::bind(&source, &target, false).map_err(|e| JailError::integration(NAME, e))?;
    root.record_mount(target);
    Ok(StepOutcome::Done)
}

/// Socket path named by `DOCKER_HOST`: a `unix://` URI or a bare absolute path
pub fn docker_host_path(docker_host: &str) -> Option<PathBuf> {
    if let Some(path) = docker_host.strip_prefix("unix://") {
        return Some(PathBuf::from(path));
    }
    if docker_host.starts_with('/') {
        return Some(PathBuf::from(docker_host));
    }
    None
}

/// Locate the container runtime socket.
///
/// A usable `DOCKER_HOST` wins outright; otherwise the conventional system
/// and rootless locations are checked in order.
pub fn detect_container_socket(host: &HostContext) -> Option<PathBuf> {
    if let Some(path) = host.docker_host.as_deref().and_then(docker_host_path) {
        return Some(path);
    }

    let rootless = host.home.as_ref().map(|home| home.join(ROOTLESS_SOCKET));
    SYSTEM_SOCKETS
        .iter()
        .copied()
        .map(PathBuf::from)
        .chain(rootless)
        .find(|path| path.exists())
}

fn verify_socket(path: &Path) -> std::result::Result<(), String> {
    let meta = fs::metadata(path)
        .map_err(|e| format!("docker socket at {} not accessible: {}", path.display(), e))?;
    if !meta.file_type().is_socket() {
        return Err(format!("docker socket at {} is not a socket", path.display()));
    }
    Ok(())
}
