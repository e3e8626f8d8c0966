//! Synthetic root directory with failure-path cleanup
//!
//! The root is a fresh temporary directory owned by one inner-stage
//! invocation. Until [`SyntheticRoot::enter`] succeeds, dropping it detaches
//! every recorded mount (newest first) and removes the directory. Once the
//! process has chrooted into it, cleanup is no longer attempted and the host
//! directory is left for external cleanup.

use log::{debug, warn};
use nix::unistd::chroot;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use crate::errors::{JailError, Result};
use crate::storage::mount;
use crate::utils;

const ROOT_PREFIX: &str = "jail-root-";

/// Process-private directory that becomes `/` of the jail
#[derive(Debug)]
pub struct SyntheticRoot {
    path: PathBuf,
    mounts: Vec<PathBuf>,
    armed: bool,
}

impl SyntheticRoot {
    /// Create a unique directory under `parent`
    pub fn allocate_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(ROOT_PREFIX)
            .disable_cleanup(true)
            .tempdir_in(parent)
            .map_err(|e| JailError::mount("creating temp root in", parent, e))?;
        let path = dir.path().to_path_buf();
        debug!("Allocated synthetic root {}", path.display());

        Ok(Self {
            path,
            mounts: Vec::new(),
            armed: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path inside this root that mirrors `host_path`
    pub fn mirror(&self, host_path: &Path) -> PathBuf {
        utils::mirror_path(&self.path, host_path)
    }

    /// Create the mirror of `host_path` as a directory (and its parents)
    pub fn create_dir(&self, host_path: &Path, mode: u32) -> io::Result<PathBuf> {
        let target = self.mirror(host_path);
        DirBuilder::new().recursive(true).mode(mode).create(&target)?;
        Ok(target)
    }

    /// Create an empty file at the mirror of `host_path` to serve as a bind target
    pub fn create_placeholder_file(&self, host_path: &Path, mode: u32) -> io::Result<PathBuf> {
        let target = self.mirror(host_path);
        if let Some(parent) = target.parent() {
            DirBuilder::new().recursive(true).mode(0o755).create(parent)?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(&target)?;
        Ok(target)
    }

    /// Remember a mount target so a failure path can detach it
    pub fn record_mount(&mut self, target: PathBuf) {
        self.mounts.push(target);
    }

    pub fn mounts(&self) -> &[PathBuf] {
        &self.mounts
    }

    /// chroot into this root; from here on the directory is never removed
    pub fn enter(mut self) -> Result<()> {
        chroot(&self.path).map_err(|e| JailError::mount("chroot into", &self.path, e))?;
        self.armed = false;
        debug!("Entered synthetic root {}", self.path.display());
        Ok(())
    }

    fn cleanup(&mut self) {
        for target in self.mounts.iter().rev() {
            match mount::detach(target) {
                Ok(()) | Err(nix::Error::EINVAL) | Err(nix::Error::ENOENT) => {}
                Err(e) => {
                    warn!(
                        "Leaving {} in place: failed to detach {}: {}",
                        self.path.display(),
                        target.display(),
                        e
                    );
                    return;
                }
            }
        }

        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!("Failed to clean up temp root {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for SyntheticRoot {
    fn drop(&mut self) {
        if self.armed {
            self.cleanup();
        }
    }
}
