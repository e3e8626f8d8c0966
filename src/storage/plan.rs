//! Bind-mount plan for the synthetic root

use std::fmt;
use std::path::{Path, PathBuf};

/// Host system directories mirrored read-only into every jail
pub const SYSTEM_DIRS: &[&str] = &["/bin", "/usr", "/lib", "/lib64", "/sbin", "/etc"];

/// Access mode of a bind mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountMode::ReadOnly => write!(f, "ro"),
            MountMode::ReadWrite => write!(f, "rw"),
        }
    }
}

/// One planned bind mount; the in-jail target mirrors `source`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: PathBuf,
    pub mode: MountMode,
    /// Whether a missing source is an error rather than a silent skip
    pub required: bool,
}

impl BindMount {
    /// Read-only mount that is skipped when the source is absent
    pub fn optional_readonly(source: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            mode: MountMode::ReadOnly,
            required: false,
        }
    }
}

/// Ordered bind-mount plan: system dirs, then global config, then workspace config.
///
/// Entries are never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindMountPlan {
    entries: Vec<BindMount>,
}

impl BindMountPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// System directories followed by `extra_paths` in the given order
    pub fn build<S: AsRef<str>>(extra_paths: &[S]) -> Self {
        let mut plan = Self::new();
        for dir in SYSTEM_DIRS {
            plan.push(BindMount::optional_readonly(dir));
        }
        for path in extra_paths {
            plan.push(BindMount::optional_readonly(path.as_ref()));
        }
        plan
    }

    pub fn push(&mut self, mount: BindMount) {
        self.entries.push(mount);
    }

    pub fn entries(&self) -> &[BindMount] {
        &self.entries
    }

    /// Source paths in plan order
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|m| m.source.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
