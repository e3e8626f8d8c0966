//! Mount orchestration: builds a fully populated synthetic root
//!
//! Order of operations:
//! 1. Make the whole mount tree private (recursive)
//! 2. Allocate the synthetic root
//! 3. Bind the mount plan, each entry remounted read-only
//! 4. Bind the workspace read-write at `/workspace/<name>`
//! 5. Optional integrations (home config, credential file, runtime dir, container socket)
//! 6. `/proc`, `/dev`, `/tmp`
//!
//! Steps run strictly in order. A fatal step aborts on its first error; an
//! optional step's error is logged as a warning and the sequence continues.

use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli;
use crate::config::HostContext;
use crate::errors::{JailError, Result};
use crate::storage::integrations;
use crate::storage::mount;
use crate::storage::plan::{BindMountPlan, MountMode};
use crate::storage::rootfs::SyntheticRoot;

/// Everything the steps read; never mutated while mounting
#[derive(Debug, Clone, Copy)]
pub struct MountContext<'a> {
    pub plan: &'a BindMountPlan,
    pub host: &'a HostContext,
    /// Absolute host path of the workspace, symlinks kept
    pub workspace: &'a Path,
}

/// Result of a step that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    Skipped(String),
}

impl StepOutcome {
    pub(crate) fn skipped_absent(path: &Path) -> Self {
        StepOutcome::Skipped(format!("{} does not exist", path.display()))
    }
}

/// Whether a step's error stops the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Fatal,
    Optional,
}

pub type StepFn = fn(&MountContext<'_>, &mut SyntheticRoot) -> Result<StepOutcome>;

#[derive(Clone, Copy)]
pub struct Step {
    pub name: &'static str,
    pub disposition: Disposition,
    pub run: StepFn,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("disposition", &self.disposition)
            .finish()
    }
}

impl Step {
    const fn fatal(name: &'static str, run: StepFn) -> Self {
        Self {
            name,
            disposition: Disposition::Fatal,
            run,
        }
    }

    const fn optional(name: &'static str, run: StepFn) -> Self {
        Self {
            name,
            disposition: Disposition::Optional,
            run,
        }
    }
}

/// Steps run against an allocated synthetic root
pub const STEPS: &[Step] = &[
    Step::fatal("bind mount plan", mount_plan),
    Step::fatal("workspace", mount_workspace),
    Step::optional("home config directory", integrations::mount_home_config_dir),
    Step::optional("home config file", integrations::mount_home_config_file),
    Step::optional("runtime directory", integrations::mount_runtime_dir),
    Step::optional("container socket", integrations::mount_container_socket),
    Step::fatal("pseudo filesystems", mount_pseudo_filesystems),
];

/// Build the synthetic root for `ctx`; on error every mount made so far is undone
pub fn prepare(ctx: &MountContext<'_>) -> Result<SyntheticRoot> {
    prepare_in(ctx, &std::env::temp_dir())
}

/// [`prepare`] with the synthetic root allocated under `parent`
pub fn prepare_in(ctx: &MountContext<'_>, parent: &Path) -> Result<SyntheticRoot> {
    mount::make_private()?;
    let mut root = SyntheticRoot::allocate_in(parent)?;
    run_steps(STEPS, ctx, &mut root)?;
    Ok(root)
}

/// Run `steps` in order, halting on the first fatal error
pub fn run_steps(steps: &[Step], ctx: &MountContext<'_>, root: &mut SyntheticRoot) -> Result<()> {
    for step in steps {
        debug!("Mount step: {}", step.name);
        match ((step.run)(ctx, root), step.disposition) {
            (Ok(StepOutcome::Done), _) => {}
            (Ok(StepOutcome::Skipped(reason)), _) => debug!("Skipped {}: {}", step.name, reason),
            (Err(e), Disposition::Optional) => warn!("{}", e),
            (Err(e), Disposition::Fatal) => return Err(e),
        }
    }
    Ok(())
}

/// Bind every plan source present on the host; read-only entries are remounted.
///
/// Plans built from configuration only hold optional read-only entries. The
/// read-write and required cases belong to the [`BindMount`] data model and
/// are honoured for hand-built plans.
///
/// [`BindMount`]: crate::storage::BindMount
fn mount_plan(ctx: &MountContext<'_>, root: &mut SyntheticRoot) -> Result<StepOutcome> {
    for entry in ctx.plan.entries() {
        if !entry.source.exists() {
            if entry.required {
                return Err(JailError::mount(
                    "bind mounting",
                    &entry.source,
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                ));
            }
            debug!("Skipping {}: not present on host", entry.source.display());
            continue;
        }

        let target = create_mount_point(root, &entry.source)?;
        match entry.mode {
            MountMode::ReadOnly => {
                mount::bind(&entry.source, &target, true)?;
                root.record_mount(target.clone());
                mount::remount_readonly(&target)?;
            }
            MountMode::ReadWrite => {
                mount::bind(&entry.source, &target, true)?;
                root.record_mount(target.clone());
            }
        }
        debug!("Mounted {} ({})", entry.source.display(), entry.mode);
    }
    Ok(StepOutcome::Done)
}

fn mount_workspace(ctx: &MountContext<'_>, root: &mut SyntheticRoot) -> Result<StepOutcome> {
    let jail_path = cli::jail_workspace_path(ctx.workspace);
    let target = root
        .create_dir(&jail_path, 0o755)
        .map_err(|e| JailError::mount("creating workspace", &jail_path, e))?;
    mount::bind(ctx.workspace, &target, true)?;
    root.record_mount(target);
    debug!("Mounted workspace {} at {}", ctx.workspace.display(), jail_path.display());
    Ok(StepOutcome::Done)
}

fn mount_pseudo_filesystems(
    _ctx: &MountContext<'_>,
    root: &mut SyntheticRoot,
) -> Result<StepOutcome> {
    for dir in ["/proc", "/dev", "/tmp"] {
        create_mount_point(root, Path::new(dir))?;
    }

    let proc_dir = root.mirror(Path::new("/proc"));
    mount::mount_proc(&proc_dir)?;
    root.record_mount(proc_dir);

    let dev_dir = root.mirror(Path::new("/dev"));
    mount::bind(Path::new("/dev"), &dev_dir, true)?;
    root.record_mount(dev_dir);

    Ok(StepOutcome::Done)
}

fn create_mount_point(root: &SyntheticRoot, host_path: &Path) -> Result<PathBuf> {
    root.create_dir(host_path, 0o755)
        .map_err(|e| JailError::mount("creating mount point", root.mirror(host_path), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static CALLS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    fn record(name: &'static str) {
        CALLS.with(|c| c.borrow_mut().push(name));
    }

    fn ok_step(_: &MountContext<'_>, _: &mut SyntheticRoot) -> Result<StepOutcome> {
        record("ok");
        Ok(StepOutcome::Done)
    }

    fn skip_step(_: &MountContext<'_>, _: &mut SyntheticRoot) -> Result<StepOutcome> {
        record("skip");
        Ok(StepOutcome::Skipped("nothing to do".to_string()))
    }

    fn soft_fail_step(_: &MountContext<'_>, _: &mut SyntheticRoot) -> Result<StepOutcome> {
        record("soft");
        Err(JailError::integration("test integration", "unavailable"))
    }

    fn hard_fail_step(_: &MountContext<'_>, _: &mut SyntheticRoot) -> Result<StepOutcome> {
        record("hard");
        Err(JailError::mount("bind mounting", "/test", nix::Error::EPERM))
    }

    fn with_context<T>(f: impl FnOnce(&MountContext<'_>, &mut SyntheticRoot) -> T) -> T {
        let parent = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let plan = BindMountPlan::new();
        let host = HostContext::default();
        let ctx = MountContext {
            plan: &plan,
            host: &host,
            workspace: workspace.path(),
        };
        let mut root = SyntheticRoot::allocate_in(parent.path()).unwrap();
        CALLS.with(|c| c.borrow_mut().clear());
        f(&ctx, &mut root)
    }

    fn calls() -> Vec<&'static str> {
        CALLS.with(|c| c.borrow().clone())
    }

    #[test]
    fn optional_failures_do_not_stop_the_sequence() {
        let steps = [
            Step::fatal("a", ok_step),
            Step::optional("b", soft_fail_step),
            Step::optional("c", skip_step),
            Step::fatal("d", ok_step),
        ];
        with_context(|ctx, root| run_steps(&steps, ctx, root).unwrap());
        assert_eq!(calls(), vec!["ok", "soft", "skip", "ok"]);
    }

    #[test]
    fn fatal_failure_halts_immediately() {
        let steps = [
            Step::fatal("a", ok_step),
            Step::fatal("b", hard_fail_step),
            Step::fatal("c", ok_step),
        ];
        let err = with_context(|ctx, root| run_steps(&steps, ctx, root).unwrap_err());
        assert!(matches!(err, JailError::MountSetupFailed { .. }));
        assert_eq!(calls(), vec!["ok", "hard"]);
    }

    #[test]
    fn step_order_puts_pseudo_filesystems_last() {
        let names: Vec<&str> = STEPS.iter().map(|s| s.name).collect();
        assert_eq!(names.first(), Some(&"bind mount plan"));
        assert_eq!(names[1], "workspace");
        assert_eq!(names.last(), Some(&"pseudo filesystems"));
    }

    #[test]
    fn only_integrations_are_optional() {
        for step in STEPS {
            let optional = step.disposition == Disposition::Optional;
            let integration = !matches!(
                step.name,
                "bind mount plan" | "workspace" | "pseudo filesystems"
            );
            assert_eq!(optional, integration, "{}", step.name);
        }
    }

    #[test]
    fn missing_plan_entries_are_skipped() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let plan = BindMountPlan::build(&["/nonexistent/jail/extra"]);
        let mut only_missing = BindMountPlan::new();
        for entry in plan.entries().iter().filter(|e| !e.source.exists()) {
            only_missing.push(entry.clone());
        }
        let host = HostContext::default();
        let ctx = MountContext {
            plan: &only_missing,
            host: &host,
            workspace: workspace.path(),
        };
        let mut root = SyntheticRoot::allocate_in(parent.path()).unwrap();

        assert_eq!(mount_plan(&ctx, &mut root).unwrap(), StepOutcome::Done);
        assert!(root.mounts().is_empty());
        assert!(!root.mirror(Path::new("/nonexistent")).exists());
    }

    #[test]
    fn missing_required_entry_is_fatal() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let mut plan = BindMountPlan::new();
        plan.push(crate::storage::BindMount {
            source: PathBuf::from("/nonexistent/required"),
            mode: MountMode::ReadOnly,
            required: true,
        });
        let host = HostContext::default();
        let ctx = MountContext {
            plan: &plan,
            host: &host,
            workspace: workspace.path(),
        };
        let mut root = SyntheticRoot::allocate_in(parent.path()).unwrap();

        let err = mount_plan(&ctx, &mut root).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/required"));
    }

    #[test]
    fn fatal_error_after_binds_detaches_and_removes_root() {
        use crate::storage::BindMount;
        use crate::test_support::{SKIP_EXIT, in_user_mount_namespace};

        let parent = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let not_a_dir = tempfile::NamedTempFile::new().unwrap();
        let mut plan = BindMountPlan::new();
        plan.push(BindMount::optional_readonly("/usr"));
        plan.push(BindMount::optional_readonly(not_a_dir.path()));
        let host = HostContext::default();

        let status = in_user_mount_namespace(|| {
            if mount::make_private().is_err() {
                return SKIP_EXIT;
            }
            let ctx = MountContext {
                plan: &plan,
                host: &host,
                workspace: workspace.path(),
            };
            match prepare_in(&ctx, parent.path()) {
                Err(JailError::MountSetupFailed { path, .. }) if path == not_a_dir.path() => {}
                _ => return 1,
            }
            match std::fs::read_dir(parent.path()).map(|mut entries| entries.next().is_none()) {
                Ok(true) => 0,
                _ => 2,
            }
        });

        match status {
            None => eprintln!("SKIP: unprivileged user namespaces not available"),
            Some(code) => assert_eq!(code, 0, "cleanup after failed bind failed at step {code}"),
        }
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn readwrite_plan_entry_is_writable() {
        use crate::storage::BindMount;
        use crate::test_support::{SKIP_EXIT, in_user_mount_namespace};

        let parent = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        let mut plan = BindMountPlan::new();
        plan.push(BindMount {
            source: shared.path().to_path_buf(),
            mode: MountMode::ReadWrite,
            required: true,
        });
        let host = HostContext::default();

        let status = in_user_mount_namespace(|| {
            if mount::make_private().is_err() {
                return SKIP_EXIT;
            }
            let ctx = MountContext {
                plan: &plan,
                host: &host,
                workspace: workspace.path(),
            };
            let Ok(mut root) = SyntheticRoot::allocate_in(parent.path()) else {
                return 1;
            };
            if mount_plan(&ctx, &mut root).is_err() {
                return 2;
            }
            match std::fs::write(root.mirror(shared.path()).join("out"), b"rw") {
                Ok(()) => 0,
                Err(_) => 3,
            }
        });

        match status {
            None => eprintln!("SKIP: unprivileged user namespaces not available"),
            Some(code) => assert_eq!(code, 0, "read-write plan entry failed at step {code}"),
        }
        if status.is_some() {
            assert!(shared.path().join("out").exists());
        }
    }
}
