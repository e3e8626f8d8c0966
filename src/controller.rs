//! Jail controller: drives one invocation through whichever stage this process is

use log::{debug, info};
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::Path;

use crate::cli::InvocationRequest;
use crate::config::{self, CONFIG_FILE_NAME, HostContext};
use crate::errors::Result;
use crate::execution::{Environment, Stage, handoff, stage};
use crate::storage::{self, BindMountPlan, MountContext};

/// Run `request` as `stage`.
///
/// The outer stage returns the inner stage's exit code. The inner stage
/// never returns on success since the process image is replaced.
pub fn run(stage: Stage, request: &InvocationRequest, argv: Vec<OsString>) -> Result<i32> {
    let host = HostContext::capture();
    debug!(
        "Running {:?} stage as uid {} gid {}",
        stage, host.uid, host.gid
    );

    match stage {
        Stage::Outer => stage::run_outer(request, argv, &host),
        Stage::Inner => match run_inner(request, &host)? {},
    }
}

/// Build the jail inside the new namespaces and exec the command in it
pub fn run_inner(request: &InvocationRequest, host: &HostContext) -> Result<Infallible> {
    let workspace = request.absolute_workspace()?;
    let plan = build_plan(host, &workspace);
    info!(
        "Jail for {} with {} bind mounts",
        workspace.display(),
        plan.len()
    );

    let ctx = MountContext {
        plan: &plan,
        host,
        workspace: &workspace,
    };
    let root = storage::prepare(&ctx)?;

    handoff::enter_and_exec(
        root,
        request,
        &workspace,
        &plan,
        host,
        Environment::inherit(),
    )
}

/// System directories followed by global then per-workspace `.jail` entries
pub fn build_plan(host: &HostContext, workspace: &Path) -> BindMountPlan {
    let global = host.global_config_path();
    let extra = config::resolve(global.as_deref(), &workspace.join(CONFIG_FILE_NAME));
    BindMountPlan::build(&extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::JailError;
    use crate::storage::SYSTEM_DIRS;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn test_build_plan_orders_global_before_workspace() {
        let home = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        fs::write(home.path().join(CONFIG_FILE_NAME), "/opt/global\n").unwrap();
        fs::write(
            workspace.path().join(CONFIG_FILE_NAME),
            "# local tools\n/opt/local\n",
        )
        .unwrap();
        let host = HostContext {
            home: Some(home.path().to_path_buf()),
            ..Default::default()
        };

        let plan = build_plan(&host, workspace.path());
        let sources: Vec<PathBuf> = plan.sources().map(|p| p.to_path_buf()).collect();
        assert_eq!(sources.len(), SYSTEM_DIRS.len() + 2);
        assert_eq!(sources[SYSTEM_DIRS.len()], PathBuf::from("/opt/global"));
        assert_eq!(sources[SYSTEM_DIRS.len() + 1], PathBuf::from("/opt/local"));
    }

    #[test]
    fn test_build_plan_without_config_files() {
        let workspace = tempfile::tempdir().unwrap();
        let plan = build_plan(&HostContext::default(), workspace.path());
        assert_eq!(plan.len(), SYSTEM_DIRS.len());
    }

    #[test]
    fn test_outer_stage_rejects_file_as_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();
        let request = InvocationRequest {
            workspace_dir: file.clone(),
            command: "true".into(),
            command_args: vec![],
        };

        let err = run(Stage::Outer, &request, vec![]).unwrap_err();
        assert!(matches!(err, JailError::InvalidWorkspace { path } if path == file));
    }
}
