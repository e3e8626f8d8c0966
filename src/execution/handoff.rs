//! Final transition from the prepared root to the user's command

use log::debug;
use nix::errno::Errno;
use nix::unistd::{chdir, execve};
use std::convert::Infallible;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::cli::{self, InvocationRequest};
use crate::config::HostContext;
use crate::errors::{JailError, Result};
use crate::execution::environment::Environment;
use crate::execution::resolve;
use crate::storage::{BindMountPlan, SyntheticRoot};

/// Environment for the user's command: `HOME` pinned, sentinel removed
pub fn command_environment(env: Environment, host: &HostContext) -> Environment {
    let mut env = env.without_sentinel();
    if let Some(home) = &host.home {
        env.set("HOME", home);
    }
    env
}

/// Chroot into `root`, move to the workspace and replace this process with the command.
///
/// Only returns on failure.
pub fn enter_and_exec(
    root: SyntheticRoot,
    request: &InvocationRequest,
    workspace: &Path,
    plan: &BindMountPlan,
    host: &HostContext,
    env: Environment,
) -> Result<Infallible> {
    root.enter()?;

    let jail_dir = cli::jail_workspace_path(workspace);
    chdir(&jail_dir).map_err(|e| JailError::mount("changing directory to", &jail_dir, e))?;

    let program = resolve::resolve_command(&request.command, plan.sources())?;
    debug!("Executing {} in {}", program.display(), jail_dir.display());

    let env = command_environment(env, host);
    exec(&program, request, &env)
}

fn exec(program: &Path, request: &InvocationRequest, env: &Environment) -> Result<Infallible> {
    let exec_err = |source| JailError::ExecFailed {
        path: program.to_path_buf(),
        source,
    };

    let path =
        CString::new(program.as_os_str().as_bytes()).map_err(|_| exec_err(Errno::EINVAL))?;
    let argv = std::iter::once(&request.command)
        .chain(&request.command_args)
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| exec_err(Errno::EINVAL))?;

    execve(&path, &argv, &env.to_cstrings()).map_err(exec_err)
}
