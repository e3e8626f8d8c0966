//! Two-stage re-exec: which stage this process is, and how the outer stage
//! launches the inner one

use log::debug;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::cli::InvocationRequest;
use crate::config::HostContext;
use crate::errors::Result;
use crate::execution::environment::{Environment, SENTINEL_VALUE, SENTINEL_VAR};
use crate::execution::process::{self, SpawnConfig};
use crate::isolation::NamespaceSpec;

/// Path that always names the running executable
pub const SELF_EXE: &str = "/proc/self/exe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Invoked by the user; creates namespaces and waits
    Outer,
    /// Re-executed inside the new namespaces; builds the jail and execs the command
    Inner,
}

impl Stage {
    /// Classify from the value of the sentinel variable
    pub fn detect(sentinel: Option<&OsStr>) -> Self {
        match sentinel {
            Some(value) if value == SENTINEL_VALUE => Stage::Inner,
            _ => Stage::Outer,
        }
    }

    pub fn current() -> Self {
        Self::detect(std::env::var_os(SENTINEL_VAR).as_deref())
    }
}

/// Re-exec of this binary with the original argv, marked as the inner stage
pub fn reexec_config(argv: Vec<OsString>, env: Environment, host: &HostContext) -> SpawnConfig {
    SpawnConfig {
        program: PathBuf::from(SELF_EXE),
        argv,
        env: env.with_sentinel(),
        namespaces: NamespaceSpec::for_user(host.uid, host.gid),
    }
}

/// Validate the workspace, spawn the inner stage and return its exit code
pub fn run_outer(
    request: &InvocationRequest,
    argv: Vec<OsString>,
    host: &HostContext,
) -> Result<i32> {
    request.validate()?;
    debug!(
        "Workspace {} validated, spawning inner stage for {}",
        request.workspace_dir.display(),
        request.command.to_string_lossy()
    );
    process::spawn_and_wait(&reexec_config(argv, Environment::inherit(), host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::JailError;
    use crate::isolation::NamespaceType;
    use std::path::Path;

    #[test]
    fn test_detect_inner_only_on_exact_value() {
        assert_eq!(Stage::detect(Some(OsStr::new("1"))), Stage::Inner);
        assert_eq!(Stage::detect(Some(OsStr::new("0"))), Stage::Outer);
        assert_eq!(Stage::detect(Some(OsStr::new(""))), Stage::Outer);
        assert_eq!(Stage::detect(None), Stage::Outer);
    }

    #[test]
    fn test_reexec_config_keeps_argv_and_marks_env() {
        let argv: Vec<OsString> = ["jail", "-d", "/tmp", "ls", "-la"]
            .iter()
            .map(OsString::from)
            .collect();
        let host = HostContext {
            uid: 1000,
            gid: 100,
            ..Default::default()
        };
        let env = Environment::from_pairs([("PATH", "/bin")]);

        let config = reexec_config(argv.clone(), env, &host);
        assert_eq!(config.program, Path::new(SELF_EXE));
        assert_eq!(config.argv, argv);
        assert_eq!(config.env.get(SENTINEL_VAR), Some(OsStr::new(SENTINEL_VALUE)));
        assert_eq!(config.namespaces.uid_map.outside, 1000);
        assert_eq!(config.namespaces.gid_map.outside, 100);
        assert!(!config.namespaces.is_enabled(NamespaceType::Net));
    }

    #[test]
    fn test_run_outer_rejects_missing_workspace() {
        let request = InvocationRequest {
            workspace_dir: PathBuf::from("/nonexistent/jail/workspace"),
            command: "true".into(),
            command_args: vec![],
        };
        let err = run_outer(&request, vec![], &HostContext::default()).unwrap_err();
        assert!(matches!(err, JailError::InvalidWorkspace { .. }));
    }
}
