//! Command-line surface and the invocation it describes

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{JailError, Result};
use crate::utils;

#[derive(Parser, Debug)]
#[command(name = "jail")]
#[command(
    version,
    about = "Run a command inside an unprivileged filesystem jail",
    long_about = None
)]
#[command(after_help = "EXAMPLES:
    jail /bin/sh                  # jail in current directory
    jail -d /tmp/mydir /bin/sh    # jail in /tmp/mydir
    jail -d ~/project make test

Extra read-only directories are listed one per line in ~/.jail and <DIR>/.jail")]
pub struct Cli {
    /// Workspace directory mounted read-write at /workspace/<name>
    /// (defaults to the current directory)
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to run followed by its arguments
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<OsString>,
}

impl Cli {
    /// Parse argv, mapping every clap failure except help/version to a usage error.
    ///
    /// Help and version output is printed here and yields `Ok(None)`.
    pub fn parse_args<I, T>(args: I) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Cli::try_parse_from(args) {
            Ok(cli) => Ok(Some(cli)),
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                let _ = e.print();
                Ok(None)
            }
            Err(e) => Err(JailError::Usage(e.render().to_string())),
        }
    }

    /// Usage line shown alongside `no command specified`
    pub fn usage() -> String {
        Cli::command().render_usage().to_string()
    }
}

/// What the user asked for: a workspace and a command line to run inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub workspace_dir: PathBuf,
    pub command: OsString,
    pub command_args: Vec<OsString>,
}

impl InvocationRequest {
    /// Build the request from parsed flags, defaulting the workspace to `cwd`.
    pub fn from_cli(cli: &Cli, cwd: &Path) -> Result<Self> {
        let (command, command_args) = cli.command.split_first().ok_or(JailError::NoCommand)?;

        Ok(Self {
            workspace_dir: cli.dir.clone().unwrap_or_else(|| cwd.to_path_buf()),
            command: command.clone(),
            command_args: command_args.to_vec(),
        })
    }

    /// Outer-stage precondition: the workspace must be an existing directory.
    pub fn validate(&self) -> Result<()> {
        match fs::metadata(&self.workspace_dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(JailError::InvalidWorkspace {
                path: self.workspace_dir.clone(),
            }),
        }
    }

    /// Absolute workspace path as mounted in the inner stage.
    ///
    /// Made absolute textually: symlinks are left unresolved so the in-jail
    /// name is the one the user gave, and `..` is folded lexically. Existence
    /// is not re-checked here.
    pub fn absolute_workspace(&self) -> Result<PathBuf> {
        let absolute = std::path::absolute(&self.workspace_dir)?;
        Ok(utils::normalize_absolute(&absolute))
    }
}

/// Name of the workspace directory under `/workspace` inside the jail.
pub fn workspace_name(workspace: &Path) -> String {
    workspace
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
}

/// In-jail path of the workspace: `/workspace/{basename}`.
pub fn jail_workspace_path(workspace: &Path) -> PathBuf {
    Path::new("/workspace").join(workspace_name(workspace))
}
