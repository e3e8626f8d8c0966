//! Host context and `.jail` configuration files
//!
//! A `.jail` file lists one extra host path per line; blank lines and lines
//! starting with `#` are ignored. The global file (`$HOME/.jail`) is read
//! before the workspace file (`<workspace>/.jail`).

use log::{debug, warn};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::utils;

/// Name of the per-user and per-workspace configuration file
pub const CONFIG_FILE_NAME: &str = ".jail";

/// Snapshot of the host environment the jail depends on.
///
/// Captured once per stage; nothing downstream reads process environment directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostContext {
    pub home: Option<PathBuf>,
    pub xdg_runtime_dir: Option<PathBuf>,
    pub docker_host: Option<String>,
    pub uid: u32,
    pub gid: u32,
}

impl HostContext {
    /// Capture from the current process environment
    pub fn capture() -> Self {
        Self::from_vars(
            std::env::var_os("HOME"),
            std::env::var_os("XDG_RUNTIME_DIR"),
            std::env::var_os("DOCKER_HOST"),
            utils::get_uid(),
            utils::get_gid(),
        )
    }

    /// Build from raw variable values; empty values count as unset
    pub fn from_vars(
        home: Option<OsString>,
        xdg_runtime_dir: Option<OsString>,
        docker_host: Option<OsString>,
        uid: u32,
        gid: u32,
    ) -> Self {
        let non_empty = |v: Option<OsString>| v.filter(|s| !s.is_empty());
        Self {
            home: non_empty(home).map(PathBuf::from),
            xdg_runtime_dir: non_empty(xdg_runtime_dir).map(PathBuf::from),
            docker_host: non_empty(docker_host).map(|s| s.to_string_lossy().into_owned()),
            uid,
            gid,
        }
    }

    /// `$HOME/.jail`, if HOME is known
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|home| home.join(CONFIG_FILE_NAME))
    }
}

/// Parse the contents of a `.jail` file into path entries
pub fn parse_jail_config(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a `.jail` file; a missing file is an empty contribution
pub fn read_jail_config(path: &Path) -> io::Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(parse_jail_config(&contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Merge the global and workspace config files, global entries first.
///
/// Never fails: unreadable files are reported and contribute nothing.
/// Paths are not validated here.
pub fn resolve(global_config: Option<&Path>, workspace_config: &Path) -> Vec<String> {
    let mut paths = Vec::new();

    for config in global_config.into_iter().chain(std::iter::once(workspace_config)) {
        match read_jail_config(config) {
            Ok(entries) => {
                if !entries.is_empty() {
                    debug!("{} entries from {}", entries.len(), config.display());
                }
                paths.extend(entries);
            }
            Err(e) => warn!("Ignoring unreadable {}: {}", config.display(), e),
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_config() {
        let contents = concat!(
            "# Comment line\n",
            "/usr/local/bin\n",
            "/opt/tools\n",
            "\n",
            "  /home/user/.local/bin  \n",
            "# Another comment\n",
            "/var/lib/data\n",
        );
        assert_eq!(
            parse_jail_config(contents),
            vec![
                "/usr/local/bin",
                "/opt/tools",
                "/home/user/.local/bin",
                "/var/lib/data"
            ]
        );
    }

    #[test]
    fn parse_only_comments_and_whitespace() {
        let contents = "# Just comments\n\n   \n\t\n  # indented comment\n";
        assert!(parse_jail_config(contents).is_empty());
    }

    #[test]
    fn parse_empty_config() {
        assert!(parse_jail_config("").is_empty());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = read_jail_config(&dir.path().join(".jail")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn resolve_orders_global_before_workspace() {
        let home = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".jail"), "/global/one\n# skip\n/global/two\n").unwrap();
        fs::write(workspace.path().join(".jail"), "\n/local/one\n").unwrap();

        let paths = resolve(
            Some(&home.path().join(".jail")),
            &workspace.path().join(".jail"),
        );
        assert_eq!(paths, vec!["/global/one", "/global/two", "/local/one"]);
    }

    #[test]
    fn resolve_keeps_duplicates() {
        let home = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".jail"), "/opt/shared\n").unwrap();
        fs::write(workspace.path().join(".jail"), "/opt/shared\n").unwrap();

        let paths = resolve(
            Some(&home.path().join(".jail")),
            &workspace.path().join(".jail"),
        );
        assert_eq!(paths, vec!["/opt/shared", "/opt/shared"]);
    }

    #[test]
    fn resolve_without_home() {
        let workspace = tempfile::tempdir().unwrap();
        fs::write(workspace.path().join(".jail"), "/only/local\n").unwrap();
        assert_eq!(
            resolve(None, &workspace.path().join(".jail")),
            vec!["/only/local"]
        );
    }

    #[test]
    fn resolve_with_no_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve(Some(&dir.path().join("a")), &dir.path().join("b")).is_empty());
    }

    #[test]
    fn host_context_treats_empty_as_unset() {
        let ctx = HostContext::from_vars(
            Some(OsString::from("/home/alice")),
            Some(OsString::new()),
            None,
            1000,
            1000,
        );
        assert_eq!(ctx.home, Some(PathBuf::from("/home/alice")));
        assert!(ctx.xdg_runtime_dir.is_none());
        assert!(ctx.docker_host.is_none());
        assert_eq!(
            ctx.global_config_path(),
            Some(PathBuf::from("/home/alice/.jail"))
        );
    }
}
