//! Spawning the inner stage in fresh namespaces

use log::debug;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sched::clone;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{Pid, execve};
use std::ffi::{CString, OsString};
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use crate::errors::{JailError, Result};
use crate::execution::environment::Environment;
use crate::isolation::{NamespaceSpec, setup_user_namespace};
use crate::utils;

const CHILD_STACK_SIZE: usize = 128 * 1024;

/// Immutable description of the process to clone into new namespaces
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Image to exec in the child
    pub program: PathBuf,
    /// Full argv, `argv[0]` included
    pub argv: Vec<OsString>,
    pub env: Environment,
    pub namespaces: NamespaceSpec,
}

/// Exec-ready copies of a [`SpawnConfig`], built before cloning
struct ExecImage {
    program: CString,
    argv: Vec<CString>,
    env: Vec<CString>,
}

impl ExecImage {
    fn from_config(config: &SpawnConfig) -> Result<Self> {
        let program = CString::new(config.program.as_os_str().as_bytes()).map_err(|_| {
            JailError::NamespaceCreationFailed(format!(
                "program path {} contains a nul byte",
                config.program.display()
            ))
        })?;
        let argv = config
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                JailError::NamespaceCreationFailed("argument contains a nul byte".to_string())
            })?;

        Ok(Self {
            program,
            argv,
            env: config.env.to_cstrings(),
        })
    }
}

/// Clone into `config.namespaces`, map ids, release the child and wait for it.
///
/// Returns the child's exit code, or 128 + signal number when it was killed.
pub fn spawn_and_wait(config: &SpawnConfig) -> Result<i32> {
    let image = ExecImage::from_config(config)?;
    let mut child_stack = vec![0u8; CHILD_STACK_SIZE];

    let child_pid = clone_child(&image, &mut child_stack, &config.namespaces)?;
    debug!("Inner stage started as pid {}", child_pid);

    let status = wait_for_child(child_pid)?;
    debug!("Inner stage {} exited with {}", child_pid, status);
    Ok(status)
}

/// Clone the child and hold it on a sync pipe until its id maps are written.
///
/// The child only proceeds after reading exactly one byte; if the parent
/// drops the pipe instead, the child exits with status 1.
fn clone_child(image: &ExecImage, child_stack: &mut [u8], spec: &NamespaceSpec) -> Result<Pid> {
    let (sync_read, sync_write) = nix::unistd::pipe2(OFlag::O_CLOEXEC)
        .map_err(|e| JailError::NamespaceCreationFailed(format!("pipe: {}", e)))?;
    let sync_read_raw = sync_read.as_raw_fd();
    let sync_write_raw = sync_write.as_raw_fd();

    let child = Box::new(move || -> isize {
        let mut buf = [0u8; 1];
        // SAFETY: raw FD operations in the child process after clone
        let n = unsafe {
            libc::close(sync_write_raw);
            let n = libc::read(sync_read_raw, buf.as_mut_ptr() as *mut libc::c_void, 1);
            libc::close(sync_read_raw);
            n
        };
        if n != 1 {
            return 1;
        }

        match execve(&image.program, &image.argv, &image.env) {
            Ok(never) => match never {},
            Err(e) => {
                eprintln!("exec {}: {}", image.program.to_string_lossy(), e);
                1
            }
        }
    });

    // SAFETY: the child only touches memory prepared before the clone and execs
    let result = unsafe {
        clone(
            child,
            child_stack,
            spec.to_clone_flags(),
            Some(Signal::SIGCHLD as i32),
        )
    };
    drop(sync_read);

    let child_pid = result.map_err(|e| {
        let mut msg = format!("clone failed: {}", e);
        if !utils::has_user_namespaces() {
            msg.push_str(" (unprivileged user namespaces appear to be disabled)");
        }
        JailError::NamespaceCreationFailed(msg)
    })?;

    if let Err(e) = setup_user_namespace(child_pid, spec) {
        drop(sync_write);
        let _ = wait_for_child(child_pid);
        return Err(e);
    }

    nix::unistd::write(&sync_write, &[1u8]).map_err(|e| {
        JailError::NamespaceCreationFailed(format!("releasing child {}: {}", child_pid, e))
    })?;
    drop(sync_write);

    Ok(child_pid)
}

/// Wait for child process and get exit status
pub fn wait_for_child(pid: Pid) -> Result<i32> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, status)) => return Ok(status),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => {
                return Err(JailError::Io(std::io::Error::other(format!(
                    "waitpid failed: {}",
                    e
                ))));
            }
        }
    }
}
