//! jail: run a command in an unprivileged filesystem jail
//!
//! The jail is a synthetic root assembled from bind mounts inside fresh user,
//! mount, PID, UTS and IPC namespaces. System directories and user-configured
//! paths are mounted read-only, the workspace read-write at
//! `/workspace/<name>`. No privileges are needed beyond unprivileged user
//! namespaces.
//!
//! # Modules
//!
//! - **cli**: Argument parsing and the invocation request
//! - **config**: Host context and `.jail` config files
//! - **isolation**: Namespace set and UID/GID mapping
//! - **storage**: Mount plan, synthetic root and mount orchestration
//! - **execution**: Stage detection, spawning, command resolution and exec
//! - **controller**: Drives one invocation through its stage
//!
//! # Example
//!
//! ```ignore
//! use jail::{Cli, InvocationRequest, Stage, controller};
//!
//! let argv: Vec<_> = std::env::args_os().collect();
//! if let Some(cli) = Cli::parse_args(argv.clone())? {
//!     let request = InvocationRequest::from_cli(&cli, &std::env::current_dir()?)?;
//!     let code = controller::run(Stage::current(), &request, argv)?;
//!     std::process::exit(code);
//! }
//! ```

// Core modules
pub mod errors;
pub mod logging;
pub mod utils;

// Layered modules
pub mod cli;
pub mod config;
pub mod execution;
pub mod isolation;
pub mod storage;

// Main controller
pub mod controller;

// Public API
pub use cli::{Cli, InvocationRequest};
pub use config::HostContext;
pub use errors::{JailError, Result};
pub use execution::{Environment, Stage};
pub use isolation::NamespaceSpec;
pub use storage::{BindMountPlan, SyntheticRoot};
