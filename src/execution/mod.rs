//! Execution layer: stage detection, namespace spawning and the final exec
//!
//! # Features
//!
//! - **Stage detection**: sentinel-driven split between outer and inner stage
//! - **Process spawning**: clone into new namespaces with a sync pipe for id mapping
//! - **Command resolution**: fixed search path plus configured directories
//! - **Handoff**: chroot, chdir and execve with a pinned `HOME`

pub mod environment;
pub mod handoff;
pub mod process;
pub mod resolve;
pub mod stage;

pub use environment::{Environment, SENTINEL_VALUE, SENTINEL_VAR};
pub use process::{SpawnConfig, spawn_and_wait, wait_for_child};
pub use resolve::{SEARCH_DIRS, resolve_command};
pub use stage::{Stage, run_outer};
