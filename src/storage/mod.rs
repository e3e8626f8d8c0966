//! Storage layer: the synthetic root and everything mounted into it
//!
//! # Features
//!
//! - **Plan**: ordered system and user-configured bind mounts
//! - **Mount primitives**: private propagation, bind, read-only remount, procfs
//! - **Synthetic root**: temporary root directory with failure-path cleanup
//! - **Integrations**: optional home config, runtime dir and container socket mounts
//! - **Orchestrator**: strictly ordered step pipeline

pub mod integrations;
pub mod mount;
pub mod orchestrator;
pub mod plan;
pub mod rootfs;

pub use orchestrator::{Disposition, MountContext, Step, StepOutcome, prepare, prepare_in};
pub use plan::{BindMount, BindMountPlan, MountMode, SYSTEM_DIRS};
pub use rootfs::SyntheticRoot;
