//! Isolation layer: namespace set and user namespace identity mapping
//!
//! # Examples
//!
//! ```ignore
//! use jail::isolation::NamespaceSpec;
//!
//! let spec = NamespaceSpec::for_user(1000, 1000);
//! let flags = spec.to_clone_flags();
//! ```

pub mod namespace;
pub mod user_ns;
pub use namespace::{IdMapping, JAIL_NAMESPACES, NamespaceSpec, NamespaceType};
pub use user_ns::setup_user_namespace;
