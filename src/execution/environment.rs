//! Flat environment handed to a spawned or exec'd image

use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

/// Private flag telling a re-executed `jail` that it is the inner stage
pub const SENTINEL_VAR: &str = "__JAIL_SETUP__";
pub const SENTINEL_VALUE: &str = "1";

/// Name → value mapping; later writes replace earlier ones, keys stay unique
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(OsString, OsString)>,
}

impl Environment {
    /// Copy of the current process environment
    pub fn inherit() -> Self {
        Self::from_pairs(std::env::vars_os())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut env = Self::default();
        for (key, value) in pairs {
            env.set(key, value);
        }
        env
    }

    /// Set or replace `key`, keeping its original position when it already exists
    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        let key = key.into();
        let value = value.into();
        if let Some((_, existing)) = self.vars.iter_mut().find(|(k, _)| *k == key) {
            *existing = value;
        } else {
            self.vars.push((key, value));
        }
    }

    pub fn remove(&mut self, key: impl AsRef<OsStr>) {
        let key = key.as_ref();
        self.vars.retain(|(k, _)| k != key);
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        let key = key.as_ref();
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Mark the environment for the inner stage
    pub fn with_sentinel(mut self) -> Self {
        self.set(SENTINEL_VAR, SENTINEL_VALUE);
        self
    }

    pub fn without_sentinel(mut self) -> Self {
        self.remove(SENTINEL_VAR);
        self
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// `KEY=value` strings for execve
    pub fn to_cstrings(&self) -> Vec<CString> {
        self.vars
            .iter()
            .filter_map(|(k, v)| {
                let mut entry = Vec::with_capacity(k.len() + v.len() + 1);
                entry.extend_from_slice(k.as_bytes());
                entry.push(b'=');
                entry.extend_from_slice(v.as_bytes());
                CString::new(entry).ok()
            })
            .collect()
    }
}
