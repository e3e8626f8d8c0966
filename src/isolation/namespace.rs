//! Namespace set and identity mapping for the inner stage

use nix::sched::CloneFlags;

/// Namespace types a jail can isolate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceType {
    Pid,
    Ipc,
    Net,
    Mount,
    Uts,
    User,
}

impl NamespaceType {
    pub fn clone_flag(self) -> CloneFlags {
        match self {
            NamespaceType::Pid => CloneFlags::CLONE_NEWPID,
            NamespaceType::Ipc => CloneFlags::CLONE_NEWIPC,
            NamespaceType::Net => CloneFlags::CLONE_NEWNET,
            NamespaceType::Mount => CloneFlags::CLONE_NEWNS,
            NamespaceType::Uts => CloneFlags::CLONE_NEWUTS,
            NamespaceType::User => CloneFlags::CLONE_NEWUSER,
        }
    }
}

/// Namespaces every jail gets. The network namespace is absent: the jail
/// shares the host network stack.
pub const JAIL_NAMESPACES: &[NamespaceType] = &[
    NamespaceType::User,
    NamespaceType::Mount,
    NamespaceType::Pid,
    NamespaceType::Uts,
    NamespaceType::Ipc,
];

/// Single-entry id mapping: `inside` maps to `outside`, range 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    pub inside: u32,
    pub outside: u32,
}

impl IdMapping {
    /// Map a host id to root inside the namespace
    pub fn root_for(outside: u32) -> Self {
        Self { inside: 0, outside }
    }

    /// Line format accepted by `/proc/<pid>/{uid,gid}_map`
    pub fn to_map_line(&self) -> String {
        format!("{} {} 1\n", self.inside, self.outside)
    }
}

/// Namespaces requested for the inner stage plus its UID/GID maps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    pub namespaces: Vec<NamespaceType>,
    pub uid_map: IdMapping,
    pub gid_map: IdMapping,
}

impl NamespaceSpec {
    /// The fixed jail namespace set, mapping the invoking user and group to root
    pub fn for_user(uid: u32, gid: u32) -> Self {
        Self {
            namespaces: JAIL_NAMESPACES.to_vec(),
            uid_map: IdMapping::root_for(uid),
            gid_map: IdMapping::root_for(gid),
        }
    }

    pub fn to_clone_flags(&self) -> CloneFlags {
        self.namespaces
            .iter()
            .fold(CloneFlags::empty(), |flags, ns| flags | ns.clone_flag())
    }

    pub fn is_enabled(&self, ns: NamespaceType) -> bool {
        self.namespaces.contains(&ns)
    }

    pub fn enabled_count(&self) -> usize {
        self.namespaces.len()
    }
}
