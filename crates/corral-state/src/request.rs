//! Placement request types.
//!
//! A [`RequestSpec`] is immutable once built and supplied fresh per
//! instance in a batch. Extra specs arrive on the wire as a flat
//! `key -> "[operator]value"` map with colon-scoped keys; they are
//! parsed into scope paths and [`Requirement`]s exactly once here.

use std::collections::BTreeMap;
use std::net::IpAddr;

use corral_match::Requirement;
use serde::{Deserialize, Serialize};

use crate::types::{InstanceId, NodeId};

/// One parsed extra-spec entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraSpec {
    /// Colon-separated scope path of the key (`capabilities:cpu_info:vendor`
    /// becomes `["capabilities", "cpu_info", "vendor"]`).
    pub path: Vec<String>,
    /// Parsed operator-qualified constraint.
    pub requirement: Requirement,
    /// The declared string as received, kept for re-serialization.
    pub raw: String,
}

impl ExtraSpec {
    /// First path component when the key is scoped, `None` otherwise.
    pub fn scope(&self) -> Option<&str> {
        (self.path.len() > 1).then(|| self.path[0].as_str())
    }

    /// Path with the leading scope component stripped.
    pub fn subpath(&self) -> &[String] {
        if self.path.len() > 1 { &self.path[1..] } else { &self.path }
    }
}

/// Extra specs attached to an instance type, parsed at construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct ExtraSpecs {
    entries: Vec<ExtraSpec>,
}

impl ExtraSpecs {
    pub fn parse(specs: &BTreeMap<String, String>) -> Self {
        let entries = specs
            .iter()
            .map(|(key, declared)| ExtraSpec {
                path: key.split(':').map(str::to_string).collect(),
                requirement: Requirement::parse(declared),
                raw: declared.clone(),
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtraSpec> {
        self.entries.iter()
    }

    /// Look up the entry for an exact key path.
    pub fn get(&self, path: &[&str]) -> Option<&ExtraSpec> {
        self.entries.iter().find(|e| e.path == path)
    }
}

impl From<BTreeMap<String, String>> for ExtraSpecs {
    fn from(map: BTreeMap<String, String>) -> Self {
        ExtraSpecs::parse(&map)
    }
}

impl From<ExtraSpecs> for BTreeMap<String, String> {
    fn from(specs: ExtraSpecs) -> Self {
        specs
            .entries
            .into_iter()
            .map(|e| (e.path.join(":"), e.raw))
            .collect()
    }
}

/// The instance type (flavor) being placed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstanceType {
    pub name: String,
    pub memory_mb: u64,
    pub vcpus: u32,
    pub root_disk_mb: u64,
    #[serde(default)]
    pub extra_specs: ExtraSpecs,
}

/// Placement-relevant properties derived from the boot image. Only
/// properties actually present are checked by the image filters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageProperties {
    pub image_ref: Option<String>,
    pub architecture: Option<String>,
    pub hypervisor_type: Option<String>,
    pub vm_mode: Option<String>,
    /// Image is tagged for isolated-host placement.
    #[serde(default)]
    pub isolated: bool,
}

/// Soft placement hints supplied by the request-handling collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchedulerHints {
    /// Instance group name, if the instance belongs to one.
    pub group: Option<String>,
    /// Hosts already occupied by the named group's members.
    #[serde(default)]
    pub group_hosts: Vec<NodeId>,
    /// Place on the same host as all of these instances.
    #[serde(default)]
    pub same_host: Vec<InstanceId>,
    /// Place on a different host from all of these instances.
    #[serde(default)]
    pub different_host: Vec<InstanceId>,
    /// Place near this host address, within `cidr`.
    pub build_near_host_ip: Option<IpAddr>,
    /// Subnet suffix for `build_near_host_ip` (defaults to `/24`).
    pub cidr: Option<String>,
    /// JSON boolean query, passed through verbatim for the query filter.
    pub query: Option<String>,
}

/// One instance's placement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub instance_id: InstanceId,
    pub instance_type: InstanceType,
    #[serde(default)]
    pub image: ImageProperties,
    pub availability_zone: Option<String>,
    /// Owning tenant, for aggregate tenant isolation.
    pub project_id: Option<String>,
    #[serde(default)]
    pub scheduler_hints: SchedulerHints,
    /// Hosts to strip from the candidate set before filtering.
    #[serde(default)]
    pub ignore_hosts: Vec<NodeId>,
    /// When non-empty, only these hosts are candidates and the filter
    /// chain is bypassed for them.
    #[serde(default)]
    pub force_hosts: Vec<NodeId>,
    /// Hosts a previous attempt already tried and failed on.
    #[serde(default)]
    pub retry_hosts: Vec<NodeId>,
}
