//! Host snapshot types and the resource consumption model.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::request::RequestSpec;

/// Unique identifier for a compute node.
pub type NodeId = String;

/// Unique identifier for a workload instance.
pub type InstanceId = String;

// ── Host state ─────────────────────────────────────────────────────

/// Attestation level reported for a host by the external trust
/// collaborator. Hosts with no attestation result are `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Trusted,
    Untrusted,
    #[default]
    Unknown,
}

impl TrustLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TrustLevel::Trusted => "trusted",
            TrustLevel::Untrusted => "untrusted",
            TrustLevel::Unknown => "unknown",
        }
    }
}

/// An instance already running on a host, as far as the snapshot knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInstance {
    /// Instance type name, for type-affinity checks.
    pub instance_type: String,
}

/// A host aggregate the node belongs to, with its metadata map.
///
/// Metadata values are sets of strings: a host can be in several
/// aggregates that each contribute values for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregate {
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Vec<String>>,
}

/// Snapshot of one compute node for the duration of a scheduling call.
///
/// Constructed fresh per call from external fleet state, mutated only
/// by [`HostState::consume`], and discarded when the call returns.
/// Filters and weighers treat it as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostState {
    pub host: NodeId,
    pub availability_zone: Option<String>,
    /// Administratively enabled (not disabled by an operator).
    pub enabled: bool,
    /// Service heartbeat is current.
    pub operational: bool,
    pub host_ip: Option<IpAddr>,

    pub total_usable_ram_mb: u64,
    /// Free RAM can go negative under oversubscription.
    pub free_ram_mb: i64,
    pub total_usable_disk_mb: u64,
    pub free_disk_mb: i64,
    pub vcpus_total: u32,
    pub vcpus_used: u32,
    /// Concurrent I/O-heavy operations (builds, resizes, snapshots).
    pub num_io_ops: u32,

    /// Host is reserved for isolated images.
    pub isolated: bool,
    pub trust_level: TrustLevel,

    /// Open-ended capability map advertised by the node (CPU features,
    /// hypervisor type, architecture, VM mode, nested maps allowed).
    #[serde(default)]
    pub capabilities: BTreeMap<String, Value>,
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
    /// Instances present on the host, keyed by id. Grows as the batch
    /// virtually consumes the host.
    #[serde(default)]
    pub instances: BTreeMap<InstanceId, HostInstance>,
    /// Generic named metrics reported by the node.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl HostState {
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn used_ram_mb(&self) -> i64 {
        self.total_usable_ram_mb as i64 - self.free_ram_mb
    }

    pub fn used_disk_mb(&self) -> i64 {
        self.total_usable_disk_mb as i64 - self.free_disk_mb
    }

    /// Merged aggregate metadata values for `key`, in aggregate order.
    pub fn aggregate_values(&self, key: &str) -> Vec<&str> {
        let mut values = Vec::new();
        for aggregate in &self.aggregates {
            if let Some(vals) = aggregate.metadata.get(key) {
                for v in vals {
                    if !values.contains(&v.as_str()) {
                        values.push(v.as_str());
                    }
                }
            }
        }
        values
    }

    /// Whether any aggregate carries metadata for `key` at all.
    pub fn has_aggregate_key(&self, key: &str) -> bool {
        self.aggregates.iter().any(|a| a.metadata.contains_key(key))
    }

    /// Resolve a flat field name, as referenced by `$field` in the JSON
    /// query language. Built-in resource counters take precedence;
    /// anything else falls through to the capability map.
    pub fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "free_ram_mb" => Value::from(self.free_ram_mb),
            "free_disk_mb" => Value::from(self.free_disk_mb),
            "total_usable_ram_mb" => Value::from(self.total_usable_ram_mb),
            "total_usable_disk_mb" => Value::from(self.total_usable_disk_mb),
            "vcpus_total" => Value::from(self.vcpus_total),
            "vcpus_used" => Value::from(self.vcpus_used),
            "num_instances" => Value::from(self.num_instances()),
            "num_io_ops" => Value::from(self.num_io_ops),
            other => return self.capabilities.get(other).cloned(),
        };
        Some(value)
    }

    /// Walk a scope path into the capability map (nested objects
    /// allowed). A one-element path may also name a built-in field.
    pub fn capability(&self, path: &[String]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let mut current = match self.capabilities.get(first) {
            Some(v) => v.clone(),
            None if rest.is_empty() => return self.field(first),
            None => return None,
        };
        for component in rest {
            let Value::Object(map) = &current else {
                return None;
            };
            current = map.get(component)?.clone();
        }
        Some(current)
    }

    /// Virtually consume one instance's footprint from this snapshot.
    ///
    /// Applied by the orchestrator to the host actually selected in an
    /// iteration, never speculatively. A fresh placement also counts as
    /// an I/O-heavy operation for the io-ops filter.
    pub fn consume(&mut self, req: &RequestSpec) {
        self.free_ram_mb -= req.instance_type.memory_mb as i64;
        self.free_disk_mb -= req.instance_type.root_disk_mb as i64;
        self.vcpus_used += req.instance_type.vcpus;
        self.num_io_ops += 1;
        self.instances.insert(
            req.instance_id.clone(),
            HostInstance {
                instance_type: req.instance_type.name.clone(),
            },
        );
        debug!(
            host = %self.host,
            instance = %req.instance_id,
            free_ram_mb = self.free_ram_mb,
            free_disk_mb = self.free_disk_mb,
            vcpus_used = self.vcpus_used,
            "consumed instance footprint"
        );
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ram:{} disk:{} io_ops:{} instances:{}",
            self.host,
            self.free_ram_mb,
            self.free_disk_mb,
            self.num_io_ops,
            self.num_instances()
        )
    }
}
