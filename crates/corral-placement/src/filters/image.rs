//! Image-driven filters: host capability matching for image
//! properties, aggregate-based image property isolation, and the
//! isolated hosts/images policy.

use corral_state::{HostState, RequestSpec};
use serde_json::Value;
use tracing::debug;

use super::HostFilter;

/// Pass hosts whose advertised `supported_instances` capability covers
/// the image's architecture / hypervisor type / VM mode. Only
/// properties present on the request are checked; a request with none
/// passes everywhere.
pub struct ImagePropertiesFilter;

impl ImagePropertiesFilter {
    fn instance_supported(host: &HostState, req: &RequestSpec) -> bool {
        let wanted: Vec<&str> = [
            req.image.architecture.as_deref(),
            req.image.hypervisor_type.as_deref(),
            req.image.vm_mode.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if wanted.is_empty() {
            return true;
        }

        // supported_instances is a list of (arch, hypervisor, vm_mode)
        // combinations the node can run.
        let Some(Value::Array(supported)) = host.capabilities.get("supported_instances")
        else {
            debug!(
                host = %host.host,
                "image properties requested but host advertises no supported_instances"
            );
            return false;
        };

        supported.iter().any(|combo| match combo {
            Value::Array(parts) => wanted
                .iter()
                .all(|prop| parts.iter().any(|p| p.as_str() == Some(prop))),
            _ => false,
        })
    }
}

impl HostFilter for ImagePropertiesFilter {
    fn name(&self) -> &'static str {
        "image_properties"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let passes = Self::instance_supported(host, req);
        if !passes {
            debug!(host = %host, "host does not support requested image properties");
        }
        passes
    }
}

/// For each aggregate metadata key naming an image property, require
/// the request's value for that property to be among the aggregate's
/// values. Hosts whose aggregates say nothing about a property pass.
pub struct AggregateImagePropertiesFilter {
    /// When set, only metadata keys starting with `namespace.` are
    /// considered.
    pub namespace: Option<String>,
}

impl AggregateImagePropertiesFilter {
    fn image_property<'r>(req: &'r RequestSpec, key: &str) -> Option<&'r str> {
        match key {
            "architecture" => req.image.architecture.as_deref(),
            "hypervisor_type" => req.image.hypervisor_type.as_deref(),
            "vm_mode" => req.image.vm_mode.as_deref(),
            _ => None,
        }
    }
}

impl HostFilter for AggregateImagePropertiesFilter {
    fn name(&self) -> &'static str {
        "aggregate_image_properties"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        for aggregate in &host.aggregates {
            for (key, options) in &aggregate.metadata {
                let key = match &self.namespace {
                    Some(ns) => match key.strip_prefix(ns).and_then(|k| k.strip_prefix('.')) {
                        Some(stripped) => stripped,
                        None => continue,
                    },
                    None => key.as_str(),
                };
                let Some(prop) = Self::image_property(req, key) else {
                    continue;
                };
                if !options.iter().any(|o| o == prop) {
                    debug!(
                        host = %host.host,
                        aggregate = %aggregate.name,
                        key,
                        prop,
                        "image property not allowed by aggregate"
                    );
                    return false;
                }
            }
        }
        true
    }
}

/// Keep isolated images on isolated hosts.
///
/// With `restrict` set, the pairing is exact: isolated images only on
/// isolated hosts and vice versa. Relaxed, isolated hosts may also
/// take ordinary images, but isolated images still never land on
/// ordinary hosts.
pub struct IsolatedHostsFilter {
    pub isolated_hosts: Vec<String>,
    pub isolated_images: Vec<String>,
    pub restrict: bool,
}

impl HostFilter for IsolatedHostsFilter {
    fn name(&self) -> &'static str {
        "isolated_hosts"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let host_isolated = host.isolated || self.isolated_hosts.contains(&host.host);
        let image_isolated = req.image.isolated
            || req
                .image
                .image_ref
                .as_ref()
                .is_some_and(|r| self.isolated_images.contains(r));

        if self.restrict {
            image_isolated == host_isolated
        } else {
            !image_isolated || host_isolated
        }
    }
}
