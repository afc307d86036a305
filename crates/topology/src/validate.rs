//! Plan-time consistency checks
//!
//! The control API rewrites the resources of all shards together, so a
//! shard may only repeat the cluster-level descriptor, never diverge from
//! it. Shards without an override inherit the cluster value.

use std::collections::BTreeMap;
use tracing::warn;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{EntityKind, EntityRef, HasResources, Identity, Resources, Topology};

/// Check shard resource overrides against the cluster-level descriptor
///
/// Returns every shard's effective resources, or every conflict found.
pub fn validate_plan(
    cluster: Option<&Resources>,
    shards: &BTreeMap<String, Option<Resources>>,
) -> Result<BTreeMap<String, Option<Resources>>, Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let mut effective = BTreeMap::new();

    for (name, shard_resources) in shards {
        match (cluster, shard_resources) {
            (Some(cluster), Some(own)) if own != cluster => {
                warn!(
                    "Shard {} resources {} conflict with cluster resources {}",
                    name, own, cluster
                );
                diagnostics.push(
                    Diagnostic::error(format!(
                        "resources of shard '{}' conflict with cluster resources",
                        name
                    ))
                    .with_detail(format!("cluster {}, shard {}", cluster, own))
                    .with_target(EntityRef::new(EntityKind::Shard, name.clone())),
                );
            }
            (_, Some(own)) => {
                effective.insert(name.clone(), Some(own.clone()));
            }
            (cluster, None) => {
                effective.insert(name.clone(), cluster.cloned());
            }
        }
    }

    diagnostics.into_result(effective)
}

/// Structural checks of a desired topology
pub fn validate_topology(topology: &Topology) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    let managers: Vec<&str> = topology.manager_only_groups().map(|g| g.name()).collect();
    if managers.len() > 1 {
        diagnostics.push(
            Diagnostic::error("at most one manager-only node group is allowed")
                .with_detail(format!("found {}", managers.join(", "))),
        );
    }

    for group in topology.node_groups.values() {
        if group.hosts_count == 0 {
            diagnostics.push(
                Diagnostic::error("node group must have at least one host")
                    .with_target(group.entity_ref()),
            );
        }
        if group.roles.is_empty() {
            diagnostics.push(
                Diagnostic::error("node group must have at least one role")
                    .with_target(group.entity_ref()),
            );
        }
    }

    for shard in topology.shards.values() {
        if shard.weight == 0 {
            diagnostics.push(
                Diagnostic::error("shard weight must be positive").with_target(shard.entity_ref()),
            );
        }
    }

    for group in topology.shard_groups.values() {
        for member in &group.shard_names {
            if !topology.shards.contains_key(member) {
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "shard group references unknown shard '{}'",
                        member
                    ))
                    .with_target(group.entity_ref()),
                );
            }
        }
    }

    diagnostics
}

/// Validate a desired topology and write effective shard resources back
pub fn apply_shard_resources(topology: &mut Topology) -> Diagnostics {
    let overrides: BTreeMap<String, Option<Resources>> = topology
        .shards
        .iter()
        .map(|(name, shard)| (name.clone(), shard.resources().cloned()))
        .collect();

    match validate_plan(topology.resources.as_ref(), &overrides) {
        Ok(effective) => {
            for (name, resources) in effective {
                if let Some(shard) = topology.shards.get_mut(&name) {
                    shard.resources = resources;
                }
            }
            Diagnostics::new()
        }
        Err(diagnostics) => diagnostics,
    }
}
